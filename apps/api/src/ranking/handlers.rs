//! Axum route handlers for the Ranking API.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::{ExtractionOutcome, ExtractionStatus};
use crate::ranking::models::{Candidate, ScoredCandidate};
use crate::state::AppState;

const JOB_DESCRIPTION_FIELD: &str = "job_description";
const FILES_FIELD: &str = "files";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// One `files` part of the multipart upload.
struct UploadedFile {
    name: String,
    bytes: Bytes,
}

#[derive(Debug, Serialize)]
pub struct FileReport {
    pub name: String,
    pub status: ExtractionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub characters: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub request_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub candidates: Vec<ScoredCandidate>,
    pub files: Vec<FileReport>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /upload
///
/// Multipart form with a `job_description` text field and one or more `files`.
/// Extracts text from each file, ranks the readable ones, and reports the
/// extraction status of every file.
pub async fn handle_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let request_id = Uuid::new_v4();
    let span = info_span!("upload", %request_id);
    upload(state, multipart, request_id).instrument(span).await
}

async fn upload(
    state: AppState,
    mut multipart: Multipart,
    request_id: Uuid,
) -> Result<Json<UploadResponse>, AppError> {
    let mut job_description: Option<String> = None;
    let mut uploads: Vec<UploadedFile> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().map(String::from);
        match field_name.as_deref() {
            Some(JOB_DESCRIPTION_FIELD) => {
                job_description = Some(field.text().await.map_err(multipart_error)?);
            }
            Some(FILES_FIELD) => {
                let name = field
                    .file_name()
                    .map(String::from)
                    .unwrap_or_else(|| format!("resume-{}", uploads.len() + 1));
                let bytes = field.bytes().await.map_err(multipart_error)?;
                uploads.push(UploadedFile { name, bytes });
            }
            _ => {}
        }
    }

    let job_description = job_description
        .filter(|jd| !jd.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Job description is required".to_string()))?;
    if uploads.is_empty() {
        return Err(AppError::Validation("No files provided".to_string()));
    }

    info!(
        files = uploads.len(),
        job_description_chars = job_description.chars().count(),
        "Processing upload"
    );

    let outcomes = futures::future::join_all(
        uploads
            .iter()
            .map(|u| state.extractor.extract(&u.name, u.bytes.clone())),
    )
    .await;

    let mut candidates = Vec::new();
    let mut files = Vec::with_capacity(uploads.len());
    for (upload, outcome) in uploads.into_iter().zip(outcomes) {
        files.push(file_report(&upload.name, &outcome));
        if let ExtractionOutcome::Extracted(text) = outcome {
            candidates.push(Candidate::new(upload.name, text));
        }
    }

    if candidates.is_empty() {
        return Err(AppError::UnprocessableEntity(
            "Failed to process files".to_string(),
        ));
    }

    let ranking = state.pipeline.rank(&job_description, &candidates).await?;

    Ok(Json(UploadResponse {
        request_id,
        generated_at: Utc::now(),
        candidates: ranking.candidates,
        files,
    }))
}

fn file_report(name: &str, outcome: &ExtractionOutcome) -> FileReport {
    let (characters, error) = match outcome {
        ExtractionOutcome::Extracted(text) => (Some(text.chars().count()), None),
        ExtractionOutcome::Failed(reason) => (None, Some(reason.clone())),
        ExtractionOutcome::Empty | ExtractionOutcome::Unsupported => (None, None),
    };
    FileReport {
        name: name.to_string(),
        status: outcome.status(),
        characters,
        error,
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::Validation(format!("Invalid multipart upload: {}", e.body_text()))
    }
}

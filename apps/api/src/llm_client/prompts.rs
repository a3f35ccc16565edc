// Prompt templates for hosted-model calls.

/// Candidate assessment prompt. Replace `{job_description}` and `{resume_text}` before sending.
pub const SUMMARY_PROMPT_TEMPLATE: &str = "You are an expert HR recruiter. \
Given the following job description and candidate resume, write a concise 2-3 sentence summary \
focusing on the candidate's strongest matches to the requirements and highlight these matches \
in your summary. Provide your summary in the form of bullet points. \
If the candidate does not match the requirements, provide a brief explanation as to why they \
are not a good fit.

Job Description:
{job_description}

Candidate Resume:
{resume_text}
";

pub fn build_summary_prompt(resume_text: &str, job_description: &str) -> String {
    // The job description placeholder precedes the resume, so replacing only its
    // first occurrence leaves placeholder-like text inside the resume untouched.
    SUMMARY_PROMPT_TEMPLATE
        .replace("{resume_text}", resume_text)
        .replacen("{job_description}", job_description, 1)
}

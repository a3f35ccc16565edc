/// Cosine similarity in [-1, 1].
///
/// Empty or zero-norm vectors score 0.0 instead of producing NaN. Mismatched
/// dimensions also score 0.0 and are logged, since they mean the job and the
/// candidate were embedded by different models.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a.len() != b.len() {
        tracing::warn!(
            a_len = a.len(),
            b_len = b.len(),
            "embedding dimension mismatch; returning zero similarity"
        );
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    // `+ 0.0` folds -0.0 into 0.0 so total_cmp treats both as a tie.
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0) + 0.0
}

/// Scales `v` to unit length in place. Zero vectors are left unchanged.
pub fn normalize(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

// 📏 Similarity Scorer - cosine distance between embeddings
// Pure and stateless: same inputs always give the same distance

use crate::error::{EntitySenseError, Result};

/// Distance returned when either vector has zero norm
pub const MAX_DEGENERATE_DISTANCE: f64 = 1.0;

/// Cosine distance `1 - (a·b) / (‖a‖·‖b‖)`, in [0, 2].
///
/// A zero-norm vector is treated as maximally dissimilar (1.0), never as a match.
/// Mismatched lengths fail with `InvalidVector`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(EntitySenseError::InvalidVector(format!(
            "Embedding dimension mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }

    // Accumulate in f64 so 768-dim f32 sums don't drift
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(MAX_DEGENERATE_DISTANCE);
    }

    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    Ok((1.0 - similarity).clamp(0.0, 2.0))
}

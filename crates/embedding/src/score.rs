use crate::types::Embedding;

/// Cosine similarity of two unit embeddings, computed as their dot product.
///
/// Callers guarantee unit inputs; nothing is re-checked here. Mismatched
/// lengths are scored over the shared prefix.
pub fn score(a: &Embedding, b: &Embedding) -> f32 {
    dot(a.as_slice(), b.as_slice())
}

/// Plain dot product accumulated in `f64`.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum::<f64>() as f32
}

use crate::error::ValidationError;
use crate::types::{Embedding, ValidatedVector};

/// Rescale a validated vector to unit L2 norm.
///
/// The norm is accumulated in `f64` so 512-d inputs land within 1e-6 of unit
/// length. An all-zero vector has no direction and fails with `ZeroNorm`.
pub fn normalize(vector: ValidatedVector) -> Result<Embedding, ValidationError> {
    let ValidatedVector { label, mut values } = vector;
    let norm = l2_norm(&values);
    if norm == 0.0 {
        return Err(ValidationError::ZeroNorm { label });
    }
    for x in values.iter_mut() {
        *x = (f64::from(*x) / norm) as f32;
    }
    Ok(Embedding::from_unit_values(values))
}

pub(crate) fn l2_norm(v: &[f32]) -> f64 {
    v.iter()
        .map(|x| f64::from(*x) * f64::from(*x))
        .sum::<f64>()
        .sqrt()
}

use serde_json::Value;

use crate::error::ValidationError;
use crate::types::ValidatedVector;

/// Check a loosely-typed JSON value and turn it into a [`ValidatedVector`].
///
/// The value must be a flat array of numbers of exactly `expected_dim`
/// entries, each of which must stay finite once narrowed to `f32`.
pub fn validate(
    raw: &Value,
    expected_dim: usize,
    label: &str,
) -> Result<ValidatedVector, ValidationError> {
    let Value::Array(items) = raw else {
        return Err(ValidationError::NotASequence {
            label: label.to_string(),
        });
    };

    let mut values = Vec::with_capacity(items.len());
    for item in items {
        match item.as_f64() {
            Some(v) => values.push(v as f32),
            None => {
                return Err(ValidationError::NotASequence {
                    label: label.to_string(),
                })
            }
        }
    }

    check_values(values, expected_dim, label)
}

/// Typed counterpart of [`validate`] for vectors that are already `f32`.
pub fn validate_slice(
    raw: &[f32],
    expected_dim: usize,
    label: &str,
) -> Result<ValidatedVector, ValidationError> {
    check_values(raw.to_vec(), expected_dim, label)
}

fn check_values(
    values: Vec<f32>,
    expected_dim: usize,
    label: &str,
) -> Result<ValidatedVector, ValidationError> {
    if values.len() != expected_dim {
        return Err(ValidationError::DimensionMismatch {
            label: label.to_string(),
            expected: expected_dim,
            actual: values.len(),
        });
    }
    if let Some(index) = values.iter().position(|v| !v.is_finite()) {
        return Err(ValidationError::NonFiniteValue {
            label: label.to_string(),
            index,
        });
    }
    Ok(ValidatedVector {
        label: label.to_string(),
        values,
    })
}

use thiserror::Error;

/// Errors raised while checking or normalizing a feature vector.
///
/// Every variant carries the label of the vector that failed (the query, or a
/// stored record id) so skipped candidates can be diagnosed from the logs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// The input was a scalar, object, null, nested array, or contained non-numbers.
    #[error("{label}: embedding must be a flat sequence of numbers")]
    NotASequence { label: String },
    /// The sequence length differs from the configured dimension.
    #[error("{label}: expected {expected} values, got {actual}")]
    DimensionMismatch {
        label: String,
        expected: usize,
        actual: usize,
    },
    /// NaN or infinity (including values that overflow `f32`).
    #[error("{label}: value at index {index} is not finite")]
    NonFiniteValue { label: String, index: usize },
    /// The vector has an L2 norm of exactly zero.
    #[error("{label}: embedding has zero norm")]
    ZeroNorm { label: String },
}

impl ValidationError {
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::NotASequence { .. } => "NotASequence",
            ValidationError::DimensionMismatch { .. } => "DimensionMismatch",
            ValidationError::NonFiniteValue { .. } => "NonFiniteValue",
            ValidationError::ZeroNorm { .. } => "ZeroNorm",
        }
    }

    /// Label of the vector that failed validation.
    pub fn label(&self) -> &str {
        match self {
            ValidationError::NotASequence { label }
            | ValidationError::DimensionMismatch { label, .. }
            | ValidationError::NonFiniteValue { label, .. }
            | ValidationError::ZeroNorm { label } => label,
        }
    }
}

/// Errors surfaced by the embedding pipeline (decode → detect → extract).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectionError {
    /// Image bytes could not be decoded into a pixel buffer.
    #[error("unable to decode image: {0}")]
    Decode(String),
    /// The detector returned zero face regions.
    #[error("no face detected in image")]
    NoFaceDetected,
    /// The detector produced a feature vector of the wrong length.
    #[error("detector returned a {actual}-d embedding, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// The selected feature vector failed validation or normalization.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The external detector failed or was unreachable.
    #[error("face detector failure: {0}")]
    Detector(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_messages_carry_label() {
        let err = ValidationError::DimensionMismatch {
            label: "record person-7".into(),
            expected: 512,
            actual: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("person-7"));
        assert!(msg.contains("512"));
        assert!(msg.contains("10"));
        assert_eq!(err.kind(), "DimensionMismatch");
        assert_eq!(err.label(), "record person-7");
    }

    #[test]
    fn detection_error_wraps_validation_transparently() {
        let inner = ValidationError::ZeroNorm {
            label: "query".into(),
        };
        let err: DetectionError = inner.clone().into();
        assert_eq!(err.to_string(), inner.to_string());
        assert!(matches!(err, DetectionError::Validation(_)));
    }

    #[test]
    fn no_face_message() {
        assert_eq!(
            DetectionError::NoFaceDetected.to_string(),
            "no face detected in image"
        );
    }
}

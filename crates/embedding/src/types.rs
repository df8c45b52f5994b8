use serde::Serialize;

/// Dimension of every face embedding handled by the service.
pub const EMBEDDING_DIM: usize = 512;

/// A feature vector that passed shape and finiteness checks but has not been
/// rescaled yet. Only [`crate::validate`] builds one.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedVector {
    pub(crate) label: String,
    pub(crate) values: Vec<f32>,
}

impl ValidatedVector {
    /// Label used in diagnostics for this vector.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Unit-length face embedding.
///
/// Construction goes through [`crate::normalize`], so every value of this type
/// has an L2 norm of 1 within floating-point tolerance. The values are never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Embedding {
    values: Vec<f32>,
}

impl Embedding {
    pub(crate) fn from_unit_values(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.values
    }

    /// L2 norm recomputed from the stored values.
    pub fn norm(&self) -> f32 {
        self.values
            .iter()
            .map(|v| f64::from(*v) * f64::from(*v))
            .sum::<f64>()
            .sqrt() as f32
    }
}

impl AsRef<[f32]> for Embedding {
    fn as_ref(&self) -> &[f32] {
        &self.values
    }
}

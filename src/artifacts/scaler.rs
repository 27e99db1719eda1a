//! Feature scalers exported from fitted standard and min-max scalers

use super::{check_width, Scaler};
use crate::error::ArtifactError;
use serde::{Deserialize, Serialize};

/// Fitted scaler parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeatureScaler {
    /// `(x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// `x * scale + min`
    MinMax { min: Vec<f64>, scale: Vec<f64> },
}

impl FeatureScaler {
    pub fn width(&self) -> usize {
        match self {
            FeatureScaler::Standard { mean, .. } => mean.len(),
            FeatureScaler::MinMax { min, .. } => min.len(),
        }
    }

    /// Check parameter consistency once, at load time.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        let (offsets, scale) = match self {
            FeatureScaler::Standard { mean, scale } => (mean, scale),
            FeatureScaler::MinMax { min, scale } => (min, scale),
        };
        if offsets.is_empty() {
            return Err(ArtifactError::Invalid("scaler has no features".to_string()));
        }
        if offsets.len() != scale.len() {
            return Err(ArtifactError::Invalid(format!(
                "scaler has {} offsets but {} scale factors",
                offsets.len(),
                scale.len()
            )));
        }
        if offsets.iter().chain(scale).any(|v| !v.is_finite()) {
            return Err(ArtifactError::Invalid("scaler parameters must be finite".to_string()));
        }
        if let FeatureScaler::Standard { scale, .. } = self {
            if let Some(i) = scale.iter().position(|&s| s == 0.0) {
                return Err(ArtifactError::Invalid(format!("zero scale for feature {i}")));
            }
        }
        Ok(())
    }
}

impl Scaler for FeatureScaler {
    fn n_features(&self) -> Option<usize> {
        Some(self.width())
    }

    fn transform(&self, row: &[f64]) -> Result<Vec<f64>, ArtifactError> {
        check_width(self.width(), row)?;
        let scaled = match self {
            FeatureScaler::Standard { mean, scale } => row
                .iter()
                .zip(mean.iter().zip(scale))
                .map(|(x, (m, s))| (x - m) / s)
                .collect(),
            FeatureScaler::MinMax { min, scale } => row
                .iter()
                .zip(min.iter().zip(scale))
                .map(|(x, (m, s))| x * s + m)
                .collect(),
        };
        Ok(scaled)
    }
}

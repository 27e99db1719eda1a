//! Nearest-centre cluster assignment

use super::{check_width, uniform_width, Clusterer};
use crate::error::ArtifactError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeansModel {
    pub cluster_centers: Vec<Vec<f64>>,
}

impl KMeansModel {
    pub fn validate(&self) -> Result<(), ArtifactError> {
        uniform_width("cluster_centers", &self.cluster_centers)?;
        if self.cluster_centers.iter().flatten().any(|v| !v.is_finite()) {
            return Err(ArtifactError::Invalid("cluster centres must be finite".to_string()));
        }
        Ok(())
    }

    pub fn n_clusters(&self) -> usize {
        self.cluster_centers.len()
    }
}

impl Clusterer for KMeansModel {
    fn n_features(&self) -> Option<usize> {
        self.cluster_centers.first().map(Vec::len)
    }

    fn predict(&self, row: &[f64]) -> Result<usize, ArtifactError> {
        let width = self
            .n_features()
            .ok_or_else(|| ArtifactError::Invalid("model has no clusters".to_string()))?;
        check_width(width, row)?;

        let mut best: Option<(usize, f64)> = None;
        for (id, centre) in self.cluster_centers.iter().enumerate() {
            let d = distance(centre, row);
            // Strict comparison keeps the lowest id on ties.
            if best.map_or(true, |(_, nearest)| d < nearest) {
                best = Some((id, d));
            }
        }
        best.map(|(id, _)| id)
            .ok_or_else(|| ArtifactError::Invalid("model has no clusters".to_string()))
    }
}

/// Euclidean distance, scaled by the largest component so squaring cannot overflow.
fn distance(centre: &[f64], row: &[f64]) -> f64 {
    let largest = centre
        .iter()
        .zip(row)
        .map(|(c, x)| (x - c).abs())
        .fold(0.0, |acc: f64, d| if d.is_nan() || d > acc { d } else { acc });
    if largest == 0.0 || !largest.is_finite() {
        return largest;
    }
    let sum: f64 = centre
        .iter()
        .zip(row)
        .map(|(c, x)| ((x - c) / largest).powi(2))
        .sum();
    largest * sum.sqrt()
}

//! Isolation forest anomaly scoring
//!
//! Mirrors the fitted estimator's `decision_function`: the average isolation
//! depth across trees is normalised by the expected depth of an unsuccessful
//! BST search over `max_samples` points, turned into `-2^(-E[h]/c(n))`, and
//! shifted by the fitted `offset`. Negative scores are outliers.

use super::{check_width, AnomalyDetector, TreeStructure};
use crate::error::ArtifactError;
use serde::{Deserialize, Serialize};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Expected path length `c(n)` of an unsuccessful search among `n` samples.
pub fn average_path_length(n: u64) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// One isolation tree and the feature subset it was grown on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationTree {
    #[serde(flatten)]
    pub tree: TreeStructure,
    /// Column indices drawn for this tree; all columns when absent
    #[serde(default)]
    pub features: Option<Vec<usize>>,
}

impl IsolationTree {
    fn path_length(&self, row: &[f64]) -> Result<f64, ArtifactError> {
        let (leaf, depth) = match &self.features {
            Some(columns) => {
                let mut projected = Vec::with_capacity(columns.len());
                for &c in columns {
                    projected.push(*row.get(c).ok_or(ArtifactError::ShapeMismatch {
                        expected: c + 1,
                        actual: row.len(),
                    })?);
                }
                self.tree.descend(&projected)?
            }
            None => self.tree.descend(row)?,
        };
        Ok(depth as f64 + average_path_length(self.tree.n_node_samples[leaf]))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForestModel {
    pub estimators: Vec<IsolationTree>,
    /// Sub-sample size each tree was grown on
    pub max_samples: u64,
    /// Fitted offset separating inliers from outliers
    pub offset: f64,
    #[serde(default)]
    pub n_features: Option<usize>,
}

impl IsolationForestModel {
    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.estimators.is_empty() {
            return Err(ArtifactError::Invalid("isolation forest has no trees".to_string()));
        }
        if self.max_samples == 0 {
            return Err(ArtifactError::Invalid("max_samples must be positive".to_string()));
        }
        if !self.offset.is_finite() {
            return Err(ArtifactError::Invalid("offset must be finite".to_string()));
        }
        for (i, estimator) in self.estimators.iter().enumerate() {
            estimator
                .tree
                .validate()
                .map_err(|e| ArtifactError::Invalid(format!("tree {i}: {e}")))?;
            if estimator.tree.n_node_samples.is_empty() {
                return Err(ArtifactError::Invalid(format!(
                    "tree {i} is missing node sample counts"
                )));
            }
            if let Some(width) = self.n_features {
                let widest = match &estimator.features {
                    Some(columns) => columns.iter().copied().max(),
                    None => estimator.tree.max_feature(),
                };
                if widest.is_some_and(|w| w >= width) {
                    return Err(ArtifactError::Invalid(format!(
                        "tree {i} reads beyond fitted width {width}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Raw anomaly score in `[-1, 0]`, before the offset is applied.
    pub fn score_samples(&self, row: &[f64]) -> Result<f64, ArtifactError> {
        let mut total_depth = 0.0;
        for estimator in &self.estimators {
            total_depth += estimator.path_length(row)?;
        }
        let normaliser = self.estimators.len() as f64 * average_path_length(self.max_samples);
        let exponent = if normaliser > 0.0 {
            -total_depth / normaliser
        } else {
            0.0
        };
        Ok(-(2f64.powf(exponent)))
    }
}

impl AnomalyDetector for IsolationForestModel {
    fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    fn decision_function(&self, row: &[f64]) -> Result<f64, ArtifactError> {
        if let Some(width) = self.n_features {
            check_width(width, row)?;
        }
        Ok(self.score_samples(row)? - self.offset)
    }
}

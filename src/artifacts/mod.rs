//! Pre-trained artifacts consumed as opaque capabilities
//!
//! Each artifact family is a trait so the registry can hold natively
//! evaluated parameter exports, ONNX sessions, or test fakes behind the
//! same handle.

pub mod encoder;
pub mod isolation;
pub mod kmeans;
pub mod scaler;
pub mod tree;

#[cfg(feature = "onnx")]
pub mod onnx;

use crate::dataset::Dataset;
use crate::error::ArtifactError;
use crate::registry::ArtifactKind;
use std::fmt;
use std::sync::Arc;

pub use encoder::LabelEncoderModel;
pub use isolation::{IsolationForestModel, IsolationTree};
pub use kmeans::KMeansModel;
pub use scaler::FeatureScaler;
pub use tree::{DecisionTreeModel, TreeStructure};

/// Normalises a raw feature row into the range the models were fitted on.
pub trait Scaler: Send + Sync {
    /// Input width the scaler was fitted with, if known.
    fn n_features(&self) -> Option<usize>;

    fn transform(&self, row: &[f64]) -> Result<Vec<f64>, ArtifactError>;
}

/// Classifier emitting an encoded class id.
pub trait Classifier: Send + Sync {
    fn n_features(&self) -> Option<usize>;

    fn predict(&self, row: &[f64]) -> Result<i64, ArtifactError>;
}

/// Clustering model emitting a cluster index.
pub trait Clusterer: Send + Sync {
    fn n_features(&self) -> Option<usize>;

    fn predict(&self, row: &[f64]) -> Result<usize, ArtifactError>;
}

/// Outlier model; lower decision scores are more anomalous.
pub trait AnomalyDetector: Send + Sync {
    fn n_features(&self) -> Option<usize>;

    fn decision_function(&self, row: &[f64]) -> Result<f64, ArtifactError>;
}

/// Maps encoded classes back to their original categorical labels.
pub trait LabelDecoder: Send + Sync {
    fn classes(&self) -> &[String];

    fn inverse_transform(&self, code: i64) -> Result<String, ArtifactError>;
}

/// A loaded artifact, immutable for the lifetime of the registry.
#[derive(Clone)]
pub enum ModelArtifact {
    Scaler(Arc<dyn Scaler>),
    Classifier(Arc<dyn Classifier>),
    Clusterer(Arc<dyn Clusterer>),
    AnomalyDetector(Arc<dyn AnomalyDetector>),
    LabelDecoder(Arc<dyn LabelDecoder>),
    Dataset(Arc<Dataset>),
}

impl ModelArtifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            ModelArtifact::Scaler(_) => ArtifactKind::Scaler,
            ModelArtifact::Classifier(_) => ArtifactKind::Classifier,
            ModelArtifact::Clusterer(_) => ArtifactKind::Clusterer,
            ModelArtifact::AnomalyDetector(_) => ArtifactKind::AnomalyDetector,
            ModelArtifact::LabelDecoder(_) => ArtifactKind::LabelDecoder,
            ModelArtifact::Dataset(_) => ArtifactKind::Dataset,
        }
    }

    /// Numeric input width, for artifacts that consume feature rows.
    pub fn input_width(&self) -> Option<usize> {
        match self {
            ModelArtifact::Scaler(a) => a.n_features(),
            ModelArtifact::Classifier(a) => a.n_features(),
            ModelArtifact::Clusterer(a) => a.n_features(),
            ModelArtifact::AnomalyDetector(a) => a.n_features(),
            ModelArtifact::LabelDecoder(_) | ModelArtifact::Dataset(_) => None,
        }
    }
}

impl fmt::Debug for ModelArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelArtifact")
            .field("kind", &self.kind())
            .field("input_width", &self.input_width())
            .finish()
    }
}

/// Reject a row whose width differs from the fitted width.
pub(crate) fn check_width(expected: usize, row: &[f64]) -> Result<(), ArtifactError> {
    if row.len() != expected {
        return Err(ArtifactError::ShapeMismatch {
            expected,
            actual: row.len(),
        });
    }
    Ok(())
}

/// Width shared by a list of parameter vectors, or an error naming the culprit.
pub(crate) fn uniform_width<'a, I>(what: &str, rows: I) -> Result<usize, ArtifactError>
where
    I: IntoIterator<Item = &'a Vec<f64>>,
{
    let mut width = None;
    for (i, row) in rows.into_iter().enumerate() {
        match width {
            None => width = Some(row.len()),
            Some(w) if w != row.len() => {
                return Err(ArtifactError::Invalid(format!(
                    "{what} row {i} has {} values, expected {w}",
                    row.len()
                )))
            }
            Some(_) => {}
        }
    }
    match width {
        Some(0) | None => Err(ArtifactError::Invalid(format!("{what} is empty"))),
        Some(w) => Ok(w),
    }
}

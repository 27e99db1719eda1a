//! ONNX-exported artifacts
//!
//! ONNX Runtime needs exclusive access to a session while it runs, so each
//! artifact keeps its session behind a mutex. Concurrent requests for the
//! same artifact queue on that lock; different artifacts run in parallel.

use super::{check_width, AnomalyDetector, Classifier, Clusterer, Scaler};
use crate::error::ArtifactError;
use anyhow::{ensure, Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::{DynValue, Tensor};
use std::fmt::Display;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// One ONNX session bound to the output the gateway reads.
pub struct OnnxArtifact {
    name: String,
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    n_features: Option<usize>,
}

impl OnnxArtifact {
    /// Load a model, reading `output` if given, else the first output whose
    /// name contains `preferred`, else the first output.
    pub fn load(
        path: &Path,
        name: &str,
        output: Option<&str>,
        preferred: &str,
        threads: usize,
        n_features: Option<usize>,
    ) -> Result<Self> {
        info!(artifact = %name, path = %path.display(), threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(threads)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .context("model declares no inputs")?;

        let output_name = match output {
            Some(wanted) => {
                ensure!(
                    session.outputs.iter().any(|o| o.name == wanted),
                    "model has no output named '{wanted}'"
                );
                wanted.to_string()
            }
            None => session
                .outputs
                .iter()
                .find(|o| o.name.contains(preferred))
                .or_else(|| session.outputs.first())
                .map(|o| o.name.clone())
                .context("model declares no outputs")?,
        };

        info!(
            artifact = %name,
            input = %input_name,
            output = %output_name,
            "ONNX model loaded"
        );

        Ok(Self {
            name: name.to_string(),
            session: Mutex::new(session),
            input_name,
            output_name,
            n_features,
        })
    }

    /// Run the session on one row and hand the selected output to `read`.
    fn run<T>(
        &self,
        row: &[f64],
        read: impl FnOnce(&DynValue) -> Result<T, ArtifactError>,
    ) -> Result<T, ArtifactError> {
        if let Some(width) = self.n_features {
            check_width(width, row)?;
        }

        let features: Vec<f32> = row.iter().map(|&v| v as f32).collect();
        let shape = vec![1_i64, features.len() as i64];
        let input = Tensor::from_array((shape, features)).map_err(inference)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ArtifactError::Inference(format!("session of '{}' is poisoned", self.name)))?;
        let outputs = session
            .run(ort::inputs![&self.input_name => input])
            .map_err(inference)?;
        let value = outputs.get(&self.output_name).ok_or_else(|| {
            ArtifactError::Inference(format!("output '{}' missing from results", self.output_name))
        })?;
        read(value)
    }

    fn first_label(value: &DynValue) -> Result<i64, ArtifactError> {
        let (_, data) = value.try_extract_tensor::<i64>().map_err(inference)?;
        data.first()
            .copied()
            .ok_or_else(|| ArtifactError::Inference("empty label output".to_string()))
    }
}

fn inference(e: impl Display) -> ArtifactError {
    ArtifactError::Inference(e.to_string())
}

impl Scaler for OnnxArtifact {
    fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    fn transform(&self, row: &[f64]) -> Result<Vec<f64>, ArtifactError> {
        let width = row.len();
        self.run(row, |value| {
            let (_, data) = value.try_extract_tensor::<f32>().map_err(inference)?;
            if data.len() != width {
                return Err(ArtifactError::ShapeMismatch {
                    expected: width,
                    actual: data.len(),
                });
            }
            Ok(data.iter().map(|&v| v as f64).collect())
        })
    }
}

impl Classifier for OnnxArtifact {
    fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    fn predict(&self, row: &[f64]) -> Result<i64, ArtifactError> {
        self.run(row, Self::first_label)
    }
}

impl Clusterer for OnnxArtifact {
    fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    fn predict(&self, row: &[f64]) -> Result<usize, ArtifactError> {
        let label = self.run(row, Self::first_label)?;
        usize::try_from(label)
            .map_err(|_| ArtifactError::Inference(format!("negative cluster id {label}")))
    }
}

impl AnomalyDetector for OnnxArtifact {
    fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    fn decision_function(&self, row: &[f64]) -> Result<f64, ArtifactError> {
        self.run(row, |value| {
            let (_, data) = value.try_extract_tensor::<f32>().map_err(inference)?;
            data.first()
                .map(|&v| v as f64)
                .ok_or_else(|| ArtifactError::Inference("empty score output".to_string()))
        })
    }
}

//! Artifact loader

use super::manifest::{ArtifactFormat, ArtifactKind, ManifestEntry};
use crate::artifacts::{
    DecisionTreeModel, FeatureScaler, IsolationForestModel, KMeansModel, LabelEncoderModel,
    ModelArtifact,
};
use crate::dataset::Dataset;
use anyhow::{bail, ensure, Context, Result};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Reads artifacts from disk into their in-memory form
pub struct ArtifactLoader {
    /// Number of threads for ONNX inference
    #[cfg_attr(not(feature = "onnx"), allow(dead_code))]
    onnx_threads: usize,
}

impl ArtifactLoader {
    /// Create a loader with default settings (1 ONNX thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    /// Create a loader with the given number of ONNX threads per session
    pub fn with_threads(onnx_threads: usize) -> Self {
        #[cfg(feature = "onnx")]
        {
            // Committing twice is harmless; the first environment wins.
            if let Err(e) = ort::init().commit() {
                tracing::warn!(error = %e, "ONNX Runtime environment not initialised");
            } else {
                info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
            }
        }
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Load a single artifact and check it against its declared schema
    pub fn load(&self, entry: &ManifestEntry, path: &Path) -> Result<ModelArtifact> {
        debug!(
            artifact = %entry.name,
            kind = %entry.kind,
            path = %path.display(),
            "Loading artifact"
        );

        ensure!(path.exists(), "file not found: {}", path.display());
        let format = entry
            .format()
            .with_context(|| format!("cannot infer artifact format of {}", path.display()))?;

        let artifact = match (entry.kind, format) {
            (ArtifactKind::Dataset, ArtifactFormat::Csv) => {
                ModelArtifact::Dataset(Arc::new(Dataset::from_path(path)?))
            }
            (kind, ArtifactFormat::Json) => Self::load_json(kind, path)?,
            #[cfg(feature = "onnx")]
            (_, ArtifactFormat::Onnx) => self.load_onnx(entry, path)?,
            #[cfg(not(feature = "onnx"))]
            (_, ArtifactFormat::Onnx) => {
                bail!("ONNX artifacts need the gateway built with the `onnx` feature")
            }
            (kind, format) => bail!("a {kind} cannot be read from a {format} file"),
        };

        if let (Some(schema), Some(width)) = (&entry.schema, artifact.input_width()) {
            ensure!(
                schema.len() == width,
                "schema {} declares {} features but the {} was fitted on {}",
                schema.version,
                schema.len(),
                entry.kind,
                width
            );
        }

        info!(
            artifact = %entry.name,
            kind = %entry.kind,
            input_width = ?artifact.input_width(),
            "Artifact loaded successfully"
        );

        Ok(artifact)
    }

    fn load_json(kind: ArtifactKind, path: &Path) -> Result<ModelArtifact> {
        let artifact = match kind {
            ArtifactKind::Scaler => {
                let scaler: FeatureScaler = read_json(path)?;
                scaler.validate()?;
                ModelArtifact::Scaler(Arc::new(scaler))
            }
            ArtifactKind::Classifier => {
                let model: DecisionTreeModel = read_json(path)?;
                model.validate()?;
                ModelArtifact::Classifier(Arc::new(model))
            }
            ArtifactKind::Clusterer => {
                let model: KMeansModel = read_json(path)?;
                model.validate()?;
                ModelArtifact::Clusterer(Arc::new(model))
            }
            ArtifactKind::AnomalyDetector => {
                let model: IsolationForestModel = read_json(path)?;
                model.validate()?;
                ModelArtifact::AnomalyDetector(Arc::new(model))
            }
            ArtifactKind::LabelDecoder => {
                let encoder: LabelEncoderModel = read_json(path)?;
                encoder.validate()?;
                ModelArtifact::LabelDecoder(Arc::new(encoder))
            }
            ArtifactKind::Dataset => bail!("datasets are read from csv snapshots"),
        };
        Ok(artifact)
    }

    #[cfg(feature = "onnx")]
    fn load_onnx(&self, entry: &ManifestEntry, path: &Path) -> Result<ModelArtifact> {
        use crate::artifacts::onnx::OnnxArtifact;

        let width = entry.schema.as_ref().map(|s| s.len());
        let output = entry.output.as_deref();
        let load = |preferred: &str| {
            OnnxArtifact::load(path, &entry.name, output, preferred, self.onnx_threads, width)
        };

        let artifact = match entry.kind {
            ArtifactKind::Scaler => ModelArtifact::Scaler(Arc::new(load("variable")?)),
            ArtifactKind::Classifier => ModelArtifact::Classifier(Arc::new(load("label")?)),
            ArtifactKind::Clusterer => ModelArtifact::Clusterer(Arc::new(load("label")?)),
            ArtifactKind::AnomalyDetector => {
                ModelArtifact::AnomalyDetector(Arc::new(load("scores")?))
            }
            kind => bail!("a {kind} cannot be read from an onnx file"),
        };
        Ok(artifact)
    }
}

impl Default for ArtifactLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", path.display()))
}

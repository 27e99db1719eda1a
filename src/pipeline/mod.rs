//! Per-domain feature pipelines
//!
//! A pipeline knows the registry keys of its scaler, model and (for
//! categorical targets) decoder. `run` resolves them, orders the input by
//! the scaler's registered schema, scales, and invokes the model on the
//! single resulting row.

pub mod service;

pub use service::{EndpointStatus, PredictionService};

use crate::error::{ArtifactError, PipelineError};
use crate::feature_extractor::FeatureExtractor;
use crate::registry::ArtifactRegistry;
use crate::types::{Domain, DomainInput};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Registry keys one pipeline depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineKeys {
    pub scaler: String,
    pub model: String,
    #[serde(default)]
    pub decoder: Option<String>,
}

impl PipelineKeys {
    pub fn new(scaler: &str, model: &str, decoder: Option<&str>) -> Self {
        Self {
            scaler: scaler.to_string(),
            model: model.to_string(),
            decoder: decoder.map(str::to_string),
        }
    }

    pub fn defaults(domain: Domain) -> Self {
        match domain {
            Domain::Risk => Self::new("scaler_risk", "dt_model", Some("le_risk")),
            Domain::Anomaly => Self::new("scaler_anomaly", "iso_model", None),
            Domain::Segmentation => Self::new("scaler_rfm", "kmeans_model", None),
        }
    }
}

/// Model output before interpretation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawOutput {
    /// Encoded class id from a classifier
    Class(i64),
    /// Cluster index from a clusterer
    Cluster(usize),
    /// Anomaly decision score
    Score(f64),
}

#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    domain: Domain,
    keys: PipelineKeys,
}

impl FeaturePipeline {
    pub fn new(domain: Domain, keys: PipelineKeys) -> Self {
        Self { domain, keys }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn keys(&self) -> &PipelineKeys {
        &self.keys
    }

    /// Every registry key that must be available for `run` to succeed.
    pub fn required_keys(&self) -> Vec<&str> {
        let mut keys = vec![self.keys.scaler.as_str(), self.keys.model.as_str()];
        keys.extend(self.keys.decoder.as_deref());
        keys
    }

    /// Build the unscaled row in the scaler's fitted order.
    pub fn vectorize<I: DomainInput>(
        &self,
        registry: &ArtifactRegistry,
        input: &I,
    ) -> Result<Vec<f64>, PipelineError> {
        let scaler_schema = registry.schema(&self.keys.scaler);
        if let (Some(scaler), Some(model)) = (scaler_schema, registry.schema(&self.keys.model)) {
            if scaler.features != model.features {
                return Err(PipelineError::SchemaMismatch {
                    scaler: self.keys.scaler.clone(),
                    model: self.keys.model.clone(),
                });
            }
        }

        let extractor = match scaler_schema {
            Some(schema) => FeatureExtractor::from_schema(&self.keys.scaler, schema),
            None => FeatureExtractor::declared::<I>(&self.keys.scaler),
        };
        extractor.extract(input)
    }

    /// Order, scale and infer.
    pub fn run<I: DomainInput>(
        &self,
        registry: &ArtifactRegistry,
        input: &I,
    ) -> Result<RawOutput, PipelineError> {
        for key in self.required_keys() {
            registry.get(key)?;
        }

        let row = self.vectorize(registry, input)?;
        let scaler = registry.scaler(&self.keys.scaler)?;
        let scaled = scaler
            .transform(&row)
            .map_err(|e| PipelineError::from_artifact(&self.keys.scaler, e))?;

        let model = self.keys.model.as_str();
        let in_model = |e: ArtifactError| PipelineError::from_artifact(model, e);
        let raw = match self.domain {
            Domain::Risk => {
                RawOutput::Class(registry.classifier(model)?.predict(&scaled).map_err(in_model)?)
            }
            Domain::Segmentation => {
                RawOutput::Cluster(registry.clusterer(model)?.predict(&scaled).map_err(in_model)?)
            }
            Domain::Anomaly => RawOutput::Score(
                registry
                    .anomaly_detector(model)?
                    .decision_function(&scaled)
                    .map_err(in_model)?,
            ),
        };

        debug!(domain = %self.domain, raw = ?raw, "Pipeline inference complete");
        Ok(raw)
    }

    /// Error for a raw output of the wrong shape for this domain.
    pub(crate) fn unexpected(&self, raw: RawOutput) -> PipelineError {
        PipelineError::Artifact {
            artifact: self.keys.model.clone(),
            message: format!("unexpected {raw:?} output for the {} pipeline", self.domain),
        }
    }
}

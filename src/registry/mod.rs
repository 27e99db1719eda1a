//! In-memory artifact registry
//!
//! Populated once at startup from the manifest. Every entry loads on its
//! own: a failure is recorded against that key and the rest keep loading.
//! After `load` (or `RegistryBuilder::build`) returns there is no way to
//! mutate it, so it is shared across request handlers without locking.

pub mod loader;
pub mod manifest;

pub use loader::ArtifactLoader;
pub use manifest::{ArtifactFormat, ArtifactKind, ArtifactManifest, FeatureSchema, ManifestEntry};

use crate::artifacts::{
    AnomalyDetector, Classifier, Clusterer, LabelDecoder, ModelArtifact, Scaler,
};
use crate::dataset::Dataset;
use crate::error::RegistryError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Queryable health of a registry key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ArtifactStatus {
    Available,
    Unavailable { reason: String },
    /// The key was never declared
    Unknown,
}

/// Health line for one declared artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactHealth {
    pub name: String,
    pub kind: ArtifactKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    #[serde(flatten)]
    pub status: ArtifactStatus,
}

#[derive(Debug, Clone)]
enum EntryState {
    Loaded(ModelArtifact),
    Failed(String),
}

#[derive(Debug, Clone)]
struct RegistryEntry {
    kind: ArtifactKind,
    schema: Option<FeatureSchema>,
    state: EntryState,
}

/// Read-only mapping from artifact name to loaded artifact.
#[derive(Debug, Clone, Default)]
pub struct ArtifactRegistry {
    entries: BTreeMap<String, RegistryEntry>,
}

impl ArtifactRegistry {
    /// Load every manifest entry independently. Never fails as a whole.
    pub fn load(manifest: &ArtifactManifest) -> Self {
        info!(
            entries = manifest.entries.len(),
            base_dir = %manifest.base_dir,
            "Loading artifacts"
        );

        let loader = ArtifactLoader::with_threads(manifest.onnx_threads);
        let mut builder = Self::builder();

        for entry in &manifest.entries {
            let path = manifest.resolve(entry);
            match loader.load(entry, &path) {
                Ok(artifact) => {
                    builder = builder.entry(&entry.name, entry.schema.clone(), artifact);
                }
                Err(e) => {
                    error!(
                        artifact = %entry.name,
                        kind = %entry.kind,
                        error = %format!("{e:#}"),
                        "Failed to load artifact; dependent endpoints are disabled"
                    );
                    builder = builder.failed(&entry.name, entry.kind, format!("{e:#}"));
                }
            }
        }

        let registry = builder.build();
        info!(
            available = registry.available_count(),
            total = registry.len(),
            "Artifact registry ready"
        );
        registry
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Number of declared keys, loaded or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn available_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| matches!(e.state, EntryState::Loaded(_)))
            .count()
    }

    pub fn get(&self, name: &str) -> Result<&ModelArtifact, RegistryError> {
        match self.entries.get(name).map(|e| &e.state) {
            Some(EntryState::Loaded(artifact)) => Ok(artifact),
            _ => Err(RegistryError::ArtifactUnavailable {
                name: name.to_string(),
            }),
        }
    }

    pub fn is_available(&self, name: &str) -> bool {
        self.get(name).is_ok()
    }

    /// Feature schema declared alongside the key, loaded or not.
    pub fn schema(&self, name: &str) -> Option<&FeatureSchema> {
        self.entries.get(name).and_then(|e| e.schema.as_ref())
    }

    pub fn status(&self, name: &str) -> ArtifactStatus {
        match self.entries.get(name).map(|e| &e.state) {
            Some(EntryState::Loaded(_)) => ArtifactStatus::Available,
            Some(EntryState::Failed(reason)) => ArtifactStatus::Unavailable {
                reason: reason.clone(),
            },
            None => ArtifactStatus::Unknown,
        }
    }

    /// Status of every declared key, sorted by name.
    pub fn health(&self) -> Vec<ArtifactHealth> {
        self.entries
            .iter()
            .map(|(name, entry)| ArtifactHealth {
                name: name.clone(),
                kind: entry.kind,
                schema_version: entry.schema.as_ref().map(|s| s.version.clone()),
                status: self.status(name),
            })
            .collect()
    }

    pub fn scaler(&self, name: &str) -> Result<Arc<dyn Scaler>, RegistryError> {
        match self.get(name)? {
            ModelArtifact::Scaler(a) => Ok(a.clone()),
            other => Err(wrong_kind(name, ArtifactKind::Scaler, other)),
        }
    }

    pub fn classifier(&self, name: &str) -> Result<Arc<dyn Classifier>, RegistryError> {
        match self.get(name)? {
            ModelArtifact::Classifier(a) => Ok(a.clone()),
            other => Err(wrong_kind(name, ArtifactKind::Classifier, other)),
        }
    }

    pub fn clusterer(&self, name: &str) -> Result<Arc<dyn Clusterer>, RegistryError> {
        match self.get(name)? {
            ModelArtifact::Clusterer(a) => Ok(a.clone()),
            other => Err(wrong_kind(name, ArtifactKind::Clusterer, other)),
        }
    }

    pub fn anomaly_detector(&self, name: &str) -> Result<Arc<dyn AnomalyDetector>, RegistryError> {
        match self.get(name)? {
            ModelArtifact::AnomalyDetector(a) => Ok(a.clone()),
            other => Err(wrong_kind(name, ArtifactKind::AnomalyDetector, other)),
        }
    }

    pub fn label_decoder(&self, name: &str) -> Result<Arc<dyn LabelDecoder>, RegistryError> {
        match self.get(name)? {
            ModelArtifact::LabelDecoder(a) => Ok(a.clone()),
            other => Err(wrong_kind(name, ArtifactKind::LabelDecoder, other)),
        }
    }

    pub fn dataset(&self, name: &str) -> Result<Arc<Dataset>, RegistryError> {
        match self.get(name)? {
            ModelArtifact::Dataset(a) => Ok(a.clone()),
            other => Err(wrong_kind(name, ArtifactKind::Dataset, other)),
        }
    }
}

fn wrong_kind(name: &str, expected: ArtifactKind, actual: &ModelArtifact) -> RegistryError {
    RegistryError::WrongKind {
        name: name.to_string(),
        expected,
        actual: actual.kind(),
    }
}

/// Assembles a registry from already-loaded artifacts. Used by `load` and
/// by tests that substitute fake artifacts.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: BTreeMap<String, RegistryEntry>,
}

impl RegistryBuilder {
    pub fn artifact(self, name: &str, artifact: ModelArtifact) -> Self {
        self.entry(name, None, artifact)
    }

    pub fn artifact_with_schema(self, name: &str, schema: FeatureSchema, artifact: ModelArtifact) -> Self {
        self.entry(name, Some(schema), artifact)
    }

    /// Record a key that failed to load.
    pub fn failed(self, name: &str, kind: ArtifactKind, reason: impl Into<String>) -> Self {
        self.insert(
            name,
            RegistryEntry {
                kind,
                schema: None,
                state: EntryState::Failed(reason.into()),
            },
        )
    }

    fn entry(self, name: &str, schema: Option<FeatureSchema>, artifact: ModelArtifact) -> Self {
        self.insert(
            name,
            RegistryEntry {
                kind: artifact.kind(),
                schema,
                state: EntryState::Loaded(artifact),
            },
        )
    }

    fn insert(mut self, name: &str, entry: RegistryEntry) -> Self {
        if self.entries.insert(name.to_string(), entry).is_some() {
            warn!(artifact = %name, "Duplicate artifact key, keeping the last entry");
        }
        self
    }

    pub fn build(self) -> ArtifactRegistry {
        ArtifactRegistry {
            entries: self.entries,
        }
    }
}

//! Artifact manifest: what to load, from where, and in which feature order

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Capability an artifact provides once loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Scaler,
    Classifier,
    Clusterer,
    AnomalyDetector,
    LabelDecoder,
    Dataset,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArtifactKind::Scaler => "scaler",
            ArtifactKind::Classifier => "classifier",
            ArtifactKind::Clusterer => "clusterer",
            ArtifactKind::AnomalyDetector => "anomaly detector",
            ArtifactKind::LabelDecoder => "label decoder",
            ArtifactKind::Dataset => "dataset",
        })
    }
}

/// On-disk encoding of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// Fitted parameters exported as JSON
    Json,
    /// ONNX graph (requires the `onnx` feature)
    Onnx,
    /// Tabular snapshot
    Csv,
}

impl ArtifactFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(ArtifactFormat::Json),
            "onnx" => Some(ArtifactFormat::Onnx),
            "csv" => Some(ArtifactFormat::Csv),
            _ => None,
        }
    }
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArtifactFormat::Json => "json",
            ArtifactFormat::Onnx => "onnx",
            ArtifactFormat::Csv => "csv",
        })
    }
}

/// Ordered input features an artifact was fitted with.
///
/// Part of the artifact's contract: it travels with the registry entry and
/// is never inferred from the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: String,
    pub features: Vec<String>,
}

impl FeatureSchema {
    pub fn new<S: Into<String>>(version: impl Into<String>, features: impl IntoIterator<Item = S>) -> Self {
        Self {
            version: version.into(),
            features: features.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// One named artifact to load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub kind: ArtifactKind,
    /// Relative to the manifest's `base_dir` unless absolute
    pub path: String,
    /// Inferred from the file extension when absent
    #[serde(default)]
    pub format: Option<ArtifactFormat>,
    #[serde(default)]
    pub schema: Option<FeatureSchema>,
    /// ONNX output tensor to read instead of the kind's default
    #[serde(default)]
    pub output: Option<String>,
}

impl ManifestEntry {
    pub fn new(name: impl Into<String>, kind: ArtifactKind, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            path: path.into(),
            format: None,
            schema: None,
            output: None,
        }
    }

    pub fn with_schema(mut self, schema: FeatureSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn format(&self) -> Option<ArtifactFormat> {
        self.format.or_else(|| ArtifactFormat::from_path(Path::new(&self.path)))
    }
}

/// Everything the registry loads at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactManifest {
    pub base_dir: String,
    pub entries: Vec<ManifestEntry>,
    /// Intra-op threads per ONNX session
    pub onnx_threads: usize,
}

pub const RISK_FEATURES: [&str; 4] = ["loan_amount", "interest_rate", "loan_term", "age"];
pub const ANOMALY_FEATURES: [&str; 4] = [
    "transaction_amount",
    "account_balance_after_transaction",
    "credit_card_balance",
    "rewards_points",
];
pub const RFM_FEATURES: [&str; 3] = ["recency", "frequency", "monetary"];

impl ArtifactManifest {
    pub fn new(base_dir: impl Into<String>, entries: Vec<ManifestEntry>) -> Self {
        Self {
            base_dir: base_dir.into(),
            entries,
            onnx_threads: 1,
        }
    }

    pub fn resolve(&self, entry: &ManifestEntry) -> PathBuf {
        let path = Path::new(&entry.path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            Path::new(&self.base_dir).join(path)
        }
    }

    /// The file set produced by the training notebooks.
    pub fn default_entries() -> Vec<ManifestEntry> {
        let risk = FeatureSchema::new("v1", RISK_FEATURES);
        let anomaly = FeatureSchema::new("v1", ANOMALY_FEATURES);
        let rfm = FeatureSchema::new("v1", RFM_FEATURES);

        vec![
            ManifestEntry::new("dim_customer", ArtifactKind::Dataset, "cleaned_banking.csv"),
            ManifestEntry::new("scaler_anomaly", ArtifactKind::Scaler, "models/anomaly_feature_scaler.json")
                .with_schema(anomaly.clone()),
            ManifestEntry::new("iso_model", ArtifactKind::AnomalyDetector, "models/iso_forest_model.json")
                .with_schema(anomaly),
            ManifestEntry::new("kmeans_model", ArtifactKind::Clusterer, "models/kmeans_model.json")
                .with_schema(rfm.clone()),
            ManifestEntry::new("scaler_rfm", ArtifactKind::Scaler, "models/rfm_feature_scaler.json")
                .with_schema(rfm),
            ManifestEntry::new("dt_model", ArtifactKind::Classifier, "models/risk_dt_model.json")
                .with_schema(risk.clone()),
            ManifestEntry::new("scaler_risk", ArtifactKind::Scaler, "models/risk_feature_scaler.json")
                .with_schema(risk),
            ManifestEntry::new("le_risk", ArtifactKind::LabelDecoder, "models/risk_label_encoder.json"),
        ]
    }
}

impl Default for ArtifactManifest {
    fn default() -> Self {
        Self::new(".", Self::default_entries())
    }
}

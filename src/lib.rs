//! Prediction Gateway Library
//!
//! Serves pre-trained risk, anomaly and segmentation models behind a
//! stateless HTTP layer. Artifacts are loaded once into a read-only
//! registry; each request orders, scales and scores its own feature row.

pub mod api;
pub mod artifacts;
pub mod config;
pub mod dataset;
pub mod error;
pub mod feature_extractor;
pub mod interpret;
pub mod metrics;
pub mod pipeline;
pub mod registry;
pub mod types;

pub use api::{router, AppState};
pub use config::AppConfig;
pub use error::{FailureClass, PipelineError, RegistryError};
pub use feature_extractor::FeatureExtractor;
pub use metrics::GatewayMetrics;
pub use pipeline::PredictionService;
pub use registry::{ArtifactManifest, ArtifactRegistry};

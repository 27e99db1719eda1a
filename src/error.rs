//! Error taxonomy for artifacts, the registry and the feature pipelines
//!
//! Startup loading reports through `anyhow` (see `registry::loader`); the
//! request path uses the typed errors below so the HTTP boundary can tell a
//! configuration problem from a drifted artifact or a bad request.

use crate::registry::ArtifactKind;
use crate::types::Domain;
use serde::Serialize;
use thiserror::Error;

/// Failure raised by a single artifact while transforming or predicting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArtifactError {
    /// Input row width does not match what the artifact was fitted on.
    #[error("expected {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Encoded class the decoder has never seen.
    #[error("unseen encoded label {0}")]
    UnknownLabel(i64),

    /// Artifact parameters are internally inconsistent.
    #[error("invalid artifact: {0}")]
    Invalid(String),

    /// The inference primitive itself failed.
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Registry lookup failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    /// The key was never loaded successfully (or never declared).
    #[error("required artifact '{name}' is unavailable")]
    ArtifactUnavailable { name: String },

    /// The key resolves to an artifact of another kind.
    #[error("artifact '{name}' is a {actual}, expected a {expected}")]
    WrongKind {
        name: String,
        expected: ArtifactKind,
        actual: ArtifactKind,
    },
}

/// Failure of a domain feature pipeline or its interpreter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The artifact schema names a feature the domain record cannot supply.
    #[error("feature '{feature}' declared by '{artifact}' is not part of the {domain} input")]
    MissingFeature {
        artifact: String,
        feature: String,
        domain: Domain,
    },

    /// Scaler and model were registered with different feature orders.
    #[error("feature schema of '{scaler}' does not match '{model}'")]
    SchemaMismatch { scaler: String, model: String },

    #[error("'{artifact}' expects {expected} features, got {actual}")]
    ShapeMismatch {
        artifact: String,
        expected: usize,
        actual: usize,
    },

    #[error("'{artifact}' cannot decode class {code}")]
    Decode { artifact: String, code: i64 },

    #[error("'{artifact}' failed: {message}")]
    Artifact { artifact: String, message: String },
}

impl PipelineError {
    /// Attach the registry key of the artifact that produced `err`.
    pub fn from_artifact(artifact: &str, err: ArtifactError) -> Self {
        match err {
            ArtifactError::ShapeMismatch { expected, actual } => PipelineError::ShapeMismatch {
                artifact: artifact.to_string(),
                expected,
                actual,
            },
            ArtifactError::UnknownLabel(code) => PipelineError::Decode {
                artifact: artifact.to_string(),
                code,
            },
            ArtifactError::Invalid(message) | ArtifactError::Inference(message) => {
                PipelineError::Artifact {
                    artifact: artifact.to_string(),
                    message,
                }
            }
        }
    }

    /// Failure class used to separate configuration drift from broken artifacts.
    pub fn class(&self) -> FailureClass {
        match self {
            PipelineError::Registry(_) => FailureClass::Configuration,
            PipelineError::MissingFeature { .. }
            | PipelineError::SchemaMismatch { .. }
            | PipelineError::ShapeMismatch { .. } => FailureClass::ShapeMismatch,
            PipelineError::Decode { .. } | PipelineError::Artifact { .. } => FailureClass::Artifact,
        }
    }
}

/// Coarse failure classes reported in logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Malformed request body, rejected before any pipeline runs.
    Validation,
    /// Required artifact missing or of the wrong kind.
    Configuration,
    /// Declared feature order and artifact width disagree.
    ShapeMismatch,
    /// Artifact raised during inference or decoding.
    Artifact,
}

impl FailureClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureClass::Validation => "validation",
            FailureClass::Configuration => "configuration",
            FailureClass::ShapeMismatch => "shape_mismatch",
            FailureClass::Artifact => "artifact",
        }
    }
}

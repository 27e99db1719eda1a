//! Type definitions for the prediction gateway

pub mod domain;
pub mod input;
pub mod prediction;

pub use domain::Domain;
pub use input::{AnomalyInput, DomainInput, RiskInput, SegmentationInput};
pub use prediction::{
    AlertMessage, AnomalyPrediction, PredictionResponse, RiskLevel, RiskPrediction,
    SegmentLabel, SegmentPrediction,
};

//! Shared fixtures for the integration tests

#![allow(dead_code)]

use axum::body::{to_bytes, Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use prediction_gateway::artifacts::{
    AnomalyDetector, Classifier, Clusterer, FeatureScaler, LabelEncoderModel, ModelArtifact,
};
use prediction_gateway::dataset::Dataset;
use prediction_gateway::error::ArtifactError;
use prediction_gateway::registry::RegistryBuilder;
use prediction_gateway::{api, AppState, ArtifactRegistry, GatewayMetrics, PredictionService};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Classifier that always emits the same encoded class.
pub struct FixedClass(pub i64);

impl Classifier for FixedClass {
    fn n_features(&self) -> Option<usize> {
        Some(4)
    }

    fn predict(&self, _row: &[f64]) -> Result<i64, ArtifactError> {
        Ok(self.0)
    }
}

/// Anomaly detector that always returns the same decision score.
pub struct FixedScore(pub f64);

impl AnomalyDetector for FixedScore {
    fn n_features(&self) -> Option<usize> {
        Some(4)
    }

    fn decision_function(&self, _row: &[f64]) -> Result<f64, ArtifactError> {
        Ok(self.0)
    }
}

/// Clusterer that always assigns the same cluster.
pub struct FixedCluster(pub usize);

impl Clusterer for FixedCluster {
    fn n_features(&self) -> Option<usize> {
        Some(3)
    }

    fn predict(&self, _row: &[f64]) -> Result<usize, ArtifactError> {
        Ok(self.0)
    }
}

pub fn identity_scaler(width: usize) -> ModelArtifact {
    ModelArtifact::Scaler(Arc::new(FeatureScaler::Standard {
        mean: vec![0.0; width],
        scale: vec![1.0; width],
    }))
}

pub fn risk_decoder() -> ModelArtifact {
    ModelArtifact::LabelDecoder(Arc::new(LabelEncoderModel {
        classes: vec!["Approved".into(), "Closed".into(), "Rejected".into()],
    }))
}

pub const SNAPSHOT: &str = "\
Customer ID,First Name,Last Name,Age,Loan Amount,Interest Rate,Loan Term,Loan Status,Segment_Label
1,Ada,Lovelace,36,12000.5,4.2,36,Approved,Mid-Value/Loyal
2,Alan,Turing,41,5000,7.9,60,Rejected,High-Value/Frequent
3,Grace,Hopper,29,800,3.1,12,Closed,Mid-Value/Loyal
";

pub fn dataset(csv: &str) -> ModelArtifact {
    ModelArtifact::Dataset(Arc::new(Dataset::from_reader(csv.as_bytes()).unwrap()))
}

/// Builder with every default key backed by a fake.
pub fn fake_registry(class: i64, score: f64, cluster: usize) -> RegistryBuilder {
    ArtifactRegistry::builder()
        .artifact("scaler_risk", identity_scaler(4))
        .artifact("dt_model", ModelArtifact::Classifier(Arc::new(FixedClass(class))))
        .artifact("le_risk", risk_decoder())
        .artifact("scaler_anomaly", identity_scaler(4))
        .artifact("iso_model", ModelArtifact::AnomalyDetector(Arc::new(FixedScore(score))))
        .artifact("scaler_rfm", identity_scaler(3))
        .artifact("kmeans_model", ModelArtifact::Clusterer(Arc::new(FixedCluster(cluster))))
        .artifact("dim_customer", dataset(SNAPSHOT))
}

pub fn app(registry: ArtifactRegistry) -> Router {
    let service = PredictionService::with_default_keys(
        Arc::new(registry),
        Arc::new(GatewayMetrics::new()),
    );
    api::router(AppState::new(Arc::new(service), "dim_customer"), true)
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Bytes) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body)
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::get(uri).body(Body::empty()).unwrap();
    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

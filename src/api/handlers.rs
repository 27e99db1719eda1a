//! Request handlers

use super::{ApiError, ApiResult, AppState};
use crate::dataset::{LoanRiskRow, SegmentShare};
use crate::metrics::MetricsSnapshot;
use crate::pipeline::EndpointStatus;
use crate::registry::{ArtifactHealth, ArtifactStatus};
use crate::types::{
    AnomalyInput, AnomalyPrediction, Domain, PredictionResponse, RiskInput, RiskPrediction,
    SegmentPrediction, SegmentationInput,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

/// Rows returned by the loan risk report.
const LOAN_RISK_ROWS: usize = 50;

const MISSING_SEGMENTS: &str =
    "Segment_Label column not found in customer data. Run Phase 2 code again.";

pub async fn predict_risk(
    State(state): State<AppState>,
    payload: Result<Json<RiskInput>, JsonRejection>,
) -> ApiResult<Json<PredictionResponse<RiskPrediction>>> {
    let input = state.accept(Domain::Risk, payload)?;
    let prediction = state
        .service
        .predict_risk(&input)
        .map_err(ApiError::prediction(Domain::Risk))?;
    Ok(Json(PredictionResponse::success(prediction)))
}

pub async fn predict_anomaly(
    State(state): State<AppState>,
    payload: Result<Json<AnomalyInput>, JsonRejection>,
) -> ApiResult<Json<PredictionResponse<AnomalyPrediction>>> {
    let input = state.accept(Domain::Anomaly, payload)?;
    let prediction = state
        .service
        .predict_anomaly(&input)
        .map_err(ApiError::prediction(Domain::Anomaly))?;
    Ok(Json(PredictionResponse::success(prediction)))
}

pub async fn predict_segment(
    State(state): State<AppState>,
    payload: Result<Json<SegmentationInput>, JsonRejection>,
) -> ApiResult<Json<PredictionResponse<SegmentPrediction>>> {
    let input = state.accept(Domain::Segmentation, payload)?;
    let prediction = state
        .service
        .predict_segment(&input)
        .map_err(ApiError::prediction(Domain::Segmentation))?;
    Ok(Json(PredictionResponse::success(prediction)))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
    pub artifacts: Vec<ArtifactHealth>,
    pub endpoints: Vec<EndpointStatus>,
}

/// `healthy` only when every declared artifact loaded.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let artifacts = state.service.registry().health();
    let endpoints = state.service.endpoint_status();
    let healthy = artifacts
        .iter()
        .all(|a| a.status == ArtifactStatus::Available)
        && endpoints.iter().all(|e| e.available);

    Json(HealthResponse {
        status: if healthy { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
        artifacts,
        endpoints,
    })
}

pub async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.service.metrics().snapshot())
}

#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub status: &'static str,
    pub data: T,
}

pub async fn segment_summary(State(state): State<AppState>) -> ApiResult<Response> {
    let dataset = state
        .service
        .registry()
        .dataset(&state.dataset_key)
        .map_err(|e| ApiError::Unavailable(e.to_string()))?;

    let response = match dataset.segment_summary() {
        Some(data) => Json(DataResponse::<Vec<SegmentShare>> {
            status: "success",
            data,
        })
        .into_response(),
        None => Json(json!({ "error": MISSING_SEGMENTS })).into_response(),
    };
    Ok(response)
}

/// Bare list of the first rows, loan status reported as the risk prediction.
pub async fn loan_risk_summary(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<LoanRiskRow>>> {
    let dataset = state
        .service
        .registry()
        .dataset(&state.dataset_key)
        .map_err(|e| ApiError::Unavailable(e.to_string()))?;

    let rows = dataset
        .loan_risk_table(LOAN_RISK_ROWS)
        .map_err(|e| ApiError::Data(e.to_string()))?;
    Ok(Json(rows))
}

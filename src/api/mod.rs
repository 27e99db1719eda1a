//! HTTP surface: prediction endpoints, health, metrics and dataset reports

pub mod error;
pub mod handlers;

pub use error::{ApiError, ApiResult};

use crate::error::FailureClass;
use crate::pipeline::PredictionService;
use crate::types::Domain;
use axum::{
    extract::rejection::JsonRejection,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::debug;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
    /// Registry key of the customer dataset snapshot
    pub dataset_key: Arc<str>,
}

impl AppState {
    pub fn new(service: Arc<PredictionService>, dataset_key: &str) -> Self {
        Self {
            service,
            dataset_key: Arc::from(dataset_key),
        }
    }

    /// Unwrap a JSON body, counting a rejection as a validation failure.
    pub(crate) fn accept<T>(
        &self,
        domain: Domain,
        payload: Result<Json<T>, JsonRejection>,
    ) -> ApiResult<T> {
        match payload {
            Ok(Json(input)) => Ok(input),
            Err(rejection) => {
                let detail = rejection.body_text();
                debug!(domain = %domain, detail = %detail, "Rejected request body");
                self.service
                    .metrics()
                    .record_failure(domain, FailureClass::Validation);
                Err(ApiError::Validation(detail))
            }
        }
    }
}

/// Build the router with all routes
pub fn router(state: AppState, permissive_cors: bool) -> Router {
    let router = Router::new()
        .route("/predict/risk", post(handlers::predict_risk))
        .route("/predict/anomaly", post(handlers::predict_anomaly))
        .route("/predict/segment", post(handlers::predict_segment))
        .route("/data/segment_summary", get(handlers::segment_summary))
        .route("/data/loan_risk_summary", get(handlers::loan_risk_summary))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(TraceLayer::new_for_http());

    let router = if permissive_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    };

    router.with_state(state)
}

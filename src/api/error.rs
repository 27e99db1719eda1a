//! HTTP error contract

use crate::error::PipelineError;
use crate::types::Domain;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Request body failed structural validation
    #[error("{0}")]
    Validation(String),

    /// A domain pipeline or interpreter failed
    #[error("{} prediction failed: {source}", domain.title())]
    Prediction {
        domain: Domain,
        source: PipelineError,
    },

    /// A collaborator the endpoint reads from did not load
    #[error("{0}")]
    Unavailable(String),

    /// The dataset snapshot lacks what the endpoint reports on
    #[error("{0}")]
    Data(String),
}

impl ApiError {
    pub fn prediction(domain: Domain) -> impl FnOnce(PipelineError) -> Self {
        move |source| ApiError::Prediction { domain, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Prediction { .. } | ApiError::Data(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{}", self);
        }

        let body = Json(json!({ "detail": self.to_string() }));
        (status, body).into_response()
    }
}

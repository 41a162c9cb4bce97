use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::AnalysisServiceError;

/// The only failures a caller of the analysis pipeline ever sees.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Input(String),

    #[error("Analysis service error: {0}")]
    AnalysisService(#[from] AnalysisServiceError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Input(msg) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": {
                        "code": "INPUT_ERROR",
                        "message": msg
                    }
                }),
            ),
            AppError::AnalysisService(e) => {
                tracing::error!("Analysis service error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    json!({
                        "error": {
                            "code": "ANALYSIS_SERVICE_ERROR",
                            "message": e.to_string(),
                            "upstream_status": e.upstream_status()
                        }
                    }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

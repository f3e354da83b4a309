use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::ledger::LedgerError;
use crate::sync::SyncError;

/// Client-visible failure taxonomy. Every handler returns
/// `Result<_, ApiError>`; the `IntoResponse` impl is the single place
/// status codes are assigned.
#[derive(Debug, Error)]
pub enum ApiError {
	#[error("{0}")]
	Validation(String),
	#[error("unauthorized: {0}")]
	Unauthorized(String),
	#[error("{0}")]
	NotFound(String),
	#[error("{0}")]
	Insufficient(String),
	#[error("service unavailable: {0}")]
	Unavailable(String),
}

impl ApiError {
	fn status(&self) -> StatusCode {
		match self {
			ApiError::Validation(_) => StatusCode::BAD_REQUEST,
			ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
			ApiError::NotFound(_) => StatusCode::NOT_FOUND,
			ApiError::Insufficient(_) => StatusCode::CONFLICT,
			ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let status = self.status();
		(status, Json(json!({ "error": self.to_string() }))).into_response()
	}
}

impl From<LedgerError> for ApiError {
	fn from(err: LedgerError) -> Self {
		match &err {
			LedgerError::NotFound { .. } => ApiError::NotFound(err.to_string()),
			LedgerError::Insufficient { .. } => ApiError::Insufficient(err.to_string()),
			// Contention and store failures both read as "try again".
			LedgerError::Contended { .. } | LedgerError::Store(_) => {
				ApiError::Unavailable(err.to_string())
			}
		}
	}
}

impl From<SyncError> for ApiError {
	fn from(err: SyncError) -> Self {
		ApiError::Unavailable(err.to_string())
	}
}

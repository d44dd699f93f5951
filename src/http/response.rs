//! Response shaping and error mapping.
//!
//! # Responsibilities
//! - Success bodies of write endpoints (`message` + `transaction_hash`)
//! - Map pipeline, binding and query failures to HTTP status codes
//!
//! # Design Decisions
//! - Every write failure is a 500 carrying `detail` and a stable `kind`
//! - A confirmation timeout still reports the hash; its fate is unknown
//! - Body validation failures are 422

use alloy::primitives::TxHash;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::blockchain::TxError;
use crate::contract::BindingError;
use crate::queries::QueryError;

/// Body of a successful write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteReceipt {
    pub message: String,
    pub transaction_hash: String,
}

impl WriteReceipt {
    pub fn new(message: &str, tx_hash: TxHash) -> Self {
        Self {
            message: message.to_string(),
            transaction_hash: tx_hash.to_string(),
        }
    }
}

/// Body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
}

#[derive(Debug)]
pub enum ApiError {
    /// Field-level validation failure.
    Validation(String),
    /// Body could not be parsed into the request type.
    Body(JsonRejection),
    /// The pipeline failed before an outcome was known.
    Transaction(TxError),
    /// Mined with a failed status.
    Reverted(TxHash),
    /// Call data could not be built.
    Encoding(BindingError),
    Query(QueryError),
}

impl From<TxError> for ApiError {
    fn from(err: TxError) -> Self {
        ApiError::Transaction(err)
    }
}

impl From<BindingError> for ApiError {
    fn from(err: BindingError) -> Self {
        ApiError::Encoding(err)
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        ApiError::Query(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Body(rejection)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Body(rejection) => rejection.status(),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            ApiError::Validation(detail) => ErrorBody {
                detail: detail.clone(),
                kind: Some("ValidationError".to_string()),
                transaction_hash: None,
            },
            ApiError::Body(rejection) => ErrorBody {
                detail: rejection.body_text(),
                kind: Some("ValidationError".to_string()),
                transaction_hash: None,
            },
            ApiError::Transaction(err) => ErrorBody {
                detail: err.to_string(),
                kind: Some(err.kind().to_string()),
                transaction_hash: match err {
                    TxError::ConfirmationTimeout { tx_hash, .. } => Some(tx_hash.to_string()),
                    _ => None,
                },
            },
            ApiError::Reverted(tx_hash) => ErrorBody {
                detail: format!("Transaction {} reverted", tx_hash),
                kind: Some("Reverted".to_string()),
                transaction_hash: Some(tx_hash.to_string()),
            },
            ApiError::Encoding(err) => ErrorBody {
                detail: err.to_string(),
                kind: Some("EncodingFailed".to_string()),
                transaction_hash: None,
            },
            ApiError::Query(err) => ErrorBody {
                detail: err.to_string(),
                kind: None,
                transaction_hash: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = self.body();

        if status.is_server_error() {
            tracing::error!(
                status = status.as_u16(),
                kind = ?body.kind,
                detail = %body.detail,
                "Request failed"
            );
        } else {
            tracing::debug!(status = status.as_u16(), detail = %body.detail, "Request rejected");
        }

        (status, Json(body)).into_response()
    }
}

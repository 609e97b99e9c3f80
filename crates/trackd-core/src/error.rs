// crates/trackd-core/src/error.rs
//
// The canonical gateway error and its wire representation.
//
// Every failure that crosses a protocol face is one of four kinds:
// validation (with optional per-field detail), unauthenticated,
// not-found, or internal. Both the RPC envelope and the HTTP body carry
// the same `ErrorBody` shape, so the two faces can never disagree on
// what a failure looks like.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Gateway-wide error taxonomy shared by both protocol faces.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// Input failed validation; `fields` maps field name to message.
    #[error("{message}")]
    Validation {
        message: String,
        fields: HashMap<String, String>,
    },

    /// Missing, malformed, expired, or revoked credential.
    #[error("{0}")]
    Unauthenticated(String),

    /// Requested entity or method does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Catch-all, including recovered panics. Never carries internals.
    #[error("{0}")]
    Internal(String),
}

impl GatewayError {
    pub fn validation(message: impl Into<String>, fields: HashMap<String, String>) -> Self {
        GatewayError::Validation {
            message: message.into(),
            fields,
        }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        GatewayError::Unauthenticated(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        GatewayError::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        GatewayError::Internal(message.into())
    }

    /// HTTP status class for this error kind.
    pub fn http_status(&self) -> u16 {
        match self {
            GatewayError::Validation { .. } => 400,
            GatewayError::Unauthenticated(_) => 401,
            GatewayError::NotFound(_) => 404,
            GatewayError::Internal(_) => 500,
        }
    }

    /// Wire representation carried in the RPC envelope and the HTTP body.
    pub fn to_body(&self) -> ErrorBody {
        let fields = match self {
            GatewayError::Validation { fields, .. } if !fields.is_empty() => {
                Some(fields.clone())
            }
            _ => None,
        };
        ErrorBody {
            message: self.to_string(),
            status: self.http_status(),
            fields,
        }
    }
}

/// Structured error body shared by both faces:
/// `{"message": ..., "status": ..., "fields": {..}?}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub message: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<HashMap<String, String>>,
}

impl From<ErrorBody> for GatewayError {
    /// Recover the error kind from a wire body by status class.
    fn from(body: ErrorBody) -> Self {
        match body.status {
            401 | 403 => GatewayError::Unauthenticated(body.message),
            404 => GatewayError::NotFound(body.message),
            400..=499 => GatewayError::Validation {
                message: body.message,
                fields: body.fields.unwrap_or_default(),
            },
            _ => GatewayError::Internal(body.message),
        }
    }
}

/// Error from the session key-value store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend read/write failure.
    #[error("store error: {0}")]
    Backend(String),

    /// Stored value could not be (de)serialized.
    #[error("store serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<StoreError> for GatewayError {
    fn from(e: StoreError) -> Self {
        GatewayError::Internal(e.to_string())
    }
}

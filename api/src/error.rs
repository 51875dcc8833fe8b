use axum::http::StatusCode;
use axum::{
    extract::Json,
    response::{IntoResponse, Response},
};
use std::path::PathBuf;
use thiserror::Error;

use crate::schema::ErrorResponse;

/// One rejected input field and why.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field} {reason}")]
pub struct FieldViolation {
    pub field: &'static str,
    pub reason: String,
}

impl FieldViolation {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("{}", join_violations(.0))]
    InvalidFields(Vec<FieldViolation>),

    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error("Invalid JSON body: {0}")]
    MalformedBody(String),

    #[error("Prediction failed: {0}")]
    Model(#[from] ModelError),
}

impl GatewayError {
    /// Names of the offending fields, empty when the error is not field-specific.
    pub fn fields(&self) -> Vec<String> {
        match self {
            GatewayError::MissingFields(names) => names.iter().map(|n| n.to_string()).collect(),
            GatewayError::InvalidFields(violations) => {
                violations.iter().map(|v| v.field.to_string()).collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Model(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
            fields: self.fields(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model artifact {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse model artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid model artifact: {0}")]
    Invalid(String),

    #[error("model expects {expected} features, got {got}")]
    FeatureCount { expected: usize, got: usize },

    #[error("model produced a non-finite prediction")]
    NonFinite,
}

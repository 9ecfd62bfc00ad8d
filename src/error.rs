use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Stable, machine-readable error category exposed across the engine boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ParseError,
    TypeMismatch,
    InvalidArgument,
    EmptyInput,
    NotFound,
    PayloadTooLarge,
    UnsupportedFormat,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ParseError => "parse_error",
            ErrorKind::TypeMismatch => "type_mismatch",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::EmptyInput => "empty_input",
            ErrorKind::NotFound => "not_found",
            ErrorKind::PayloadTooLarge => "payload_too_large",
            ErrorKind::UnsupportedFormat => "unsupported_format",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the analysis engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Malformed input that cannot become a table.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Operation requested on a column of the wrong type.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Unsupported option or unknown column reference.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Zero rows or zero columns.
    #[error("Empty input: {0}")]
    EmptyInput(String),
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::Parse(_) => ErrorKind::ParseError,
            AnalysisError::TypeMismatch(_) => ErrorKind::TypeMismatch,
            AnalysisError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            AnalysisError::EmptyInput(_) => ErrorKind::EmptyInput,
        }
    }
}

impl From<csv::Error> for AnalysisError {
    fn from(err: csv::Error) -> Self {
        AnalysisError::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors surfaced by the HTTP layer.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("Analysis run {0} not found")]
    NotFound(String),

    #[error("File of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Unsupported file type: {0}. Please upload a CSV or Excel file")]
    UnsupportedFormat(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Analysis(err) => err.kind(),
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            AppError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Analysis(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Request rejected ({}): {}", self.kind(), self);
        }

        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));

        (status, body).into_response()
    }
}

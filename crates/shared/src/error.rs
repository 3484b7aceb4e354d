//! Application-wide error types.
//!
//! Every failure a binary reports is turned into an [`ErrorBody`]: a JSON
//! object carrying a status class, a stable error code and a message. The
//! process exit code is derived from the status.

use serde::Serialize;
use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// The acting user may not perform the request.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// A named workflow, period, user or org unit does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed input, e.g. an unreadable metadata snapshot.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Conflict (e.g., duplicate entry).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP-style status class of this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::Conflict(_) => 409,
            Self::Database(_) | Self::Configuration(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the stable error code reported in error bodies.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

/// Serializable failure report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Status class, as returned by `status_code`.
    pub status: u16,
    /// Stable error code.
    pub error: &'static str,
    /// Human-readable message.
    pub message: String,
}

impl ErrorBody {
    /// Builds a body from its parts.
    #[must_use]
    pub fn new(status: u16, error: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            error,
            message: message.into(),
        }
    }

    /// Process exit code for this failure.
    ///
    /// Input errors exit with 2, refused actions with 3, missing entities
    /// with 4, conflicts with 5 and everything else with 1.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self.status {
            400 | 422 => 2,
            403 => 3,
            404 => 4,
            409 => 5,
            _ => 1,
        }
    }
}

impl From<AppError> for ErrorBody {
    fn from(err: AppError) -> Self {
        Self::new(err.status_code(), err.error_code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(AppError::Forbidden(String::new()).status_code(), 403);
        assert_eq!(AppError::NotFound(String::new()).status_code(), 404);
        assert_eq!(AppError::Validation(String::new()).status_code(), 400);
        assert_eq!(AppError::Conflict(String::new()).status_code(), 409);
        assert_eq!(AppError::Database(String::new()).status_code(), 500);
        assert_eq!(AppError::Configuration(String::new()).status_code(), 500);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            AppError::NotFound("workflow 'Monthly'".into()).to_string(),
            "Not found: workflow 'Monthly'"
        );
        assert_eq!(
            AppError::Configuration("msg".into()).to_string(),
            "Configuration error: msg"
        );
    }

    #[test]
    fn test_config_error_converts() {
        let err: AppError = config::ConfigError::Message("missing key".into()).into();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
        assert!(err.to_string().contains("missing key"));
    }

    #[test]
    fn test_body_carries_code_and_exit_code() {
        let body = ErrorBody::from(AppError::NotFound("user 'nobody'".into()));
        assert_eq!(body.status, 404);
        assert_eq!(body.error, "NOT_FOUND");
        assert_eq!(body.exit_code(), 4);

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"], "NOT_FOUND");
        assert_eq!(json["message"], "Not found: user 'nobody'");
    }

    #[test]
    fn test_exit_codes_by_status() {
        let exit = |err: AppError| ErrorBody::from(err).exit_code();
        assert_eq!(exit(AppError::Validation(String::new())), 2);
        assert_eq!(exit(AppError::Forbidden(String::new())), 3);
        assert_eq!(exit(AppError::Conflict(String::new())), 5);
        assert_eq!(exit(AppError::Database(String::new())), 1);
        assert_eq!(ErrorBody::new(422, "INVALID", "").exit_code(), 2);
    }
}

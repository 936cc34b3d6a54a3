use std::collections::BTreeMap;

use thiserror::Error;

use crate::auth::{RefreshError, StorageError};
use crate::models::ErrorBody;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {message}")]
    BadRequest {
        message: String,
        fields: BTreeMap<String, String>,
    },

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - token rejected")]
    Unauthorized,

    #[error("Session expired: {0}")]
    Authentication(#[from] RefreshError),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Failed to encode request body: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// The `message` of a structured error body, or the truncated raw body.
    fn describe(body: &str) -> (String, BTreeMap<String, String>) {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(ErrorBody {
                message: Some(message),
                fields,
                ..
            }) => (message, fields),
            _ => (Self::truncate_body(body), BTreeMap::new()),
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let (message, fields) = Self::describe(body);
        match status.as_u16() {
            400 | 409 | 422 => ApiError::BadRequest { message, fields },
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(message),
            404 => ApiError::NotFound(message),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(message),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, message)),
        }
    }

    /// Message supplied by the server, suitable for showing to the user.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::BadRequest { message, .. } if !message.is_empty() => Some(message.as_str()),
            ApiError::AccessDenied(message)
            | ApiError::NotFound(message)
            | ApiError::ServerError(message)
                if !message.is_empty() =>
            {
                Some(message.as_str())
            }
            _ => None,
        }
    }

    /// Per-field validation messages reported by the server.
    pub fn field_errors(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            ApiError::BadRequest { fields, .. } if !fields.is_empty() => Some(fields),
            _ => None,
        }
    }

    /// True when the user has to sign in again.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, ApiError::Unauthorized | ApiError::Authentication(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_parses_server_message() {
        let body = r#"{"message":"Invalid credentials","code":"BAD_REQUEST"}"#;
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.server_message(), Some("Invalid credentials"));
        assert!(err.field_errors().is_none());
    }

    #[test]
    fn test_from_status_keeps_field_errors() {
        let body = r#"{"message":"Validation failed","code":"VALIDATION_ERROR","fields":{"username":"size must be between 3 and 32"}}"#;
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, body);
        let fields = err.field_errors().unwrap();
        assert_eq!(fields["username"], "size must be between 3 and 32");
    }

    #[test]
    fn test_from_status_maps_codes() {
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, ""),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::FORBIDDEN, "nope"),
            ApiError::AccessDenied(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, ""),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            ApiError::RateLimited
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "{\"message\":\"Internal server error\"}"),
            ApiError::ServerError(ref m) if m == "Internal server error"
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::IM_A_TEAPOT, ""),
            ApiError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_server_message_for_server_and_not_found_errors() {
        let err = ApiError::from_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"message":"Internal server error","code":"INTERNAL_ERROR"}"#,
        );
        assert_eq!(err.server_message(), Some("Internal server error"));

        let err = ApiError::from_status(StatusCode::NOT_FOUND, r#"{"message":"User not found"}"#);
        assert_eq!(err.server_message(), Some("User not found"));

        assert_eq!(ApiError::from_status(StatusCode::BAD_GATEWAY, "").server_message(), None);
        assert_eq!(ApiError::RateLimited.server_message(), None);
    }

    #[test]
    fn test_truncate_body() {
        let short = "short body";
        assert_eq!(ApiError::truncate_body(short), short);

        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 10);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.contains("510 total bytes"));
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let long = "é".repeat(MAX_ERROR_BODY_LENGTH);
        // Must not panic on a multi-byte boundary
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.contains("truncated"));
    }

    #[test]
    fn test_auth_expired() {
        assert!(ApiError::Unauthorized.is_auth_expired());
        assert!(ApiError::Authentication(RefreshError::MissingRefreshToken).is_auth_expired());
        assert!(!ApiError::RateLimited.is_auth_expired());
    }
}

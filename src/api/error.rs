use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// No usable session at dispatch time. Distinct from `Unauthorized`
    /// so the caller can prompt for sign-in instead of showing a
    /// generic failure.
    #[error("Authentication required - please sign in")]
    AuthRequired,

    #[error("Unauthorized - session may be expired")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Collaborator-rejected request (duplicate registration, already
    /// confirmed, bad payload). The message is passed through verbatim.
    #[error("{0}")]
    Validation(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Fallback when a failure body carries no usable message
const GENERIC_ERROR_MESSAGE: &str = "Something went wrong";

impl ApiError {
    /// Truncate a response body to avoid carrying excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let head: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
            format!("{}... (truncated, {} total bytes)", head, body.len())
        }
    }

    /// Extract a human-readable message from a failure body.
    ///
    /// Tries the JSON `message` then `error` fields, falls back to the
    /// raw body text, and finally to a generic message.
    pub fn extract_message(body: &str) -> String {
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
            for field in ["message", "error"] {
                if let Some(msg) = json.get(field).and_then(|v| v.as_str()) {
                    if !msg.is_empty() {
                        return msg.to_string();
                    }
                }
            }
        }

        let trimmed = body.trim();
        if trimmed.is_empty() {
            GENERIC_ERROR_MESSAGE.to_string()
        } else {
            Self::truncate_body(trimmed)
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = Self::extract_message(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(message),
            404 => ApiError::NotFound(message),
            400 | 409 | 422 => ApiError::Validation(message),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(message),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, message)),
        }
    }

    /// Whether the presentation layer should prompt for re-authentication.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, ApiError::AuthRequired | ApiError::Unauthorized)
    }

    /// Whether re-triggering the same action may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Network(_) | ApiError::RateLimited | ApiError::ServerError(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_extract_message_prefers_json_message_field() {
        assert_eq!(
            ApiError::extract_message(r#"{"message": "You already registered for this camp"}"#),
            "You already registered for this camp"
        );
    }

    #[test]
    fn test_extract_message_falls_back_to_error_field() {
        assert_eq!(
            ApiError::extract_message(r#"{"error": "fileName and fileType are required"}"#),
            "fileName and fileType are required"
        );
    }

    #[test]
    fn test_extract_message_falls_back_to_raw_body() {
        assert_eq!(ApiError::extract_message("Bad Gateway"), "Bad Gateway");
        // JSON without a usable field still falls back to the raw text
        assert_eq!(
            ApiError::extract_message(r#"{"status": 500}"#),
            r#"{"status": 500}"#
        );
    }

    #[test]
    fn test_extract_message_generic_on_empty_body() {
        assert_eq!(ApiError::extract_message(""), GENERIC_ERROR_MESSAGE);
        assert_eq!(ApiError::extract_message("   "), GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn test_truncate_long_body() {
        let body = "x".repeat(2000);
        let message = ApiError::extract_message(&body);
        assert!(message.contains("truncated"));
        assert!(message.len() < 600);
    }

    #[test]
    fn test_from_status_mapping() {
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
            ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, ""),
            ApiError::ServerError(_)
        ));
    }

    #[test]
    fn test_conflict_passes_message_through_verbatim() {
        let error = ApiError::from_status(
            StatusCode::CONFLICT,
            r#"{"message": "Registration already confirmed"}"#,
        );
        match error {
            ApiError::Validation(message) => {
                assert_eq!(message, "Registration already confirmed")
            }
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn test_auth_error_classification() {
        assert!(ApiError::AuthRequired.is_auth_error());
        assert!(ApiError::Unauthorized.is_auth_error());
        assert!(!ApiError::RateLimited.is_auth_error());
        assert!(ApiError::RateLimited.is_retryable());
        assert!(!ApiError::AuthRequired.is_retryable());
    }
}

//! Client error types.

use kith_core::{FieldError, ValidationErrors};
use serde::{Deserialize, Serialize};

/// JSON error body returned by the server for every non-2xx response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
    /// Machine-readable code, e.g. `VALIDATION_FAILED` or `NOT_FOUND`.
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Field errors carried under `details.fields`, empty for other errors.
    pub fn field_errors(&self) -> Vec<FieldError> {
        self.details
            .as_ref()
            .and_then(|d| d.get("fields"))
            .and_then(|f| serde_json::from_value::<Vec<FieldError>>(f.clone()).ok())
            .unwrap_or_default()
    }

    pub fn validation_errors(&self) -> Option<ValidationErrors> {
        let fields = self.field_errors();
        (!fields.is_empty()).then_some(ValidationErrors { fields })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status} {}: {}", .body.code, .body.error)]
    Api { status: u16, body: ErrorBody },

    /// Non-2xx response whose body is not an [`ErrorBody`].
    #[error("Unexpected response {status}: {body}")]
    UnexpectedResponse { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl ClientError {
    /// Decode a failed response body.
    pub fn from_response(status: u16, text: String) -> Self {
        match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => ClientError::Api { status, body },
            Err(_) => ClientError::UnexpectedResponse { status, body: text },
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } | ClientError::UnexpectedResponse { status, .. } => Some(*status),
            ClientError::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Server error code, when the server sent one.
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Api { body, .. } => Some(body.code.as_str()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_validation_body() {
        let text = r#"{"error":"Validation failed","code":"VALIDATION_FAILED",
            "details":{"fields":[{"field":"page","message":"must be at least 1"},
                                 {"field":"sortDir","message":"must be 'asc' or 'desc'"}]}}"#;
        let err = ClientError::from_response(400, text.to_string());
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.code(), Some("VALIDATION_FAILED"));

        let ClientError::Api { body, .. } = err else {
            panic!("expected Api error");
        };
        let errors = body.validation_errors().unwrap();
        assert!(errors.has("page"));
        assert!(errors.has("sortDir"));
    }

    #[test]
    fn test_plain_text_body_is_unexpected() {
        let err = ClientError::from_response(502, "Bad Gateway".to_string());
        assert!(matches!(err, ClientError::UnexpectedResponse { status: 502, .. }));
        assert_eq!(err.code(), None);
    }

    #[test]
    fn test_body_without_details_has_no_field_errors() {
        let err = ClientError::from_response(404, r#"{"error":"friend not found","code":"NOT_FOUND"}"#.into());
        assert!(err.is_not_found());
        let ClientError::Api { body, .. } = err else {
            panic!("expected Api error");
        };
        assert!(body.field_errors().is_empty());
        assert!(body.validation_errors().is_none());
    }
}

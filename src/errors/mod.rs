//! Error handling module for the paper library client.
//!
//! Provides a centralized error type, its classification into the user-facing
//! failure taxonomy, and conversions from the underlying transport errors.

use serde::Deserialize;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const REMOTE_ERROR: &str = "REMOTE_ERROR";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const DECODE_ERROR: &str = "DECODE_ERROR";
    pub const EMPTY_RESULT: &str = "EMPTY_RESULT";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const IN_FLIGHT: &str = "IN_FLIGHT";
    pub const PARTIAL_FAILURE: &str = "PARTIAL_FAILURE";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
}

/// How a failure should be presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The backend could not be reached or did not answer in time.
    NetworkFailure,
    /// The request succeeded but matched nothing.
    EmptyResult,
    /// Input was rejected before any request was made.
    ValidationFailure,
    /// The backend answered with an error.
    RemoteFailure,
    /// Local file access failed.
    LocalFailure,
}

/// Client error type.
#[derive(Debug)]
pub enum ClientError {
    /// Request rejected or backend unreachable
    Network(String),
    /// Request exceeded the configured timeout
    Timeout(String),
    /// Backend answered with a non-success status
    Remote { status: u16, message: String },
    /// Backend reported the resource as missing
    NotFound(String),
    /// Response body did not match the expected shape
    Decode(String),
    /// Search returned zero matches
    EmptyResult(String),
    /// Input rejected before any network call
    Validation(String),
    /// An identical mutation is already outstanding
    InFlight(String),
    /// Some operations of a batch failed
    PartialFailure { message: String, failed: Vec<String> },
    /// Local file I/O failed
    Storage(String),
}

impl ClientError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            ClientError::Network(_) => codes::NETWORK_ERROR,
            ClientError::Timeout(_) => codes::TIMEOUT,
            ClientError::Remote { .. } => codes::REMOTE_ERROR,
            ClientError::NotFound(_) => codes::NOT_FOUND,
            ClientError::Decode(_) => codes::DECODE_ERROR,
            ClientError::EmptyResult(_) => codes::EMPTY_RESULT,
            ClientError::Validation(_) => codes::VALIDATION_ERROR,
            ClientError::InFlight(_) => codes::IN_FLIGHT,
            ClientError::PartialFailure { .. } => codes::PARTIAL_FAILURE,
            ClientError::Storage(_) => codes::STORAGE_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            ClientError::Network(msg) => msg.clone(),
            ClientError::Timeout(msg) => msg.clone(),
            ClientError::Remote { status, message } => format!("{} ({})", message, status),
            ClientError::NotFound(msg) => msg.clone(),
            ClientError::Decode(msg) => msg.clone(),
            ClientError::EmptyResult(msg) => msg.clone(),
            ClientError::Validation(msg) => msg.clone(),
            ClientError::InFlight(msg) => msg.clone(),
            ClientError::PartialFailure { message, .. } => message.clone(),
            ClientError::Storage(msg) => msg.clone(),
        }
    }

    /// Classify the error for presentation.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Network(_) | ClientError::Timeout(_) => ErrorKind::NetworkFailure,
            ClientError::EmptyResult(_) => ErrorKind::EmptyResult,
            ClientError::Validation(_) | ClientError::InFlight(_) => ErrorKind::ValidationFailure,
            ClientError::Remote { .. }
            | ClientError::NotFound(_)
            | ClientError::Decode(_)
            | ClientError::PartialFailure { .. } => ErrorKind::RemoteFailure,
            ClientError::Storage(_) => ErrorKind::LocalFailure,
        }
    }

    /// Text a view layer can show as-is.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::NetworkFailure => {
                "Unable to connect to the server. Please try again.".to_string()
            }
            ErrorKind::EmptyResult => {
                "No papers found. Try different keywords or broaden your filters.".to_string()
            }
            _ => self.message(),
        }
    }

    /// Build an error from a non-success response status and its body.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<RemoteErrorBody>(body)
            .ok()
            .and_then(|b| b.detail)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unexpected response")
                    .to_string()
            });

        if status == reqwest::StatusCode::NOT_FOUND {
            ClientError::NotFound(message)
        } else {
            ClientError::Remote {
                status: status.as_u16(),
                message,
            }
        }
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        tracing::error!("HTTP error: {:?}", err);
        if err.is_timeout() {
            ClientError::Timeout(format!("Request timed out: {}", err))
        } else if err.is_decode() {
            ClientError::Decode(format!("Invalid response body: {}", err))
        } else if let Some(status) = err.status() {
            ClientError::Remote {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            ClientError::Network(format!("Request failed: {}", err))
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        ClientError::Decode(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        tracing::error!("I/O error: {:?}", err);
        ClientError::Storage(format!("I/O error: {}", err))
    }
}

/// Error body emitted by the backend on non-success responses.
#[derive(Debug, Deserialize)]
struct RemoteErrorBody {
    #[serde(default)]
    detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_failures_share_user_message() {
        let network = ClientError::Network("connection refused".to_string());
        let timeout = ClientError::Timeout("30s elapsed".to_string());

        assert_eq!(network.kind(), ErrorKind::NetworkFailure);
        assert_eq!(timeout.kind(), ErrorKind::NetworkFailure);
        assert_eq!(network.user_message(), timeout.user_message());
    }

    #[test]
    fn test_empty_result_is_not_network_failure() {
        let err = ClientError::EmptyResult("quantum".to_string());
        assert_eq!(err.kind(), ErrorKind::EmptyResult);
        assert!(err.user_message().starts_with("No papers found"));
    }

    #[test]
    fn test_from_status_reads_detail() {
        let err = ClientError::from_status(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"detail":"File must be a PDF"}"#,
        );
        match err {
            ClientError::Remote { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "File must be a PDF");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_status_not_found() {
        let err = ClientError::from_status(reqwest::StatusCode::NOT_FOUND, "not json");
        assert!(matches!(err, ClientError::NotFound(ref m) if m == "Not Found"));
        assert_eq!(err.error_code(), codes::NOT_FOUND);
    }

    #[test]
    fn test_display_includes_code() {
        let err = ClientError::Validation("Tag name is required".to_string());
        assert_eq!(err.to_string(), "VALIDATION_ERROR: Tag name is required");
    }
}

//! Backend response types.
//!
//! All REST responses from the chat backend share a common envelope with
//! status, message, and optional data/error fields.

use serde::{Deserialize, Serialize};

/// Standard backend response envelope.
///
/// ```json
/// { "status": 200, "message": "Success", "data": { ... } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerResponse<T = serde_json::Value> {
    /// HTTP-like status code from the backend.
    pub status: u16,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Response payload data (type varies by endpoint).
    pub data: Option<T>,
    /// Error details (present only on error responses).
    pub error: Option<ServerError>,
}

/// Backend error detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerError {
    /// Error type identifier.
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    /// Error message.
    pub message: Option<String>,
}

impl<T> ServerResponse<T> {
    /// Whether the response indicates success (status 2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the response indicates an error.
    pub fn is_error(&self) -> bool {
        !self.is_success()
    }

    /// Get the error message if this is an error response.
    pub fn error_message(&self) -> Option<String> {
        if self.is_error() {
            self.error
                .as_ref()
                .and_then(|e| e.message.clone())
                .or_else(|| Some(self.message.clone()))
        } else {
            None
        }
    }

    /// Take the data payload or fail with the backend's message.
    pub fn into_data(self) -> Result<T, String> {
        if self.is_error() {
            return Err(self
                .error_message()
                .unwrap_or_else(|| format!("status {}", self.status)));
        }
        self.data.ok_or_else(|| "response has no data".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_response_success() {
        let json = r#"{"status":200,"message":"Success","data":{"conversationKey":"c1"}}"#;
        let resp: ServerResponse = serde_json::from_str(json).unwrap();
        assert!(resp.is_success());
        assert!(resp.error_message().is_none());
        assert_eq!(resp.into_data().unwrap()["conversationKey"], "c1");
    }

    #[test]
    fn test_server_response_error() {
        let json = r#"{"status":400,"message":"Bad Request","error":{"type":"validation","message":"accountId mismatch"}}"#;
        let resp: ServerResponse = serde_json::from_str(json).unwrap();
        assert!(resp.is_error());
        assert_eq!(resp.error_message().unwrap(), "accountId mismatch");
        assert_eq!(resp.into_data().unwrap_err(), "accountId mismatch");
    }

    #[test]
    fn test_missing_data() {
        let resp: ServerResponse = serde_json::from_str(r#"{"status":200}"#).unwrap();
        assert_eq!(resp.into_data().unwrap_err(), "response has no data");
    }
}

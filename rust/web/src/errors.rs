//! Error responses shared by every HTTP endpoint.
//!
//! Domain errors (`RoomError`, `BridgeError`, `SettingsError`) implement
//! [`IntoErrorResponse`] next to their definitions. This module only knows how
//! to render them as a JSON body and log them at the right level.
use serde::{Deserialize, Serialize};
use std::fmt;
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::Reply;

/// Standard error response format for all API endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "room_not_found")
    pub error: String,
    /// Human-readable error message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn into_response(self, status: StatusCode) -> Response {
        reply::with_status(reply::json(&self), status).into_response()
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Error classification for logging levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// 4xx, part of normal operation
    Client,
    /// 5xx
    Server,
    /// Shared state can no longer be trusted (poisoned locks)
    Critical,
}

/// Maps a domain error to an HTTP status, a stable code and a log level.
pub trait IntoErrorResponse {
    fn status_code(&self) -> StatusCode;

    fn error_code(&self) -> &'static str;

    fn error_message(&self) -> String;

    fn error_details(&self) -> Option<serde_json::Value> {
        None
    }

    fn severity(&self) -> ErrorSeverity {
        if self.status_code().is_server_error() {
            ErrorSeverity::Server
        } else {
            ErrorSeverity::Client
        }
    }

    fn to_error_response(&self) -> ErrorResponse {
        match self.error_details() {
            Some(details) => {
                ErrorResponse::with_details(self.error_code(), self.error_message(), details)
            }
            None => ErrorResponse::new(self.error_code(), self.error_message()),
        }
    }

    fn into_http_response(self) -> Response
    where
        Self: Sized,
    {
        let status = self.status_code();
        let body = self.to_error_response();
        log_error(self.severity(), status, &body);
        body.into_response(status)
    }
}

fn log_error(severity: ErrorSeverity, status: StatusCode, body: &ErrorResponse) {
    let status = status.as_u16();
    match severity {
        ErrorSeverity::Client => {
            tracing::info!(status, code = %body.error, message = %body.message, "client error")
        }
        ErrorSeverity::Server => {
            tracing::error!(status, code = %body.error, message = %body.message, "server error")
        }
        ErrorSeverity::Critical => {
            tracing::error!(
                status,
                code = %body.error,
                message = %body.message,
                critical = true,
                "critical error"
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Teapot;

    impl IntoErrorResponse for Teapot {
        fn status_code(&self) -> StatusCode {
            StatusCode::IM_A_TEAPOT
        }

        fn error_code(&self) -> &'static str {
            "teapot"
        }

        fn error_message(&self) -> String {
            "short and stout".into()
        }
    }

    #[test]
    fn error_response_serialization() {
        let error = ErrorResponse::new("room_not_found", "Room ABCDE not found");
        let json = serde_json::to_value(&error).expect("serialize");

        assert_eq!(json["error"], "room_not_found");
        assert_eq!(json["message"], "Room ABCDE not found");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn error_response_with_details() {
        let error = ErrorResponse::with_details(
            "duplicate_name",
            "Name taken",
            json!({ "name": "ALICE" }),
        );
        let json = serde_json::to_value(&error).expect("serialize");
        assert_eq!(json["details"]["name"], "ALICE");
    }

    #[test]
    fn error_response_display() {
        let error = ErrorResponse::new("not_found", "Resource not found");
        assert_eq!(error.to_string(), "not_found: Resource not found");
    }

    #[test]
    fn default_severity_follows_status() {
        assert_eq!(Teapot.severity(), ErrorSeverity::Client);
        let response = Teapot.into_http_response();
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    }
}

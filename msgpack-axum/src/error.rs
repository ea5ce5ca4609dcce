//! HTTP error type and response rendering.
//!
//! [`HttpError`] renders the structured error body clients of this crate
//! rely on:
//!
//! ```json
//! { "statusCode": 400, "error": "Bad Request", "message": "Bad messagepack data" }
//! ```
//!
//! The structured body is also attached as [`SourceBody`], so error responses
//! are re-encoded like any other response when the client asked for the
//! binary format.

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

use crate::context::SourceBody;
use crate::pipeline::LOG_TARGET;

/// Message of the 400 returned for a body that fails to decode.
pub const BAD_PAYLOAD_MESSAGE: &str = "Bad messagepack data";

/// Message of the 500 returned when a response cannot be encoded.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal server error occurred";

/// Content type of JSON bodies rendered by this crate.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// An error with an HTTP status and a client-facing message.
#[derive(Clone, Debug)]
pub struct HttpError {
    status: StatusCode,
    message: String,
    meta: Option<HeaderMap>,
}

impl HttpError {
    /// Create a new error with a status and message.
    pub fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self {
            status,
            message: message.into(),
            meta: None,
        }
    }

    /// 400 Bad Request.
    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 400 for a body the codec could not decode.
    pub fn bad_payload() -> Self {
        Self::bad_request(BAD_PAYLOAD_MESSAGE)
    }

    /// 413 for a body larger than the configured limit.
    pub fn payload_too_large(limit: usize) -> Self {
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("Payload content length greater than maximum allowed: {limit}"),
        )
    }

    /// 415 Unsupported Media Type.
    pub fn unsupported_media_type() -> Self {
        Self::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, "Unsupported Media Type")
    }

    /// 500 with a generic message.
    ///
    /// The details are not exposed to clients; callers log them.
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
    }

    /// Get the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the extra response headers, if any.
    pub fn meta(&self) -> Option<&HeaderMap> {
        self.meta.as_ref()
    }

    /// Add a response header.
    pub fn with_meta<K, V>(mut self, key: K, value: V) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let key_str = key.as_ref();
        let val_str = value.as_ref();

        match (
            HeaderName::from_bytes(key_str.as_bytes()),
            HeaderValue::from_str(val_str),
        ) {
            (Ok(name), Ok(val)) => {
                self.meta.get_or_insert_with(HeaderMap::new).append(name, val);
            }
            _ => {
                tracing::debug!(
                    target: LOG_TARGET,
                    key = key_str,
                    value = val_str,
                    "invalid header, metadata dropped"
                );
            }
        }
        self
    }

    /// The structured body of this error.
    pub fn to_value(&self) -> Value {
        let body = ErrorResponseBody {
            status_code: self.status.as_u16(),
            error: self.status.canonical_reason().unwrap_or("Unknown"),
            message: &self.message,
        };
        // A struct of a number and two strings always serializes.
        serde_json::to_value(body).unwrap_or(Value::Null)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let value = self.to_value();
        let body = serde_json::to_vec(&value).unwrap_or_default();

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = self.status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(JSON_CONTENT_TYPE),
        );
        if let Some(meta) = self.meta {
            response.headers_mut().extend(meta);
        }
        response.extensions_mut().insert(SourceBody(value));
        response
    }
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for HttpError {}

/// The JSON body structure for error responses.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponseBody<'a> {
    status_code: u16,
    error: &'a str,
    message: &'a str,
}

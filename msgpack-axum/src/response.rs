//! Structured handler responses.

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::context::SourceBody;
use crate::error::{HttpError, JSON_CONTENT_TYPE};
use crate::pipeline::{ENCODE_ERROR_TAGS, LOG_TARGET};

/// A JSON response that keeps its structured body for transcoding.
///
/// Renders as `application/json; charset=utf-8` and attaches the serialized
/// value as [`SourceBody`], so the response stage can re-encode it without
/// parsing the JSON back.
///
/// ```rust
/// use axum::http::StatusCode;
/// use msgpack_axum::Reply;
/// use serde_json::json;
///
/// let reply = Reply::new(json!({ "id": 1 }))
///     .with_status(StatusCode::CREATED)
///     .with_header("x-custom-header", "absolutely i do");
/// ```
#[derive(Debug, Clone)]
pub struct Reply<T> {
    body: T,
    status: StatusCode,
    headers: HeaderMap,
}

impl<T> Reply<T> {
    /// A 200 response with the given body.
    pub fn new(body: T) -> Self {
        Self {
            body,
            status: StatusCode::OK,
            headers: HeaderMap::new(),
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Add a response header. Invalid names or values are dropped.
    pub fn with_header<K, V>(mut self, key: K, value: V) -> Self
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
                self.headers.append(name, val);
            }
            _ => {
                tracing::debug!(
                    target: LOG_TARGET,
                    key = key_str,
                    value = val_str,
                    "invalid header, dropped from reply"
                );
            }
        }
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn into_inner(self) -> T {
        self.body
    }
}

impl<T> From<T> for Reply<T> {
    fn from(body: T) -> Self {
        Self::new(body)
    }
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        let rendered = serde_json::to_value(&self.body)
            .and_then(|value| serde_json::to_vec(&value).map(|bytes| (value, bytes)));
        let (value, bytes) = match rendered {
            Ok(rendered) => rendered,
            Err(err) => {
                tracing::error!(
                    target: LOG_TARGET,
                    tags = ?ENCODE_ERROR_TAGS,
                    error = %err,
                    "Failed to serialize response payload"
                );
                return HttpError::internal().into_response();
            }
        };

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = self.status;
        let headers = response.headers_mut();
        headers.extend(self.headers);
        if !headers.contains_key(header::CONTENT_TYPE) {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static(JSON_CONTENT_TYPE),
            );
        }
        response.extensions_mut().insert(SourceBody(value));
        response
    }
}

//! Per-request and per-response transcoding state.
//!
//! [`RequestContext`] is created by [`TranscodeLayer`] when a request enters
//! the pipeline and lives in the request extensions until the response is
//! sent. It carries the decode flag from the pre-routing stage to the
//! post-authentication stage, where it is consumed exactly once.
//!
//! [`LogicalPayload`] and [`SourceBody`] are the structured values handed to
//! and produced by the handler.
//!
//! [`TranscodeLayer`]: crate::layer::TranscodeLayer

use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use serde_json::Value;
use std::sync::Arc;

use crate::config::TranscodeConfig;
use crate::pipeline::combined_header;

/// Per-request transcoding state, stored in request extensions.
#[derive(Debug, Clone)]
pub struct RequestContext {
    config: Arc<TranscodeConfig>,
    /// Original `Content-Type`, before any disguising.
    raw_content_type: Option<HeaderValue>,
    /// Original `Accept`, every line of it, captured from the incoming request.
    accept: Option<HeaderValue>,
    /// Set by the interceptor, cleared by the decoder.
    decode_flag: bool,
}

impl RequestContext {
    /// Capture the original negotiation headers of an incoming request.
    pub(crate) fn new(config: Arc<TranscodeConfig>, headers: &HeaderMap) -> Self {
        Self {
            config,
            raw_content_type: headers.get(header::CONTENT_TYPE).cloned(),
            accept: combined_header(headers, header::ACCEPT),
            decode_flag: false,
        }
    }

    /// The configuration this request is handled with.
    pub fn config(&self) -> &TranscodeConfig {
        &self.config
    }

    pub(crate) fn shared_config(&self) -> Arc<TranscodeConfig> {
        Arc::clone(&self.config)
    }

    /// The `Content-Type` the client sent.
    pub fn raw_content_type(&self) -> Option<&HeaderValue> {
        self.raw_content_type.as_ref()
    }

    /// The `Accept` header the client sent.
    pub fn accept(&self) -> Option<&HeaderValue> {
        self.accept.as_ref()
    }

    /// Whether the body still has to be decoded.
    pub fn decode_pending(&self) -> bool {
        self.decode_flag
    }

    pub(crate) fn flag_for_decode(&mut self) {
        self.decode_flag = true;
    }

    /// Clear the flag, returning whether it was set.
    pub(crate) fn take_decode_flag(&mut self) -> bool {
        std::mem::take(&mut self.decode_flag)
    }
}

/// Decoded request payload, stored in request extensions for the handler.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalPayload(pub Value);

/// Structured response body, stored in response extensions.
///
/// Lets the response stage re-encode the value without parsing the rendered
/// JSON back.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceBody(pub Value);

/// Response state seen by the response stage.
#[derive(Debug, Clone)]
pub struct ResponseContext {
    /// `Accept` header from the original request.
    pub accept: Option<HeaderValue>,
    /// Structured body produced by the handler.
    pub source_body: Value,
    /// Status code to preserve.
    pub status: StatusCode,
    /// Headers already set on the response.
    pub headers: HeaderMap,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captures_original_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/x-msgpack"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let ctx = RequestContext::new(Arc::new(TranscodeConfig::default()), &headers);
        assert_eq!(ctx.raw_content_type().unwrap(), "application/x-msgpack");
        assert_eq!(ctx.accept().unwrap(), "application/json");
        assert!(!ctx.decode_pending());
        assert_eq!(ctx.config().mime_type(), "application/x-msgpack");
    }

    #[test]
    fn test_captures_every_accept_line() {
        let mut headers = HeaderMap::new();
        headers.append(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers.append(header::ACCEPT, HeaderValue::from_static("application/x-msgpack"));

        let ctx = RequestContext::new(Arc::new(TranscodeConfig::default()), &headers);
        assert_eq!(
            ctx.accept().unwrap(),
            "application/json, application/x-msgpack"
        );
    }

    #[test]
    fn test_missing_headers() {
        let ctx = RequestContext::new(Arc::new(TranscodeConfig::default()), &HeaderMap::new());
        assert!(ctx.raw_content_type().is_none());
        assert!(ctx.accept().is_none());
    }

    #[test]
    fn test_decode_flag_is_taken_once() {
        let mut ctx = RequestContext::new(Arc::new(TranscodeConfig::default()), &HeaderMap::new());
        ctx.flag_for_decode();
        assert!(ctx.decode_pending());
        assert!(ctx.take_decode_flag());
        assert!(!ctx.decode_pending());
        assert!(!ctx.take_decode_flag());
    }
}

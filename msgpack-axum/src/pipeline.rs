//! The three transcoding stages.
//!
//! Each stage is a plain function so the ordering stays explicit:
//!
//! 1. [`RequestPipeline::intercept`] (pre-routing): flag binary requests and
//!    disguise their `Content-Type` as an opaque byte stream.
//! 2. [`RequestPipeline::decode`] (post-authentication, pre-handler): buffer
//!    and decode a flagged body into a [`LogicalPayload`], or short-circuit
//!    with a 400.
//! 3. [`ResponsePipeline::transcode`] (pre-response): re-encode the response
//!    body when the original `Accept` header asks for the binary format.
//!
//! The layers in [`crate::layer`] only wire these into tower.

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, HeaderValue, Request, header},
    response::{IntoResponse, Response},
};
use http_body_util::{BodyExt, LengthLimitError};
use serde_json::Value;
use std::sync::Arc;

use crate::config::TranscodeConfig;
use crate::context::{LogicalPayload, RequestContext, ResponseContext, SourceBody};
use crate::error::HttpError;
use crate::limits::MessageLimits;

/// `Content-Type` a flagged request is rewritten to.
pub const DISGUISED_CONTENT_TYPE: &str = "application/octet-stream";

pub(crate) const LOG_TARGET: &str = "msgpack_axum";

const DECODE_ERROR_TAGS: [&str; 3] = ["error", "msgpack", "decode"];
const DECODE_WARNING_TAGS: [&str; 3] = ["warning", "msgpack", "decode"];
pub(crate) const ENCODE_ERROR_TAGS: [&str; 3] = ["error", "msgpack", "encode"];

// ============================================================================
// RequestPipeline
// ============================================================================

/// Request-side stages.
pub struct RequestPipeline;

impl RequestPipeline {
    /// Stage 1: detect a binary request and disguise it.
    ///
    /// Creates the [`RequestContext`] if the request does not carry one yet.
    /// When `Content-Type` matches the target mime-type, flags the context for
    /// decoding and rewrites the header to [`DISGUISED_CONTENT_TYPE`], so JSON
    /// extractors and content-type checks further in see an opaque body.
    ///
    /// Running it again on the same request is a no-op: the disguised type no
    /// longer matches.
    pub fn intercept<B>(config: &Arc<TranscodeConfig>, req: &mut Request<B>) {
        if req.extensions().get::<RequestContext>().is_none() {
            let ctx = RequestContext::new(Arc::clone(config), req.headers());
            req.extensions_mut().insert(ctx);
        }

        let content_type = req.headers().get(header::CONTENT_TYPE);
        if !config
            .matcher()
            .matches_bytes(content_type.map(HeaderValue::as_bytes))
        {
            return;
        }

        if let Some(ctx) = req.extensions_mut().get_mut::<RequestContext>() {
            ctx.flag_for_decode();
        }
        req.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(DISGUISED_CONTENT_TYPE),
        );

        tracing::debug!(
            target: LOG_TARGET,
            mime_type = config.mime_type(),
            "flagged request payload for decoding"
        );
    }

    /// Stage 2: decode a flagged request body.
    ///
    /// - Unflagged requests (or requests without a context) pass through.
    /// - A non-empty body is decoded and stored as [`LogicalPayload`]; the raw
    ///   bytes stay available as the request body.
    /// - An empty body, or a payload something upstream already parsed, is
    ///   left alone with a warning.
    /// - A body that fails to decode yields a 400 [`HttpError`].
    ///
    /// The decode flag is cleared before anything else, so replaying this
    /// stage is a no-op.
    pub async fn decode(mut req: Request<Body>) -> Result<Request<Body>, HttpError> {
        let Some(ctx) = req.extensions_mut().get_mut::<RequestContext>() else {
            return Ok(req);
        };
        if !ctx.take_decode_flag() {
            return Ok(req);
        }
        let config = ctx.shared_config();

        if req.extensions().get::<LogicalPayload>().is_some() {
            tracing::warn!(
                target: LOG_TARGET,
                tags = ?DECODE_WARNING_TAGS,
                "Did not decode request payload because it was already parsed"
            );
            return Ok(req);
        }

        let (mut parts, body) = req.into_parts();
        let bytes = read_body(body, config.limits()).await?;

        if bytes.is_empty() {
            tracing::warn!(
                target: LOG_TARGET,
                tags = ?DECODE_WARNING_TAGS,
                "Did not decode request payload because it was empty"
            );
            return Ok(Request::from_parts(parts, Body::empty()));
        }

        match config.codec().decode(&bytes) {
            Ok(value) => {
                tracing::trace!(
                    target: LOG_TARGET,
                    codec = config.codec().name(),
                    len = bytes.len(),
                    "decoded request payload"
                );
                parts.extensions.insert(LogicalPayload(value));
                Ok(Request::from_parts(parts, Body::from(bytes)))
            }
            Err(err) => {
                tracing::error!(
                    target: LOG_TARGET,
                    tags = ?DECODE_ERROR_TAGS,
                    codec = config.codec().name(),
                    error = %err,
                    "Failed to decode request payload"
                );
                Err(HttpError::bad_payload())
            }
        }
    }
}

// ============================================================================
// ResponsePipeline
// ============================================================================

/// Response-side stage.
pub struct ResponsePipeline;

impl ResponsePipeline {
    /// Stage 3: re-encode the response when `accept` asks for it.
    ///
    /// `accept` must be the header captured from the incoming request, with
    /// repeated lines combined into one value. The
    /// structured body is taken from [`SourceBody`] when the handler attached
    /// one, otherwise parsed back from a JSON body. Responses without a
    /// structured body pass through untouched.
    pub async fn transcode(
        config: &TranscodeConfig,
        accept: Option<&HeaderValue>,
        response: Response,
    ) -> Response {
        if !config
            .matcher()
            .matches_bytes(accept.map(HeaderValue::as_bytes))
        {
            return response;
        }

        let (mut parts, body) = response.into_parts();
        let source_body = match parts.extensions.remove::<SourceBody>() {
            Some(SourceBody(value)) => value,
            None if is_json(&parts.headers) => {
                let bytes = match body.collect().await {
                    Ok(collected) => collected.to_bytes(),
                    Err(err) => {
                        tracing::error!(
                            target: LOG_TARGET,
                            tags = ?ENCODE_ERROR_TAGS,
                            error = %err,
                            "Failed to read response body for transcoding"
                        );
                        return HttpError::internal().into_response();
                    }
                };
                match serde_json::from_slice::<Value>(&bytes) {
                    Ok(value) => value,
                    Err(err) => {
                        tracing::debug!(
                            target: LOG_TARGET,
                            error = %err,
                            "response body is not valid JSON, not transcoding"
                        );
                        return Response::from_parts(parts, Body::from(bytes));
                    }
                }
            }
            None => {
                tracing::trace!(
                    target: LOG_TARGET,
                    "response has no structured body, not transcoding"
                );
                return Response::from_parts(parts, body);
            }
        };

        Self::encode_with_context(
            config,
            ResponseContext {
                accept: accept.cloned(),
                source_body,
                status: parts.status,
                headers: parts.headers,
            },
        )
    }

    /// Build the binary response for a captured response context.
    ///
    /// Applies the pre-encode hook, encodes, keeps the status, copies every
    /// header, sets `Content-Length` and finally forces `Content-Type` to the
    /// target mime-type.
    pub fn encode_with_context(config: &TranscodeConfig, ctx: ResponseContext) -> Response {
        let value = config.pre_encode().apply(ctx.source_body);
        let encoded = match config.codec().encode(&value) {
            Ok(encoded) => encoded,
            Err(err) => {
                tracing::error!(
                    target: LOG_TARGET,
                    tags = ?ENCODE_ERROR_TAGS,
                    codec = config.codec().name(),
                    error = %err,
                    "Failed to encode response payload"
                );
                return HttpError::internal().into_response();
            }
        };
        let len = encoded.len();

        let mut response = Response::new(Body::from(encoded));
        *response.status_mut() = ctx.status;

        let headers = response.headers_mut();
        for (name, value) in ctx.headers.iter() {
            headers.append(name.clone(), value.clone());
        }
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
        headers.insert(header::CONTENT_TYPE, config.content_type().clone());

        tracing::trace!(
            target: LOG_TARGET,
            status = %ctx.status,
            len,
            "transcoded response payload"
        );
        response
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Buffer a body, bounded by `limits`.
pub(crate) async fn read_body(body: Body, limits: MessageLimits) -> Result<Bytes, HttpError> {
    axum::body::to_bytes(body, limits.read_limit())
        .await
        .map_err(|err| {
            let err = err.into_inner();
            if err.is::<LengthLimitError>() {
                HttpError::payload_too_large(limits.read_limit())
            } else {
                tracing::debug!(target: LOG_TARGET, error = %err, "failed to read request body");
                HttpError::bad_request("Invalid request payload")
            }
        })
}

/// All lines of a header folded into one comma-separated value, the way HTTP
/// reads a repeated list header.
pub(crate) fn combined_header(
    headers: &HeaderMap,
    name: header::HeaderName,
) -> Option<HeaderValue> {
    let mut values = headers.get_all(name).iter();
    let first = values.next()?;
    let mut combined = first.as_bytes().to_vec();
    for value in values {
        combined.extend_from_slice(b", ");
        combined.extend_from_slice(value.as_bytes());
    }
    HeaderValue::from_bytes(&combined).ok()
}

/// Whether the headers declare a JSON body.
pub(crate) fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            let ct = ct.to_ascii_lowercase();
            ct.starts_with("application/json") || ct.contains("+json")
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::LogCapture;
    use axum::http::{Method, StatusCode};
    use msgpack_axum_core::{Codec, DecodeError, EncodeError, MsgPackCodec};
    use serde_json::json;
    use tracing::Level;

    fn config() -> Arc<TranscodeConfig> {
        Arc::new(TranscodeConfig::default())
    }

    fn fixture() -> Value {
        json!({ "str": "string", "num": 42, "nope": null, "arr": [1, "2", 3] })
    }

    fn msgpack(value: &Value) -> Bytes {
        MsgPackCodec.encode(value).unwrap()
    }

    fn request(content_type: Option<&str>, body: impl Into<Body>) -> Request<Body> {
        let mut builder = Request::builder().method(Method::POST).uri("/basic-input");
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        builder.body(body.into()).unwrap()
    }

    fn intercepted(content_type: Option<&str>, body: impl Into<Body>) -> Request<Body> {
        let mut req = request(content_type, body);
        RequestPipeline::intercept(&config(), &mut req);
        req
    }

    fn ctx(req: &Request<Body>) -> &RequestContext {
        req.extensions().get::<RequestContext>().unwrap()
    }

    // ---- stage 1 ----

    #[test]
    fn test_intercept_flags_and_disguises() {
        let req = intercepted(Some("application/x-msgpack"), Body::empty());

        assert_eq!(
            req.headers().get(header::CONTENT_TYPE).unwrap(),
            DISGUISED_CONTENT_TYPE
        );
        assert!(ctx(&req).decode_pending());
        assert_eq!(
            ctx(&req).raw_content_type().unwrap(),
            "application/x-msgpack"
        );
    }

    #[test]
    fn test_intercept_matches_with_parameters() {
        let req = intercepted(Some("Application/X-MsgPack; charset=binary"), Body::empty());
        assert!(ctx(&req).decode_pending());
    }

    #[test]
    fn test_intercept_ignores_other_content_types() {
        for ct in [Some("application/json"), Some("text/plain"), None] {
            let req = intercepted(ct, Body::empty());
            assert!(!ctx(&req).decode_pending());
            assert_eq!(
                req.headers()
                    .get(header::CONTENT_TYPE)
                    .map(|v| v.to_str().unwrap()),
                ct
            );
        }
    }

    #[test]
    fn test_intercept_is_idempotent() {
        let config = config();
        let mut req = request(Some("application/x-msgpack"), Body::empty());
        RequestPipeline::intercept(&config, &mut req);
        let headers_after_first = req.headers().clone();

        RequestPipeline::intercept(&config, &mut req);
        assert_eq!(req.headers(), &headers_after_first);
        // Context from the first pass survives with the original header.
        assert_eq!(
            ctx(&req).raw_content_type().unwrap(),
            "application/x-msgpack"
        );
        assert!(ctx(&req).decode_pending());
    }

    #[test]
    fn test_intercept_captures_accept() {
        let mut req = Request::builder()
            .header(header::ACCEPT, "application/x-msgpack")
            .body(Body::empty())
            .unwrap();
        RequestPipeline::intercept(&config(), &mut req);
        assert_eq!(ctx(&req).accept().unwrap(), "application/x-msgpack");
    }

    // ---- stage 2 ----

    #[tokio::test]
    async fn test_decode_noop_when_not_flagged() {
        let logs = LogCapture::default();
        let _guard = logs.install();

        let req = intercepted(Some("application/json"), r#"{"a":1}"#);
        let req = RequestPipeline::decode(req).await.unwrap();

        assert!(req.extensions().get::<LogicalPayload>().is_none());
        let body = req.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"a":1}"#);
        assert!(logs.at_least(Level::WARN).is_empty());
    }

    #[tokio::test]
    async fn test_decode_noop_without_context() {
        let req = request(Some("application/x-msgpack"), msgpack(&fixture()));
        let req = RequestPipeline::decode(req).await.unwrap();
        assert!(req.extensions().get::<LogicalPayload>().is_none());
    }

    #[tokio::test]
    async fn test_decode_well_formed_payload() {
        let encoded = msgpack(&fixture());
        let req = intercepted(Some("application/x-msgpack"), encoded.clone());
        let req = RequestPipeline::decode(req).await.unwrap();

        assert!(!ctx(&req).decode_pending());
        assert_eq!(
            req.extensions().get::<LogicalPayload>().unwrap(),
            &LogicalPayload(fixture())
        );
        // Raw body remains readable.
        let body = req.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, encoded);
    }

    #[tokio::test]
    async fn test_decode_truncated_payload() {
        let logs = LogCapture::default();
        let _guard = logs.install();

        let encoded = msgpack(&fixture());
        let req = intercepted(
            Some("application/x-msgpack"),
            encoded.slice(..encoded.len() - 2),
        );
        let err = RequestPipeline::decode(req).await.unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Bad messagepack data");

        let errors = logs.at_least(Level::ERROR);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].has_tags(&["error", "msgpack", "decode"]));
        assert!(errors[0].message.contains("Failed to decode"));
    }

    #[tokio::test]
    async fn test_decode_empty_body_warns_and_clears_flag() {
        let logs = LogCapture::default();
        let _guard = logs.install();

        let req = intercepted(Some("application/x-msgpack"), Body::empty());
        let req = RequestPipeline::decode(req).await.unwrap();

        assert!(!ctx(&req).decode_pending());
        assert!(req.extensions().get::<LogicalPayload>().is_none());

        let warnings = logs.at_least(Level::WARN);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, Level::WARN);
        assert!(warnings[0].has_tags(&["warning", "msgpack", "decode"]));
        assert!(warnings[0].message.contains("Did not decode"));
    }

    #[tokio::test]
    async fn test_decode_skips_already_parsed_payload() {
        let logs = LogCapture::default();
        let _guard = logs.install();

        let mut req = intercepted(Some("application/x-msgpack"), msgpack(&json!(1)));
        req.extensions_mut().insert(LogicalPayload(json!("parsed")));
        let req = RequestPipeline::decode(req).await.unwrap();

        assert_eq!(
            req.extensions().get::<LogicalPayload>().unwrap(),
            &LogicalPayload(json!("parsed"))
        );
        assert!(!ctx(&req).decode_pending());
        assert_eq!(logs.at_least(Level::WARN).len(), 1);
    }

    #[tokio::test]
    async fn test_decode_replay_is_noop() {
        let req = intercepted(Some("application/x-msgpack"), msgpack(&fixture()));
        let mut req = RequestPipeline::decode(req).await.unwrap();
        req.extensions_mut().remove::<LogicalPayload>();

        let req = RequestPipeline::decode(req).await.unwrap();
        assert!(req.extensions().get::<LogicalPayload>().is_none());
    }

    #[tokio::test]
    async fn test_decode_body_over_limit() {
        let config = Arc::new(
            TranscodeConfig::builder()
                .message_limits(MessageLimits::new(4))
                .build()
                .unwrap(),
        );
        let mut req = request(Some("application/x-msgpack"), msgpack(&fixture()));
        RequestPipeline::intercept(&config, &mut req);

        let err = RequestPipeline::decode(req).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    // ---- stage 3 ----

    fn json_response(value: &Value) -> Response {
        let mut response = Response::new(Body::from(serde_json::to_vec(value).unwrap()));
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }

    fn accept(value: &'static str) -> HeaderValue {
        HeaderValue::from_static(value)
    }

    #[tokio::test]
    async fn test_transcode_noop_without_matching_accept() {
        let config = TranscodeConfig::default();
        for accept_header in [None, Some(accept("application/json"))] {
            let response = json_response(&fixture());
            let response =
                ResponsePipeline::transcode(&config, accept_header.as_ref(), response).await;
            assert_eq!(
                response.headers().get(header::CONTENT_TYPE).unwrap(),
                "application/json"
            );
            let body = response.into_body().collect().await.unwrap().to_bytes();
            assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), fixture());
        }
    }

    #[tokio::test]
    async fn test_transcode_source_body() {
        let config = TranscodeConfig::default();
        let mut response = Response::new(Body::from("ignored"));
        *response.status_mut() = StatusCode::CREATED;
        response
            .headers_mut()
            .insert("x-custom-header", accept("absolutely i do"));
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, accept("text/plain"));
        response.extensions_mut().insert(SourceBody(fixture()));

        let response = ResponsePipeline::transcode(
            &config,
            Some(&accept("application/x-msgpack")),
            response,
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/x-msgpack"
        );
        assert_eq!(
            response.headers().get("x-custom-header").unwrap(),
            "absolutely i do"
        );
        let len: usize = response.headers()[header::CONTENT_LENGTH]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.len(), len);
        assert_eq!(MsgPackCodec.decode(&body).unwrap(), fixture());
    }

    #[tokio::test]
    async fn test_transcode_parses_json_body() {
        let config = TranscodeConfig::default();
        let response = ResponsePipeline::transcode(
            &config,
            Some(&accept("application/json;q=0.5, application/x-msgpack")),
            json_response(&fixture()),
        )
        .await;

        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/x-msgpack"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(MsgPackCodec.decode(&body).unwrap(), fixture());
    }

    #[tokio::test]
    async fn test_transcode_passes_through_non_json() {
        let config = TranscodeConfig::default();
        let mut response = Response::new(Body::from("plain text"));
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, accept("text/plain"));

        let response = ResponsePipeline::transcode(
            &config,
            Some(&accept("application/x-msgpack")),
            response,
        )
        .await;

        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"plain text");
    }

    #[tokio::test]
    async fn test_transcode_invalid_json_passes_through() {
        let config = TranscodeConfig::default();
        let mut response = Response::new(Body::from("{not json"));
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, accept("application/json"));

        let response = ResponsePipeline::transcode(
            &config,
            Some(&accept("application/x-msgpack")),
            response,
        )
        .await;
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"{not json");
    }

    #[tokio::test]
    async fn test_transcode_applies_pre_encode_hook() {
        let config = TranscodeConfig::builder()
            .pre_encode(|body| {
                json!({ "originalPayload": body, "something": "completely", "different": true })
            })
            .build()
            .unwrap();

        let response = ResponsePipeline::transcode(
            &config,
            Some(&accept("application/x-msgpack")),
            json_response(&fixture()),
        )
        .await;
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(
            MsgPackCodec.decode(&body).unwrap(),
            json!({ "originalPayload": fixture(), "something": "completely", "different": true })
        );
    }

    struct FailingCodec;

    impl Codec for FailingCodec {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn decode(&self, _data: &[u8]) -> Result<Value, DecodeError> {
            Err(DecodeError::Malformed("always".into()))
        }

        fn encode(&self, _value: &Value) -> Result<Bytes, EncodeError> {
            Err(EncodeError("always".into()))
        }
    }

    #[tokio::test]
    async fn test_transcode_encode_failure_is_internal_error() {
        let logs = LogCapture::default();
        let _guard = logs.install();

        let config = TranscodeConfig::builder().codec(FailingCodec).build().unwrap();
        let response = ResponsePipeline::transcode(
            &config,
            Some(&accept("application/x-msgpack")),
            json_response(&fixture()),
        )
        .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let errors = logs.at_least(Level::ERROR);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].has_tags(&["error", "msgpack", "encode"]));
    }

    #[test]
    fn test_combined_header() {
        let mut headers = HeaderMap::new();
        assert!(combined_header(&headers, header::ACCEPT).is_none());

        headers.append(header::ACCEPT, accept("application/json"));
        assert_eq!(
            combined_header(&headers, header::ACCEPT).unwrap(),
            "application/json"
        );

        headers.append(header::ACCEPT, accept("application/x-msgpack"));
        assert_eq!(
            combined_header(&headers, header::ACCEPT).unwrap(),
            "application/json, application/x-msgpack"
        );
    }

    #[test]
    fn test_is_json() {
        let mut headers = HeaderMap::new();
        assert!(!is_json(&headers));
        headers.insert(header::CONTENT_TYPE, accept("application/json; charset=utf-8"));
        assert!(is_json(&headers));
        headers.insert(header::CONTENT_TYPE, accept("application/problem+json"));
        assert!(is_json(&headers));
        headers.insert(header::CONTENT_TYPE, accept("application/x-msgpack"));
        assert!(!is_json(&headers));
    }
}

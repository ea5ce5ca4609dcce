//! Request payload extractor.
//!
//! [`Payload<T>`] hands the handler a typed payload regardless of the wire
//! format: a decoded binary payload when the decode stage produced one, JSON
//! otherwise.

use axum::{
    extract::{FromRequest, Request},
    http::HeaderMap,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::context::{LogicalPayload, RequestContext};
use crate::error::HttpError;
use crate::limits::MessageLimits;
use crate::pipeline::{LOG_TARGET, RequestPipeline, is_json, read_body};

// Flag to ensure we only log the missing layer warning once per process
static WARNED_MISSING_LAYER: AtomicBool = AtomicBool::new(false);

/// Typed request payload.
///
/// Resolution order:
///
/// 1. The [`LogicalPayload`] left by the decode stage.
/// 2. A body still flagged for decoding, which means [`DecodeLayer`] is not
///    installed on this route. It is decoded here, with a one-time warning.
/// 3. The raw body as JSON. An empty body is read as `null`; a body with
///    another content type is rejected with 415.
///
/// [`DecodeLayer`]: crate::layer::DecodeLayer
#[derive(Debug, Clone, Copy, Default)]
pub struct Payload<T>(pub T);

impl<T, S> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request(mut req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let pending = req
            .extensions()
            .get::<RequestContext>()
            .is_some_and(RequestContext::decode_pending);
        if pending {
            if !WARNED_MISSING_LAYER.swap(true, Ordering::Relaxed) {
                tracing::warn!(
                    target: LOG_TARGET,
                    "request payload was not decoded before the handler; \
                     install DecodeLayer with route_layer so decoding runs after authentication"
                );
            }
            req = RequestPipeline::decode(req).await?;
        }

        if let Some(LogicalPayload(value)) = req.extensions_mut().remove::<LogicalPayload>() {
            return from_value(value);
        }

        let limits = req
            .extensions()
            .get::<RequestContext>()
            .map(|ctx| ctx.config().limits())
            .unwrap_or_default();
        from_json_body(req, limits).await
    }
}

async fn from_json_body<T: DeserializeOwned>(
    req: Request,
    limits: MessageLimits,
) -> Result<Payload<T>, HttpError> {
    let json = is_json(req.headers()) || !has_content_type(req.headers());
    let bytes = read_body(req.into_body(), limits).await?;

    if bytes.is_empty() {
        return from_value(Value::Null);
    }
    if !json {
        return Err(HttpError::unsupported_media_type());
    }

    serde_json::from_slice(&bytes)
        .map(Payload)
        .map_err(|e| HttpError::bad_request(format!("Invalid request payload JSON format: {e}")))
}

fn from_value<T: DeserializeOwned>(value: Value) -> Result<Payload<T>, HttpError> {
    let is_null = value.is_null();
    serde_json::from_value(value).map(Payload).map_err(|e| {
        if is_null {
            HttpError::bad_request("request payload must be an object")
        } else {
            HttpError::bad_request(format!("Invalid request payload input: {e}"))
        }
    })
}

fn has_content_type(headers: &HeaderMap) -> bool {
    headers.contains_key(axum::http::header::CONTENT_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranscodeConfig;
    use axum::body::Body;
    use axum::http::{StatusCode, header::CONTENT_TYPE};
    use msgpack_axum_core::{Codec, MsgPackCodec};
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Input {
        str: String,
        num: i64,
    }

    async fn extract<T: DeserializeOwned>(req: Request) -> Result<T, HttpError> {
        Payload::<T>::from_request(req, &()).await.map(|Payload(v)| v)
    }

    fn request(content_type: Option<&str>, body: impl Into<Body>) -> Request {
        let mut builder = Request::builder();
        if let Some(ct) = content_type {
            builder = builder.header(CONTENT_TYPE, ct);
        }
        builder.body(body.into()).unwrap()
    }

    #[tokio::test]
    async fn test_logical_payload_wins() {
        let mut req = request(Some("application/octet-stream"), "not json");
        req.extensions_mut()
            .insert(LogicalPayload(json!({ "str": "string", "num": 42 })));

        let input: Input = extract(req).await.unwrap();
        assert_eq!(
            input,
            Input {
                str: "string".into(),
                num: 42
            }
        );
    }

    #[tokio::test]
    async fn test_logical_payload_type_mismatch() {
        let mut req = request(None, Body::empty());
        req.extensions_mut().insert(LogicalPayload(json!([1, 2, 3])));

        let err = extract::<Input>(req).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.message().starts_with("Invalid request payload input"));
    }

    #[tokio::test]
    async fn test_json_body() {
        let req = request(Some("application/json"), r#"{"str":"s","num":1}"#);
        let input: Input = extract(req).await.unwrap();
        assert_eq!(input.num, 1);
    }

    #[tokio::test]
    async fn test_invalid_json_body() {
        let req = request(Some("application/json"), "{");
        let err = extract::<Input>(req).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_empty_body_is_null() {
        let err = extract::<Input>(request(None, Body::empty()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "request payload must be an object");

        let value: Option<Input> = extract(request(None, Body::empty())).await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_non_json_body_rejected() {
        let req = request(Some("text/plain"), "hello");
        let err = extract::<Value>(req).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_decodes_when_decode_layer_missing() {
        let value = json!({ "str": "string", "num": 42 });
        let mut req = request(
            Some("application/x-msgpack"),
            MsgPackCodec.encode(&value).unwrap(),
        );
        RequestPipeline::intercept(&Arc::new(TranscodeConfig::default()), &mut req);

        let input: Input = extract(req).await.unwrap();
        assert_eq!(input.str, "string");
    }

    #[tokio::test]
    async fn test_flagged_empty_body_must_be_object() {
        let mut req = request(Some("application/x-msgpack"), Body::empty());
        RequestPipeline::intercept(&Arc::new(TranscodeConfig::default()), &mut req);

        let err = extract::<Input>(req).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "request payload must be an object");
    }
}

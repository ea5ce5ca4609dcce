//! Transcoding configuration - process-wide, immutable settings.
//!
//! Built once at startup through [`TranscodeConfigBuilder`] (or from
//! deserialized [`TranscodeOptions`]) and shared by every request through an
//! `Arc`. There are no setters: the matcher and the `Content-Type` header value
//! are derived from the mime-type inside [`TranscodeConfigBuilder::build`], so
//! they cannot drift apart.

use axum::http::HeaderValue;
use msgpack_axum_core::{BoxedCodec, Codec, ConfigError, DEFAULT_MIME_TYPE, MimeMatcher};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::limits::{DEFAULT_MAX_MESSAGE_SIZE, MessageLimits};
use crate::pipeline::DISGUISED_CONTENT_TYPE;

/// Transformation applied to a response body right before binary encoding.
///
/// Only the binary channel sees the result; JSON responses are untouched.
#[derive(Clone)]
pub struct PreEncodeHook(Arc<dyn Fn(Value) -> Value + Send + Sync>);

impl PreEncodeHook {
    /// Wrap a function as a hook.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// The identity hook.
    pub fn identity() -> Self {
        Self::new(|value| value)
    }

    /// Apply the hook.
    pub fn apply(&self, value: Value) -> Value {
        (self.0)(value)
    }
}

impl Default for PreEncodeHook {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::fmt::Debug for PreEncodeHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PreEncodeHook")
    }
}

/// Deserializable options, e.g. from a TOML or JSON settings file.
///
/// ```rust
/// use msgpack_axum::{TranscodeConfig, TranscodeOptions};
///
/// let options: TranscodeOptions =
///     serde_json::from_str(r#"{ "mime_type": "application/x-custom-msgpack" }"#).unwrap();
/// let config = TranscodeConfig::from_options(options).unwrap();
/// assert_eq!(config.mime_type(), "application/x-custom-msgpack");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranscodeOptions {
    /// Target mime-type.
    pub mime_type: String,
    /// Maximum buffered request payload in bytes; `null` for unlimited.
    pub max_message_size: Option<usize>,
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        Self {
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            max_message_size: Some(DEFAULT_MAX_MESSAGE_SIZE),
        }
    }
}

/// Immutable transcoding configuration.
#[derive(Clone, Debug)]
pub struct TranscodeConfig {
    mime_type: String,
    content_type: HeaderValue,
    matcher: MimeMatcher,
    pre_encode: PreEncodeHook,
    codec: BoxedCodec,
    limits: MessageLimits,
}

impl TranscodeConfig {
    /// Start building a configuration.
    pub fn builder() -> TranscodeConfigBuilder {
        TranscodeConfigBuilder::default()
    }

    /// Build a configuration from deserialized options.
    pub fn from_options(options: TranscodeOptions) -> Result<Self, ConfigError> {
        Self::builder()
            .mime_type(options.mime_type)
            .message_limits(options.max_message_size.into())
            .build()
    }

    /// The target mime-type.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// The target mime-type as a `Content-Type` header value.
    pub fn content_type(&self) -> &HeaderValue {
        &self.content_type
    }

    /// Matcher compiled from [`mime_type`](Self::mime_type).
    pub fn matcher(&self) -> &MimeMatcher {
        &self.matcher
    }

    /// Hook applied to response bodies before encoding.
    pub fn pre_encode(&self) -> &PreEncodeHook {
        &self.pre_encode
    }

    /// Codec used for both directions.
    pub fn codec(&self) -> &BoxedCodec {
        &self.codec
    }

    /// Request payload limits.
    pub fn limits(&self) -> MessageLimits {
        self.limits
    }
}

impl Default for TranscodeConfig {
    /// Same as `TranscodeConfig::builder().build()`.
    fn default() -> Self {
        match Self::builder().build() {
            Ok(config) => config,
            Err(err) => unreachable!("default transcode config is valid: {err}"),
        }
    }
}

/// Builder for [`TranscodeConfig`].
///
/// ```rust
/// use msgpack_axum::TranscodeConfig;
/// use serde_json::json;
///
/// let config = TranscodeConfig::builder()
///     .mime_type("application/x-msgpack")
///     .pre_encode(|body| json!({ "data": body }))
///     .build()
///     .expect("valid transcode config");
/// ```
#[derive(Debug, Default)]
pub struct TranscodeConfigBuilder {
    mime_type: Option<String>,
    pre_encode: Option<PreEncodeHook>,
    codec: Option<BoxedCodec>,
    limits: Option<MessageLimits>,
}

impl TranscodeConfigBuilder {
    /// Set the target mime-type. Default: `application/x-msgpack`.
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Set the hook applied to response bodies before encoding.
    pub fn pre_encode<F>(mut self, hook: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.pre_encode = Some(PreEncodeHook::new(hook));
        self
    }

    /// Replace the MessagePack codec.
    pub fn codec<C: Codec>(mut self, codec: C) -> Self {
        self.codec = Some(BoxedCodec::new(codec));
        self
    }

    /// Set custom payload limits. Default is 4 MB.
    pub fn message_limits(mut self, limits: MessageLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Validate and freeze the configuration.
    pub fn build(self) -> Result<TranscodeConfig, ConfigError> {
        let mime_type = self
            .mime_type
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());
        let content_type = validate_mime_type(&mime_type)?;
        let matcher = MimeMatcher::compile(&mime_type)?;

        if matcher.matches(Some(DISGUISED_CONTENT_TYPE)) {
            return Err(ConfigError::AmbiguousMimeType {
                mime_type,
                marker: DISGUISED_CONTENT_TYPE,
            });
        }

        Ok(TranscodeConfig {
            mime_type,
            content_type,
            matcher,
            pre_encode: self.pre_encode.unwrap_or_default(),
            codec: self.codec.unwrap_or_default(),
            limits: self.limits.unwrap_or_default(),
        })
    }
}

fn validate_mime_type(mime_type: &str) -> Result<HeaderValue, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidMimeType {
        mime_type: mime_type.to_string(),
        reason: reason.to_string(),
    };

    if mime_type.trim().is_empty() {
        return Err(ConfigError::EmptyMimeType);
    }
    if mime_type.trim() != mime_type {
        return Err(invalid("leading or trailing whitespace"));
    }
    if !mime_type.contains('/') {
        return Err(invalid("expected type/subtype"));
    }
    HeaderValue::from_str(mime_type).map_err(|e| invalid(&e.to_string()))
}

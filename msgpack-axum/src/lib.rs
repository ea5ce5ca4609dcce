//! # msgpack-axum
//!
//! Transparent MessagePack transcoding for [Axum](https://github.com/tokio-rs/axum).
//!
//! Clients may send request bodies as MessagePack and ask for MessagePack
//! responses; handlers keep working with structured values as if every
//! client spoke JSON.
//!
//! ## Features
//!
//! - **Request decoding:** a body whose `Content-Type` matches the configured
//!   mime-type is decoded after authentication, before the handler runs. A
//!   malformed body is rejected with `400 Bad messagepack data`.
//! - **Response encoding:** when `Accept` matches, the response body is
//!   encoded, status and headers preserved, `Content-Type` forced to the
//!   mime-type. Error responses go through the same path.
//! - **Pre-encode hook:** reshape response bodies on the binary channel only.
//! - **Axum-native:** handlers use the [`Payload`] extractor and the
//!   [`Reply`] response, or plain `IntoResponse` JSON.
//!
//! ## Getting Started
//!
//! ```rust,ignore
//! use axum::{Router, ServiceExt, routing::post};
//! use msgpack_axum::prelude::*;
//! use tower::Layer;
//!
//! async fn echo(Payload(body): Payload<serde_json::Value>) -> Reply<serde_json::Value> {
//!     Reply::new(body)
//! }
//!
//! let router = Router::new()
//!     .route("/echo", post(echo))
//!     .route_layer(DecodeLayer::new());
//! let app = TranscodeLayer::default().layer(router);
//! axum::serve(listener, app.into_make_service()).await?;
//! ```
//!
//! See [`layer`] for the layer order, and the `msgpack-axum-examples` crate
//! for a runnable server.

pub mod config;
pub mod context;
pub mod error;
pub mod layer;
pub mod limits;
pub mod pipeline;
pub mod request;
pub mod response;

#[cfg(test)]
mod test_util;

// Re-export core types
pub use msgpack_axum_core::{
    BoxedCodec, Codec, ConfigError, DEFAULT_MIME_TYPE, DecodeError, EncodeError, MimeMatcher,
    MsgPackCodec,
};

pub use config::{PreEncodeHook, TranscodeConfig, TranscodeConfigBuilder, TranscodeOptions};
pub use context::{LogicalPayload, RequestContext, ResponseContext, SourceBody};
pub use error::HttpError;
pub use layer::{DecodeLayer, DecodeService, TranscodeLayer, TranscodeService};
pub use limits::MessageLimits;
pub use pipeline::{DISGUISED_CONTENT_TYPE, RequestPipeline, ResponsePipeline};
pub use request::Payload;
pub use response::Reply;

pub mod prelude {
    //! A prelude for `msgpack-axum` providing the most common types.
    pub use crate::config::{TranscodeConfig, TranscodeOptions};
    pub use crate::error::HttpError;
    pub use crate::layer::{DecodeLayer, TranscodeLayer};
    pub use crate::limits::MessageLimits;
    pub use crate::request::Payload;
    pub use crate::response::Reply;
}

//! Middleware layers that plug the transcoding stages into a router.
//!
//! - [`TranscodeLayer`]: wraps the whole router. Flags binary requests before
//!   routing and re-encodes responses after everything else has run.
//! - [`DecodeLayer`]: installed with `route_layer`, inside any authentication
//!   layers. Decodes flagged payloads before the handler runs.
//!
//! ## Layer Stack Order
//!
//! ```rust,ignore
//! use axum::ServiceExt;
//! use msgpack_axum::{DecodeLayer, TranscodeLayer};
//!
//! let router = Router::new()
//!     .route("/basic-input", post(handler))
//!     .route_layer(DecodeLayer::new())          // Inner: decode after auth
//!     .route_layer(from_fn(require_auth));      // Middle: authentication
//! let app = TranscodeLayer::default().layer(router); // Outer: whole router
//!
//! axum::serve(listener, app.into_make_service()).await?;
//! ```
//!
//! `Router::layer` only wraps matched routes, so the outer layer is applied
//! to the router as a service. That way it also sees requests that fail
//! routing, and can transcode the resulting error responses. axum answers
//! those with an empty body, which passes through as is; give the router a
//! fallback that returns an [`HttpError`] to have 404s encoded too:
//!
//! ```rust,ignore
//! let router = router.fallback(|| async {
//!     HttpError::new(StatusCode::NOT_FOUND, "Route not found")
//! });
//! ```
//!
//! [`HttpError`]: crate::HttpError
//!
//! ```text
//! TranscodeLayer        <- flag + disguise Content-Type / transcode response
//!   Router              <- routing, 404/405
//!     auth              <- sees application/octet-stream, not the raw type
//!       DecodeLayer     <- buffer + decode, 400 on bad data
//!         handler       <- Payload<T> / Reply<T>
//! ```

mod decode;
mod transcode;

pub use decode::{DecodeLayer, DecodeService};
pub use transcode::{TranscodeLayer, TranscodeService};

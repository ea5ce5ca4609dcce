//! Outer layer: request interception and response transcoding.
//!
//! See the [parent module](super) documentation for where this layer goes.

use axum::body::Body;
use axum::http::{Request, header::ACCEPT};
use axum::response::Response;
use msgpack_axum_core::ConfigError;
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service, ServiceExt};

use crate::config::TranscodeConfig;
use crate::pipeline::{RequestPipeline, ResponsePipeline, combined_header};

/// Layer that runs the pre-routing and pre-response stages.
///
/// Must wrap the whole router, so that it sees requests before routing and
/// responses after everything else, error responses included.
///
/// # Example
///
/// ```rust,ignore
/// use axum::ServiceExt;
/// use msgpack_axum::{DecodeLayer, TranscodeLayer};
///
/// let router = Router::new()
///     .route("/basic-input", post(handler))
///     .route_layer(DecodeLayer::new());
/// let app = TranscodeLayer::default().layer(router);
///
/// axum::serve(listener, app.into_make_service()).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct TranscodeLayer {
    config: Arc<TranscodeConfig>,
}

impl TranscodeLayer {
    /// Create a layer with the given configuration.
    pub fn new(config: TranscodeConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Create a layer with a custom target mime-type and otherwise default
    /// settings.
    pub fn with_mime_type(mime_type: impl Into<String>) -> Result<Self, ConfigError> {
        let config = TranscodeConfig::builder().mime_type(mime_type).build()?;
        Ok(Self::new(config))
    }

    /// The configuration shared by every request.
    pub fn config(&self) -> &TranscodeConfig {
        &self.config
    }
}

impl<S> Layer<S> for TranscodeLayer {
    type Service = TranscodeService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TranscodeService {
            inner,
            config: Arc::clone(&self.config),
        }
    }
}

/// Service produced by [`TranscodeLayer`].
#[derive(Debug, Clone)]
pub struct TranscodeService<S> {
    inner: S,
    config: Arc<TranscodeConfig>,
}

impl<S> Service<Request<Body>> for TranscodeService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        // Negotiation uses the header as the client sent it, all lines of it.
        let accept = combined_header(req.headers(), ACCEPT);
        RequestPipeline::intercept(&self.config, &mut req);

        let config = Arc::clone(&self.config);
        let inner = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, inner);

        Box::pin(async move {
            let response = inner.oneshot(req).await?;
            Ok(ResponsePipeline::transcode(&config, accept.as_ref(), response).await)
        })
    }
}

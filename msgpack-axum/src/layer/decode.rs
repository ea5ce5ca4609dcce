//! Inner layer: post-authentication payload decoding.

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tower::{Layer, Service, ServiceExt};

use crate::pipeline::RequestPipeline;

/// Layer that decodes flagged request payloads.
///
/// Install it with [`Router::route_layer`](axum::Router::route_layer) after
/// any authentication layers, so it only runs for matched routes and only
/// once the request is authenticated. A payload that fails to decode
/// short-circuits with a 400 and the handler never runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeLayer;

impl DecodeLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for DecodeLayer {
    type Service = DecodeService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DecodeService { inner }
    }
}

/// Service produced by [`DecodeLayer`].
#[derive(Debug, Clone)]
pub struct DecodeService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for DecodeService<S>
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

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let inner = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, inner);

        Box::pin(async move {
            match RequestPipeline::decode(req).await {
                Ok(req) => inner.oneshot(req).await,
                Err(err) => Ok(err.into_response()),
            }
        })
    }
}

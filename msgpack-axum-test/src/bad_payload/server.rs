use axum::{
    Router, ServiceExt,
    extract::Request,
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::post,
};
use msgpack_axum::prelude::*;
use serde::Deserialize;
use serde_json::{Value, json};
use tower::Layer;

pub const API_KEY: &str = "let-me-in";
pub const MAX_MESSAGE_SIZE: usize = 256;
pub const AUTH_SCHEME: &str = "ApiKey";

#[derive(Debug, Deserialize)]
struct Input {
    #[allow(dead_code)]
    str: String,
}

async fn require_api_key(req: Request, next: Next) -> Response {
    let authorized = req
        .headers()
        .get("x-api-key")
        .is_some_and(|v| v.as_bytes() == API_KEY.as_bytes());
    if !authorized {
        return HttpError::new(StatusCode::UNAUTHORIZED, "Missing authentication")
            .with_meta("www-authenticate", AUTH_SCHEME)
            .into_response();
    }
    next.run(req).await
}

async fn not_found() -> HttpError {
    HttpError::new(StatusCode::NOT_FOUND, "Route not found")
}

async fn input(Payload(_input): Payload<Input>) -> Reply<Value> {
    Reply::new(json!({ "received": true }))
}

pub async fn start(listener: tokio::net::UnixListener) -> anyhow::Result<()> {
    let config = TranscodeConfig::builder()
        .message_limits(MessageLimits::new(MAX_MESSAGE_SIZE))
        .build()?;

    let router = Router::new()
        .route("/input", post(input))
        .route_layer(DecodeLayer::new())
        .route_layer(middleware::from_fn(require_api_key))
        .fallback(not_found);

    let app = TranscodeLayer::new(config).layer(router);

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

use axum::{Router, ServiceExt, routing::get};
use msgpack_axum::prelude::*;
use serde_json::{Value, json};
use tower::Layer;

use crate::fixture;

async fn basic_response() -> Reply<Value> {
    Reply::new(fixture::basic())
}

pub async fn start(listener: tokio::net::UnixListener) -> anyhow::Result<()> {
    let config = TranscodeConfig::builder()
        .pre_encode(|body| {
            json!({
                "originalPayload": body,
                "something": "completely",
                "different": true
            })
        })
        .build()?;

    let router = Router::new()
        .route("/basic-response", get(basic_response))
        .route_layer(DecodeLayer::new());

    let app = TranscodeLayer::new(config).layer(router);

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

use axum::{
    Router, ServiceExt,
    http::StatusCode,
    routing::{get, post},
};
use msgpack_axum::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower::Layer;

use crate::fixture;

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct BasicInput {
    str: String,
    num: i64,
    nope: Option<Value>,
    arr: Vec<Value>,
}

async fn basic_response() -> Reply<Value> {
    Reply::new(fixture::basic())
}

async fn basic_input(Payload(input): Payload<BasicInput>) -> Result<Reply<Value>, HttpError> {
    let received = serde_json::to_value(&input).map_err(|_| HttpError::internal())?;
    if received != fixture::basic() {
        return Err(HttpError::bad_request(format!("unexpected payload: {received}")));
    }

    Ok(Reply::new(json!({
        "statusCode": 200,
        "error": null,
        "data": { "received": true }
    }))
    .with_header("x-custom-header", "absolutely i do"))
}

async fn teapot() -> HttpError {
    HttpError::new(StatusCode::IM_A_TEAPOT, "short and stout")
}

pub async fn start(listener: tokio::net::UnixListener, mime_type: &'static str) -> anyhow::Result<()> {
    let config = TranscodeConfig::builder().mime_type(mime_type).build()?;

    let router = Router::new()
        .route("/basic-response", get(basic_response))
        .route("/basic-input", post(basic_input))
        .route("/teapot", get(teapot))
        .route_layer(DecodeLayer::new());

    let app = TranscodeLayer::new(config).layer(router);

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

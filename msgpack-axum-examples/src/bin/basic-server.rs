//! Basic server
//!
//! The same routes answer JSON and MessagePack clients:
//! - `Content-Type: application/x-msgpack` bodies are decoded after the API
//!   key check, before the handler runs
//! - `Accept: application/x-msgpack` responses are encoded, errors included
//!
//! Run with: cargo run --bin basic-server
//! Optional: MSGPACK_AXUM_CONFIG=settings.json, RUST_LOG=msgpack_axum=trace

use axum::{
    Router, ServiceExt,
    extract::Request,
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use msgpack_axum::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower::Layer;

#[derive(Debug, Deserialize, Serialize)]
struct Greeting {
    name: String,
    #[serde(default)]
    tags: Vec<String>,
}

async fn basic_response() -> Reply<Value> {
    Reply::new(json!({
        "str": "string",
        "num": 42,
        "nope": null,
        "arr": [1, "2", 3]
    }))
}

async fn greet(Payload(greeting): Payload<Greeting>) -> Result<Reply<Value>, HttpError> {
    if greeting.name.is_empty() {
        return Err(HttpError::bad_request("name must not be empty"));
    }
    tracing::info!(name = %greeting.name, "greeting received");

    Ok(Reply::new(json!({
        "message": format!("Hello, {}!", greeting.name),
        "tags": greeting.tags,
    }))
    .with_status(StatusCode::CREATED)
    .with_header("x-custom-header", "absolutely i do"))
}

// Unmatched routes get an error body the outer layer can encode.
async fn not_found() -> HttpError {
    HttpError::new(StatusCode::NOT_FOUND, "Route not found")
}

async fn require_api_key(req: Request, next: Next) -> Response {
    let expected = std::env::var("API_KEY").unwrap_or_else(|_| "secret".into());
    let authorized = req
        .headers()
        .get("x-api-key")
        .is_some_and(|v| v.as_bytes() == expected.as_bytes());
    if !authorized {
        return HttpError::new(StatusCode::UNAUTHORIZED, "Missing authentication")
            .with_meta("www-authenticate", "ApiKey")
            .into_response();
    }
    next.run(req).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    msgpack_axum_examples::init_tracing();
    let config = msgpack_axum_examples::load_config()?;
    let mime_type = config.mime_type().to_string();

    let router = Router::new()
        .route("/basic-response", get(basic_response))
        .route("/greet", post(greet))
        .route_layer(DecodeLayer::new())
        .route_layer(middleware::from_fn(require_api_key))
        .fallback(not_found);

    // Wrap the router itself so interception runs before routing.
    let app = TranscodeLayer::new(config).layer(router);

    let addr = msgpack_axum_examples::server_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    println!("=== Basic Server ===");
    println!("Server listening on http://{}", addr);
    println!();
    println!("Routes (x-api-key required):");
    println!("  - GET  /basic-response");
    println!("  - POST /greet");
    println!();
    println!("Test with:");
    println!("  curl http://localhost:3000/basic-response \\");
    println!("    -H 'x-api-key: secret' -H 'Accept: {mime_type}' --output -");
    println!("  curl -X POST http://localhost:3000/greet \\");
    println!("    -H 'x-api-key: secret' -H 'Content-Type: application/json' \\");
    println!("    -d '{{\"name\": \"Alice\"}}'");

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

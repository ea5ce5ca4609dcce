//! Pre-encode hook
//!
//! MessagePack clients receive every body wrapped in an envelope; JSON
//! clients see the handler's output unchanged.
//!
//! Run with: cargo run --bin pre-encode

use axum::{Router, ServiceExt, routing::get};
use msgpack_axum::prelude::*;
use serde_json::{Value, json};
use std::time::{SystemTime, UNIX_EPOCH};
use tower::Layer;

async fn status() -> Reply<Value> {
    Reply::new(json!({ "healthy": true }))
}

fn envelope(body: Value) -> Value {
    let sent_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    json!({ "data": body, "sentAt": sent_at })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    msgpack_axum_examples::init_tracing();

    let config = TranscodeConfig::builder().pre_encode(envelope).build()?;

    let router = Router::new()
        .route("/status", get(status))
        .route_layer(DecodeLayer::new());
    let app = TranscodeLayer::new(config).layer(router);

    let addr = msgpack_axum_examples::server_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    println!("=== Pre-encode Hook ===");
    println!("Server listening on http://{}", addr);
    println!();
    println!("Test with:");
    println!("  curl http://localhost:3000/status");
    println!("  curl http://localhost:3000/status -H 'Accept: application/x-msgpack' --output -");

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

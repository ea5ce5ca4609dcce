use bytes::Bytes;
use msgpack_axum::DEFAULT_MIME_TYPE;
use serde_json::{Value, json};

use super::server::{API_KEY, AUTH_SCHEME, MAX_MESSAGE_SIZE};
use crate::fixture::{self, JSON_CONTENT_TYPE};
use crate::report::CaseResult;
use crate::socket::{TestResponse, TestSocket, send};

fn bad_messagepack() -> Value {
    json!({ "statusCode": 400, "error": "Bad Request", "message": "Bad messagepack data" })
}

fn truncated() -> anyhow::Result<Bytes> {
    let encoded = fixture::to_msgpack(&json!({ "str": "string" }))?;
    Ok(encoded.slice(..encoded.len() - 3))
}

pub async fn run_bad_payload_tests(sock: &TestSocket) -> Vec<CaseResult> {
    vec![
        CaseResult::new("truncated payload is rejected as JSON", truncated_json(sock).await),
        CaseResult::new(
            "truncated payload is rejected as MessagePack",
            truncated_msgpack(sock).await,
        ),
        CaseResult::new("trailing bytes are rejected", trailing_bytes(sock).await),
        CaseResult::new(
            "authentication runs before decoding",
            unauthenticated(sock).await,
        ),
        CaseResult::new("unknown route is answered as MessagePack", unknown_route(sock).await),
        CaseResult::new("empty payload must be an object", empty_payload(sock).await),
        CaseResult::new("oversized payload is rejected", oversized(sock).await),
        CaseResult::new("well-formed payload is accepted", well_formed(sock).await),
    ]
}

async fn post(
    sock: &TestSocket,
    body: Bytes,
    accept: Option<&str>,
    authed: bool,
) -> anyhow::Result<TestResponse> {
    post_to(sock, "/input", body, accept, authed).await
}

async fn post_to(
    sock: &TestSocket,
    path: &str,
    body: Bytes,
    accept: Option<&str>,
    authed: bool,
) -> anyhow::Result<TestResponse> {
    let mut req = fixture::post(path, DEFAULT_MIME_TYPE, accept, body)?;
    if authed {
        req.headers_mut().insert("x-api-key", API_KEY.parse()?);
    }
    send(sock, req).await
}

fn expect(
    resp: &TestResponse,
    status: u16,
    content_type: &str,
    body: &Value,
) -> anyhow::Result<()> {
    if resp.status.as_u16() != status {
        anyhow::bail!("expected status {status}, got {}", resp.status);
    }
    if resp.content_type() != content_type {
        anyhow::bail!("expected content-type {content_type:?}, got {:?}", resp.content_type());
    }
    let actual = if content_type == JSON_CONTENT_TYPE {
        fixture::from_json(&resp.body)?
    } else {
        fixture::from_msgpack(&resp.body)?
    };
    if &actual != body {
        anyhow::bail!("expected body {body}, got {actual}");
    }
    Ok(())
}

async fn truncated_json(sock: &TestSocket) -> anyhow::Result<()> {
    let resp = post(sock, truncated()?, None, true).await?;
    expect(&resp, 400, JSON_CONTENT_TYPE, &bad_messagepack())
}

async fn truncated_msgpack(sock: &TestSocket) -> anyhow::Result<()> {
    let resp = post(sock, truncated()?, Some(DEFAULT_MIME_TYPE), true).await?;
    expect(&resp, 400, DEFAULT_MIME_TYPE, &bad_messagepack())
}

async fn trailing_bytes(sock: &TestSocket) -> anyhow::Result<()> {
    let mut body = fixture::to_msgpack(&json!({ "str": "string" }))?.to_vec();
    body.extend_from_slice(&[0xc0, 0xc0]);
    let resp = post(sock, Bytes::from(body), None, true).await?;
    expect(&resp, 400, JSON_CONTENT_TYPE, &bad_messagepack())
}

async fn unauthenticated(sock: &TestSocket) -> anyhow::Result<()> {
    let resp = post(sock, truncated()?, None, false).await?;
    expect(
        &resp,
        401,
        JSON_CONTENT_TYPE,
        &json!({ "statusCode": 401, "error": "Unauthorized", "message": "Missing authentication" }),
    )?;
    if resp.header("www-authenticate") != Some(AUTH_SCHEME) {
        anyhow::bail!(
            "expected www-authenticate {AUTH_SCHEME:?}, got {:?}",
            resp.header("www-authenticate")
        );
    }
    Ok(())
}

async fn unknown_route(sock: &TestSocket) -> anyhow::Result<()> {
    let resp = post_to(sock, "/missing", Bytes::new(), Some(DEFAULT_MIME_TYPE), true).await?;
    expect(
        &resp,
        404,
        DEFAULT_MIME_TYPE,
        &json!({ "statusCode": 404, "error": "Not Found", "message": "Route not found" }),
    )
}

async fn empty_payload(sock: &TestSocket) -> anyhow::Result<()> {
    let resp = post(sock, Bytes::new(), None, true).await?;
    expect(
        &resp,
        400,
        JSON_CONTENT_TYPE,
        &json!({ "statusCode": 400, "error": "Bad Request", "message": "request payload must be an object" }),
    )
}

async fn oversized(sock: &TestSocket) -> anyhow::Result<()> {
    let big = "x".repeat(MAX_MESSAGE_SIZE * 2);
    let resp = post(sock, fixture::to_msgpack(&json!({ "str": big }))?, None, true).await?;
    expect(
        &resp,
        413,
        JSON_CONTENT_TYPE,
        &json!({
            "statusCode": 413,
            "error": "Payload Too Large",
            "message": format!("Payload content length greater than maximum allowed: {MAX_MESSAGE_SIZE}")
        }),
    )
}

async fn well_formed(sock: &TestSocket) -> anyhow::Result<()> {
    let body = fixture::to_msgpack(&json!({ "str": "string" }))?;
    let resp = post(sock, body, Some(DEFAULT_MIME_TYPE), true).await?;
    expect(&resp, 200, DEFAULT_MIME_TYPE, &json!({ "received": true }))
}

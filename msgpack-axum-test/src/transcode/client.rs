use msgpack_axum::DEFAULT_MIME_TYPE;
use serde_json::{Value, json};

use crate::fixture::{self, JSON_CONTENT_TYPE};
use crate::report::CaseResult;
use crate::socket::{TestResponse, TestSocket, send};

#[derive(Clone, Copy)]
enum Format {
    Json,
    MsgPack,
}

fn received() -> Value {
    json!({ "statusCode": 200, "error": null, "data": { "received": true } })
}

pub async fn run_transcode_tests(sock: &TestSocket, mime_type: &str) -> Vec<CaseResult> {
    let mut results = vec![
        CaseResult::new(
            "responses as JSON",
            get_basic(sock, mime_type, Format::Json).await,
        ),
        CaseResult::new(
            "responses as MessagePack",
            get_basic(sock, mime_type, Format::MsgPack).await,
        ),
        CaseResult::new(
            "post JSON, receive JSON",
            post_basic(sock, mime_type, Format::Json, Format::Json).await,
        ),
        CaseResult::new(
            "post JSON, receive MessagePack",
            post_basic(sock, mime_type, Format::Json, Format::MsgPack).await,
        ),
        CaseResult::new(
            "post MessagePack, receive JSON",
            post_basic(sock, mime_type, Format::MsgPack, Format::Json).await,
        ),
        CaseResult::new(
            "post MessagePack, receive MessagePack",
            post_basic(sock, mime_type, Format::MsgPack, Format::MsgPack).await,
        ),
        CaseResult::new(
            "error responses as MessagePack",
            error_as_msgpack(sock, mime_type).await,
        ),
        CaseResult::new(
            "mime-type with parameters is recognized",
            post_with_parameters(sock, mime_type).await,
        ),
    ];

    if mime_type != DEFAULT_MIME_TYPE {
        results.push(CaseResult::new(
            "default mime-type is not recognized",
            default_type_ignored(sock).await,
        ));
    }
    results
}

fn check_status(resp: &TestResponse, expected: u16) -> anyhow::Result<()> {
    if resp.status.as_u16() != expected {
        anyhow::bail!(
            "expected status {expected}, got {} ({})",
            resp.status,
            String::from_utf8_lossy(&resp.body)
        );
    }
    Ok(())
}

fn check_body(resp: &TestResponse, mime_type: &str, format: Format, expected: &Value) -> anyhow::Result<()> {
    let (content_type, body) = match format {
        Format::Json => (JSON_CONTENT_TYPE, fixture::from_json(&resp.body)?),
        Format::MsgPack => (mime_type, fixture::from_msgpack(&resp.body)?),
    };
    if resp.content_type() != content_type {
        anyhow::bail!(
            "expected content-type {content_type:?}, got {:?}",
            resp.content_type()
        );
    }
    if &body != expected {
        anyhow::bail!("expected body {expected}, got {body}");
    }
    Ok(())
}

fn accept_for(mime_type: &str, format: Format) -> Option<&str> {
    match format {
        Format::Json => None,
        Format::MsgPack => Some(mime_type),
    }
}

async fn get_basic(sock: &TestSocket, mime_type: &str, format: Format) -> anyhow::Result<()> {
    let req = fixture::get("/basic-response", accept_for(mime_type, format))?;
    let resp = send(sock, req).await?;

    check_status(&resp, 200)?;
    check_body(&resp, mime_type, format, &fixture::basic())
}

async fn post_basic(
    sock: &TestSocket,
    mime_type: &str,
    input: Format,
    output: Format,
) -> anyhow::Result<()> {
    let (content_type, body) = match input {
        Format::Json => ("application/json", serde_json::to_vec(&fixture::basic())?.into()),
        Format::MsgPack => (mime_type, fixture::to_msgpack(&fixture::basic())?),
    };
    let req = fixture::post(
        "/basic-input",
        content_type,
        accept_for(mime_type, output),
        body,
    )?;
    let resp = send(sock, req).await?;

    check_status(&resp, 200)?;
    if resp.header("x-custom-header") != Some("absolutely i do") {
        anyhow::bail!("missing x-custom-header");
    }
    check_body(&resp, mime_type, output, &received())
}

async fn error_as_msgpack(sock: &TestSocket, mime_type: &str) -> anyhow::Result<()> {
    let req = fixture::get("/teapot", Some(mime_type))?;
    let resp = send(sock, req).await?;

    check_status(&resp, 418)?;
    check_body(
        &resp,
        mime_type,
        Format::MsgPack,
        &json!({ "statusCode": 418, "error": "I'm a teapot", "message": "short and stout" }),
    )
}

async fn post_with_parameters(sock: &TestSocket, mime_type: &str) -> anyhow::Result<()> {
    let content_type = format!("{}; charset=binary", mime_type.to_ascii_uppercase());
    let accept = format!("application/json;q=0.5, {mime_type}");
    let req = fixture::post(
        "/basic-input",
        &content_type,
        Some(&accept),
        fixture::to_msgpack(&fixture::basic())?,
    )?;
    let resp = send(sock, req).await?;

    check_status(&resp, 200)?;
    check_body(&resp, mime_type, Format::MsgPack, &received())
}

async fn default_type_ignored(sock: &TestSocket) -> anyhow::Result<()> {
    let req = fixture::post(
        "/basic-input",
        DEFAULT_MIME_TYPE,
        Some(DEFAULT_MIME_TYPE),
        fixture::to_msgpack(&fixture::basic())?,
    )?;
    let resp = send(sock, req).await?;

    // Not a JSON body and not the configured type.
    check_status(&resp, 415)?;
    check_body(
        &resp,
        DEFAULT_MIME_TYPE,
        Format::Json,
        &json!({ "statusCode": 415, "error": "Unsupported Media Type", "message": "Unsupported Media Type" }),
    )
}

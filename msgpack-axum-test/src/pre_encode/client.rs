use msgpack_axum::DEFAULT_MIME_TYPE;
use serde_json::json;

use crate::fixture::{self, JSON_CONTENT_TYPE};
use crate::report::CaseResult;
use crate::socket::{TestSocket, send};

pub async fn run_pre_encode_tests(sock: &TestSocket) -> Vec<CaseResult> {
    vec![
        CaseResult::new("hook reshapes MessagePack body", hook_applied(sock).await),
        CaseResult::new("hook leaves JSON body alone", hook_skipped(sock).await),
    ]
}

async fn hook_applied(sock: &TestSocket) -> anyhow::Result<()> {
    let req = fixture::get("/basic-response", Some(DEFAULT_MIME_TYPE))?;
    let resp = send(sock, req).await?;

    if resp.status.as_u16() != 200 {
        anyhow::bail!("expected status 200, got {}", resp.status);
    }
    if resp.content_type() != DEFAULT_MIME_TYPE {
        anyhow::bail!("unexpected content-type {:?}", resp.content_type());
    }
    let body = fixture::from_msgpack(&resp.body)?;
    let expected = json!({
        "originalPayload": fixture::basic(),
        "something": "completely",
        "different": true
    });
    if body != expected {
        anyhow::bail!("expected body {expected}, got {body}");
    }
    Ok(())
}

async fn hook_skipped(sock: &TestSocket) -> anyhow::Result<()> {
    let req = fixture::get("/basic-response", None)?;
    let resp = send(sock, req).await?;

    if resp.content_type() != JSON_CONTENT_TYPE {
        anyhow::bail!("unexpected content-type {:?}", resp.content_type());
    }
    let body = fixture::from_json(&resp.body)?;
    if body != fixture::basic() {
        anyhow::bail!("expected the unmodified payload, got {body}");
    }
    Ok(())
}

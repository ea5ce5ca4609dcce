use bytes::Bytes;
use http::Request;
use http_body_util::Full;
use serde_json::{Value, json};

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Payload shared by the scenarios.
pub fn basic() -> Value {
    json!({
        "str": "string",
        "num": 42,
        "nope": null,
        "arr": [1, "2", 3]
    })
}

pub fn to_msgpack(value: &Value) -> anyhow::Result<Bytes> {
    Ok(Bytes::from(rmp_serde::to_vec(value)?))
}

pub fn from_msgpack(body: &[u8]) -> anyhow::Result<Value> {
    Ok(rmp_serde::from_slice(body)?)
}

pub fn from_json(body: &[u8]) -> anyhow::Result<Value> {
    Ok(serde_json::from_slice(body)?)
}

pub fn get(path: &str, accept: Option<&str>) -> anyhow::Result<Request<Full<Bytes>>> {
    let mut builder = Request::builder()
        .method("GET")
        .uri(path)
        .header("Host", "localhost");
    if let Some(accept) = accept {
        builder = builder.header("Accept", accept);
    }
    Ok(builder.body(Full::new(Bytes::new()))?)
}

pub fn post(
    path: &str,
    content_type: &str,
    accept: Option<&str>,
    body: Bytes,
) -> anyhow::Result<Request<Full<Bytes>>> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header("Host", "localhost")
        .header("Content-Type", content_type);
    if let Some(accept) = accept {
        builder = builder.header("Accept", accept);
    }
    Ok(builder.body(Full::new(body))?)
}

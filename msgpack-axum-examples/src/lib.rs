use msgpack_axum::{TranscodeConfig, TranscodeOptions};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

/// Returns the server address from PORT env var, defaulting to 3000.
pub fn server_addr() -> anyhow::Result<SocketAddr> {
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".into());
    Ok(format!("0.0.0.0:{port}").parse()?)
}

/// Initialise logging. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,msgpack_axum=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Load transcoding settings.
///
/// Reads the JSON file named by `MSGPACK_AXUM_CONFIG` when set, e.g.
///
/// ```json
/// { "mime_type": "application/x-custom-msgpack", "max_message_size": 1048576 }
/// ```
///
/// Missing fields fall back to their defaults; invalid settings fail startup.
pub fn load_config() -> anyhow::Result<TranscodeConfig> {
    let options = match std::env::var("MSGPACK_AXUM_CONFIG") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str::<TranscodeOptions>(&raw)?
        }
        Err(_) => TranscodeOptions::default(),
    };
    Ok(TranscodeConfig::from_options(options)?)
}

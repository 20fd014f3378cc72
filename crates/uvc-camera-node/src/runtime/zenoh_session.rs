use std::sync::Arc;

const DEFAULT_ENDPOINT: &str = "tcp/127.0.0.1:7447";

/// Pick the router endpoint: `ZENOH_ENDPOINT`, then `BUBBALOOP_ZENOH_ENDPOINT`,
/// then the `-e` argument, then the local router.
pub fn resolve_endpoint(
    zenoh_env: Option<String>,
    bubbaloop_env: Option<String>,
    arg: Option<String>,
) -> String {
    zenoh_env
        .or(bubbaloop_env)
        .or(arg)
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
}

/// Open a Zenoh session in client mode.
pub async fn open_zenoh_session(endpoint: &Option<String>) -> anyhow::Result<Arc<zenoh::Session>> {
    let endpoint = resolve_endpoint(
        std::env::var("ZENOH_ENDPOINT").ok(),
        std::env::var("BUBBALOOP_ZENOH_ENDPOINT").ok(),
        endpoint.clone(),
    );
    log::info!("Connecting to Zenoh at: {}", endpoint);

    let mut config = zenoh::Config::default();
    // Frames go through the router; peer mode would bypass it
    config
        .insert_json5("mode", r#""client""#)
        .map_err(|e| anyhow::anyhow!("Failed to set Zenoh mode: {}", e))?;
    config
        .insert_json5("connect/endpoints", &format!(r#"["{}"]"#, endpoint))
        .map_err(|e| anyhow::anyhow!("Failed to set Zenoh endpoint: {}", e))?;
    for key in ["scouting/multicast/enabled", "scouting/gossip/enabled"] {
        config
            .insert_json5(key, "false")
            .map_err(|e| anyhow::anyhow!("Failed to set {}: {}", key, e))?;
    }

    let session = zenoh::open(config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open Zenoh session: {}", e))?;

    log::info!("Connected to Zenoh");
    Ok(Arc::new(session))
}

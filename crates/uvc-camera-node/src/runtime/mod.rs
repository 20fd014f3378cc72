//! Node runtime: the scaffolding every node needs around its own logic.
//!
//! Handles logging, CLI args, config loading, scope/machine resolution, the
//! shutdown channel and the Zenoh session. A node implements [`Node`] and the
//! binary calls `run_node::<MyNode>().await`. Nodes start their own health
//! heartbeat since only they know what healthy means.

mod config;
mod context;
mod health;
mod shutdown;
mod zenoh_session;

pub use config::load_config;
pub use context::NodeContext;
pub use health::{spawn_health_heartbeat, HealthStatus, ProgressProbe, HEARTBEAT_PERIOD};
pub use shutdown::setup_shutdown;
pub use zenoh_session::open_zenoh_session;

use std::path::PathBuf;

/// Behavior of a node hosted by [`run_node`].
#[async_trait::async_trait]
pub trait Node: Send + 'static {
    /// Node-specific configuration type (deserialized from YAML).
    type Config: serde::de::DeserializeOwned + Send + Sync + 'static;

    /// Name used for topic construction and health reporting.
    fn name() -> &'static str;

    /// Called once after the Zenoh session is open and config is loaded.
    async fn init(ctx: &NodeContext, config: &Self::Config) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Runs until `ctx.shutdown_rx` fires.
    async fn run(self, ctx: NodeContext) -> anyhow::Result<()>;
}

#[derive(argh::FromArgs)]
#[argh(description = "UVC camera node")]
struct NodeArgs {
    /// path to configuration file
    #[argh(option, short = 'c', default = "default_config_path()")]
    config: PathBuf,

    /// zenoh endpoint to connect to
    #[argh(option, short = 'e')]
    endpoint: Option<String>,
}

fn default_config_path() -> PathBuf {
    PathBuf::from("config.yaml")
}

/// Host a node until shutdown.
pub async fn run_node<N: Node>() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: NodeArgs = argh::from_env();

    let node_config: N::Config = load_config(&args.config)?;
    log::info!(
        "{}: config loaded from {}",
        N::name(),
        args.config.display()
    );

    let scope = std::env::var("BUBBALOOP_SCOPE").unwrap_or_else(|_| "local".to_string());
    let machine_id = std::env::var("BUBBALOOP_MACHINE_ID")
        .unwrap_or_else(|_| {
            hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| "unknown".to_string())
        })
        .replace('-', "_");
    log::info!("Scope: {}, Machine ID: {}", scope, machine_id);

    let shutdown_tx = setup_shutdown()?;

    let session = open_zenoh_session(&args.endpoint).await?;

    let ctx = NodeContext {
        session: session.clone(),
        scope,
        machine_id,
        shutdown_rx: shutdown_tx.subscribe(),
        shutdown_tx,
    };

    let node = match N::init(&ctx, &node_config).await {
        Ok(node) => node,
        Err(e) => {
            ctx.request_shutdown();
            return Err(e);
        }
    };
    log::info!("{} node initialized", N::name());

    node.run(ctx).await?;

    log::info!("{} node shut down", N::name());
    Ok(())
}

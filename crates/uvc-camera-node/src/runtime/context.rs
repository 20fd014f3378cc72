use std::sync::Arc;
use tokio::sync::watch;

/// Context handed to a node by the runtime.
pub struct NodeContext {
    /// Shared Zenoh session
    pub session: Arc<zenoh::Session>,
    /// Deployment scope (from BUBBALOOP_SCOPE env, default: "local")
    pub scope: String,
    /// Machine identifier (from BUBBALOOP_MACHINE_ID env, default: hostname)
    pub machine_id: String,
    /// Shutdown signal receiver, select! on this in the main loop
    pub shutdown_rx: watch::Receiver<()>,
    /// Lets the node itself stop the process
    pub shutdown_tx: watch::Sender<()>,
}

impl NodeContext {
    /// Build a fully-qualified scoped topic: `bubbaloop/{scope}/{machine_id}/{suffix}`
    pub fn topic(&self, suffix: &str) -> String {
        scoped_topic(&self.scope, &self.machine_id, suffix)
    }

    pub fn request_shutdown(&self) {
        log::info!("Shutdown requested by node");
        self.shutdown_tx.send_replace(());
    }
}

pub(crate) fn scoped_topic(scope: &str, machine_id: &str, suffix: &str) -> String {
    format!("bubbaloop/{}/{}/{}", scope, machine_id, suffix)
}

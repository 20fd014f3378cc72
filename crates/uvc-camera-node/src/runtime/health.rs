use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub const HEARTBEAT_PERIOD: Duration = Duration::from_secs(5);

/// Status reported on each heartbeat tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Ok,
    /// Alive, but no frame went out since the previous tick
    Stalled,
}

impl HealthStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Ok => "ok",
            HealthStatus::Stalled => "stalled",
        }
    }
}

/// Tracks a monotonically increasing counter between heartbeat ticks.
#[derive(Debug, Default)]
pub struct ProgressProbe {
    last: Option<u64>,
}

impl ProgressProbe {
    /// `Ok` on the first tick and whenever `count` moved since the last one.
    pub fn check(&mut self, count: u64) -> HealthStatus {
        let status = match self.last {
            Some(last) if last == count => HealthStatus::Stalled,
            _ => HealthStatus::Ok,
        };
        self.last = Some(count);
        status
    }
}

/// Publish the node's health every [`HEARTBEAT_PERIOD`] on
/// `bubbaloop/{scope}/{machine_id}/health/{node_name}` until shutdown.
pub async fn spawn_health_heartbeat<F>(
    session: Arc<zenoh::Session>,
    scope: &str,
    machine_id: &str,
    node_name: &str,
    mut shutdown_rx: watch::Receiver<()>,
    mut status: F,
) -> anyhow::Result<tokio::task::JoinHandle<()>>
where
    F: FnMut() -> HealthStatus + Send + 'static,
{
    let health_topic = format!("bubbaloop/{}/{}/health/{}", scope, machine_id, node_name);
    log::info!("Health heartbeat: {}", health_topic);
    let publisher = session
        .declare_publisher(health_topic)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create health publisher: {}", e))?;

    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(HEARTBEAT_PERIOD);
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    log::debug!("Health heartbeat stopping");
                    break;
                }
                _ = interval.tick() => {
                    let current = status();
                    if current == HealthStatus::Stalled {
                        log::warn!("No frames published in the last {:?}", HEARTBEAT_PERIOD);
                    }
                    if let Err(e) = publisher.put(current.as_str()).await {
                        log::warn!("Health heartbeat failed: {}", e);
                    }
                }
            }
        }
    });

    Ok(handle)
}

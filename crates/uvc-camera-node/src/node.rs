use crate::config::{Backend, Config, DeviceSelector};
use crate::driver::synthetic::SyntheticCamera;
#[cfg(feature = "v4l2")]
use crate::driver::v4l2::V4l2Camera;
use crate::driver::{CameraDriver, StreamSelection};
use crate::error::{NodeError, Result};
use crate::negotiate::{negotiate, Negotiation};
use crate::publisher::{ImagePublisher, ZenohImagePublisher};
use crate::relay::{FrameRelay, RelayLabels};
use crate::runtime::{spawn_health_heartbeat, Node, NodeContext, ProgressProbe};
use std::sync::Arc;
use tokio::sync::watch;

pub const NODE_NAME: &str = "uvc_camera_node";
pub const IMAGE_TOPIC: &str = "image_raw";

/// UVC camera node: negotiates a stream at construction, then relays every
/// frame the driver delivers until shutdown.
pub struct UvcCameraNode {
    driver: Box<dyn CameraDriver>,
    relay: Arc<FrameRelay>,
    selection: StreamSelection,
}

impl UvcCameraNode {
    /// Validate the configuration, open the device with `open`, register the
    /// relay and negotiate the stream.
    ///
    /// Invalid parameters fail before `open` is called. When the requested
    /// stream is not supported the supported formats are printed, shutdown is
    /// requested on `shutdown_tx` and nothing streams.
    pub fn start<D, F>(
        config: &Config,
        labels: RelayLabels,
        open: F,
        publisher: Box<dyn ImagePublisher>,
        shutdown_tx: &watch::Sender<()>,
    ) -> Result<Self>
    where
        D: CameraDriver + 'static,
        F: FnOnce(&DeviceSelector) -> Result<D>,
    {
        let request = config.stream_request()?;

        let mut driver = open(&request.device)?;

        let relay = Arc::new(FrameRelay::new(labels, config.drop_unmapped_frames, publisher));
        driver.register_frame_callback(relay.clone());

        let selection = match negotiate(&mut driver, &request)? {
            Negotiation::FirstAvailable(selection) | Negotiation::Exact(selection) => selection,
            Negotiation::Unsupported => {
                log::error!(
                    "Requested stream is not supported. \
                     See output below for formats supported by this camera."
                );
                driver.print_supported_formats();
                shutdown_tx.send_replace(());
                return Err(NodeError::StreamUnsupported(format!(
                    "{} {}x{} @ {} fps on {}",
                    request.format, request.width, request.height, request.frame_rate, request.device
                )));
            }
        };
        log::info!("Streaming {} as '{}'", selection, config.frame_id);

        Ok(Self {
            driver: Box::new(driver),
            relay,
            selection,
        })
    }

    pub fn selection(&self) -> StreamSelection {
        self.selection
    }

    pub fn relay(&self) -> &FrameRelay {
        &self.relay
    }

    pub fn stop(&mut self) -> Result<()> {
        self.driver.stop_streaming()?;
        log::info!(
            "Stream stopped: {} published, {} dropped, {} failed",
            self.relay.published(),
            self.relay.dropped(),
            self.relay.failed()
        );
        Ok(())
    }

    /// Block until shutdown fires, then stop the stream.
    pub async fn wait_for_shutdown(mut self, mut shutdown_rx: watch::Receiver<()>) -> Result<()> {
        let _ = shutdown_rx.changed().await;
        log::info!("Shutting down camera...");
        self.stop()
    }
}

/// Open the device with the configured backend.
pub fn open_driver(config: &Config, device: &DeviceSelector) -> Result<Box<dyn CameraDriver>> {
    log::info!("Opening {} with the {:?} backend", device, config.backend);
    match config.backend {
        Backend::Synthetic => Ok(Box::new(SyntheticCamera::open(
            device,
            &config.synthetic_modes,
        )?)),
        Backend::V4l2 => open_v4l2(device),
    }
}

#[cfg(feature = "v4l2")]
fn open_v4l2(device: &DeviceSelector) -> Result<Box<dyn CameraDriver>> {
    Ok(Box::new(V4l2Camera::open(device)?))
}

#[cfg(not(feature = "v4l2"))]
fn open_v4l2(device: &DeviceSelector) -> Result<Box<dyn CameraDriver>> {
    Err(NodeError::Device(format!(
        "cannot open {}: built without the `v4l2` feature",
        device
    )))
}

#[async_trait::async_trait]
impl Node for UvcCameraNode {
    type Config = Config;

    fn name() -> &'static str {
        NODE_NAME
    }

    async fn init(ctx: &NodeContext, config: &Config) -> anyhow::Result<Self> {
        let key = ctx.topic(&format!("{}/{}", NODE_NAME, IMAGE_TOPIC));
        let publisher = ZenohImagePublisher::declare(&ctx.session, &key).await?;
        let labels = RelayLabels {
            frame_id: config.frame_id.clone(),
            machine_id: ctx.machine_id.clone(),
            scope: ctx.scope.clone(),
        };
        let node = Self::start(
            config,
            labels,
            |device| open_driver(config, device),
            Box::new(publisher),
            &ctx.shutdown_tx,
        )?;
        Ok(node)
    }

    async fn run(self, ctx: NodeContext) -> anyhow::Result<()> {
        let relay = self.relay.clone();
        let mut probe = ProgressProbe::default();
        let _health_handle = spawn_health_heartbeat(
            ctx.session.clone(),
            &ctx.scope,
            &ctx.machine_id,
            NODE_NAME,
            ctx.shutdown_tx.subscribe(),
            move || probe.check(relay.published()),
        )
        .await?;

        self.wait_for_shutdown(ctx.shutdown_rx).await?;
        Ok(())
    }
}

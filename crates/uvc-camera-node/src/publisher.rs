use crate::error::{NodeError, Result};
use crate::messages::RawImage;
use prost::Message;
use std::sync::Arc;
use zenoh::pubsub::Publisher;
use zenoh::Wait;

/// Outbound channel for image records.
///
/// `publish` is called from the driver's capture thread and must not block
/// on an async runtime.
pub trait ImagePublisher: Send + Sync + 'static {
    fn publish(&self, image: RawImage) -> Result<()>;
}

/// Publishes protobuf-encoded `RawImage`s on a Zenoh key expression.
pub struct ZenohImagePublisher {
    key: String,
    publisher: Publisher<'static>,
}

impl ZenohImagePublisher {
    pub async fn declare(session: &Arc<zenoh::Session>, key: &str) -> Result<Self> {
        let publisher = session
            .declare_publisher(key.to_string())
            .await
            .map_err(|e| NodeError::Zenoh(format!("Failed to declare publisher '{}': {}", key, e)))?;
        log::info!("Publishing {} on '{}'", RawImage::TYPE_NAME, key);
        Ok(Self {
            key: key.to_string(),
            publisher,
        })
    }
}

impl ImagePublisher for ZenohImagePublisher {
    fn publish(&self, image: RawImage) -> Result<()> {
        self.publisher
            .put(image.encode_to_vec())
            .wait()
            .map_err(|e| NodeError::Publish(format!("{}: {}", self.key, e)))
    }
}

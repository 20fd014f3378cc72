//! USB Video Class camera node for Bubbaloop.
//!
//! Opens a UVC camera, negotiates a stream from the configured format, size
//! and frame rate, and republishes every frame as a `RawImage` on
//! `bubbaloop/{scope}/{machine_id}/uvc_camera_node/image_raw`.
//!
//! Frames are not decoded: MJPEG and H264 payloads go out as-is with an empty
//! encoding tag.

pub mod config;
pub mod driver;
pub mod error;
pub mod format;
pub mod messages;
pub mod negotiate;
pub mod node;
pub mod publisher;
pub mod relay;
pub mod runtime;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{Backend, Config, ConfigError, DeviceSelector, ModeConfig, StreamRequest};
pub use driver::{CameraDriver, FrameSink, StreamMode, StreamSelection, UvcFrame};
pub use error::{NodeError, Result};
pub use format::{FrameFormat, StreamFormat};
pub use messages::{Header, RawImage};
pub use negotiate::{negotiate, Negotiation};
pub use node::{open_driver, UvcCameraNode, IMAGE_TOPIC, NODE_NAME};
pub use publisher::{ImagePublisher, ZenohImagePublisher};
pub use relay::{frame_to_image, FrameRelay, RelayLabels};

//! Camera driver abstraction.
//!
//! A driver owns the device and its capture thread. The node only registers a
//! [`FrameSink`], picks a stream and later stops it; frames flow from the
//! driver's thread straight into the sink.

mod capture;
pub mod synthetic;
#[cfg_attr(not(feature = "v4l2"), allow(dead_code))]
mod sysfs;
#[cfg(feature = "v4l2")]
pub mod v4l2;

use crate::error::Result;
use crate::format::{FrameFormat, StreamFormat};
use std::fmt;
use std::sync::Arc;

/// A frame borrowed from the driver for the duration of one callback.
#[derive(Debug, Clone, Copy)]
pub struct UvcFrame<'a> {
    pub width: u32,
    pub height: u32,
    /// Bytes per row; 0 for compressed payloads
    pub step: u32,
    pub format: FrameFormat,
    pub data: &'a [u8],
    pub sequence: u32,
    /// Capture timestamp, nanoseconds since the Unix epoch
    pub capture_time_ns: u64,
}

/// Receives frames from a driver. Called on the driver's capture thread.
pub trait FrameSink: Send + Sync + 'static {
    fn on_frame(&self, frame: &UvcFrame<'_>);
}

/// One format/size combination a device can stream, with its frame rates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMode {
    pub format: FrameFormat,
    pub width: u32,
    pub height: u32,
    pub fps: Vec<u32>,
}

impl fmt::Display for StreamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rates: Vec<String> = self.fps.iter().map(|r| r.to_string()).collect();
        write!(
            f,
            "{} {}x{} @ [{}] fps",
            self.format,
            self.width,
            self.height,
            rates.join(", ")
        )
    }
}

/// The concrete stream a driver settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSelection {
    pub format: FrameFormat,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl fmt::Display for StreamSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}x{} @ {} fps",
            self.format, self.width, self.height, self.fps
        )
    }
}

/// Operations the node needs from a UVC camera.
pub trait CameraDriver: Send {
    /// Sink that receives every captured frame. Replaces any earlier sink.
    fn register_frame_callback(&mut self, sink: Arc<dyn FrameSink>);

    /// Modes the device advertises, in device order.
    fn supported_formats(&self) -> Vec<StreamMode>;

    /// Start streaming with the first mode the device advertises.
    fn start_streaming(&mut self) -> Result<StreamSelection>;

    fn format_is_supported(&self, format: StreamFormat, width: u32, height: u32, fps: u32) -> bool {
        find_mode(&self.supported_formats(), format, width, height, fps).is_some()
    }

    fn start_streaming_with_format(
        &mut self,
        format: StreamFormat,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<StreamSelection>;

    fn stop_streaming(&mut self) -> Result<()>;

    fn print_supported_formats(&self) {
        let modes = self.supported_formats();
        if modes.is_empty() {
            log::info!("Device advertises no stream formats");
        }
        for mode in modes {
            log::info!("  {}", mode);
        }
    }
}

impl<D: CameraDriver + ?Sized> CameraDriver for Box<D> {
    fn register_frame_callback(&mut self, sink: Arc<dyn FrameSink>) {
        (**self).register_frame_callback(sink)
    }

    fn supported_formats(&self) -> Vec<StreamMode> {
        (**self).supported_formats()
    }

    fn start_streaming(&mut self) -> Result<StreamSelection> {
        (**self).start_streaming()
    }

    fn format_is_supported(&self, format: StreamFormat, width: u32, height: u32, fps: u32) -> bool {
        (**self).format_is_supported(format, width, height, fps)
    }

    fn start_streaming_with_format(
        &mut self,
        format: StreamFormat,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<StreamSelection> {
        (**self).start_streaming_with_format(format, width, height, fps)
    }

    fn stop_streaming(&mut self) -> Result<()> {
        (**self).stop_streaming()
    }

    fn print_supported_formats(&self) {
        (**self).print_supported_formats()
    }
}

/// First advertised mode at its first advertised rate.
pub fn first_mode(modes: &[StreamMode]) -> Option<StreamSelection> {
    modes.iter().find_map(|mode| {
        mode.fps.first().map(|&fps| StreamSelection {
            format: mode.format,
            width: mode.width,
            height: mode.height,
            fps,
        })
    })
}

/// Exact match: format family, width, height and frame rate must all agree.
/// A zero in the request is compared literally.
pub fn find_mode(
    modes: &[StreamMode],
    format: StreamFormat,
    width: u32,
    height: u32,
    fps: u32,
) -> Option<StreamSelection> {
    modes
        .iter()
        .filter(|mode| format.matches(mode.format) && mode.width == width && mode.height == height)
        .find(|mode| mode.fps.contains(&fps))
        .map(|mode| StreamSelection {
            format: mode.format,
            width: mode.width,
            height: mode.height,
            fps,
        })
}

/// Whole frames per second for a frame interval of `numerator / denominator`
/// seconds, rounded to nearest so NTSC rates (1001/30000) list as 30.
pub fn fps_from_interval(numerator: u32, denominator: u32) -> Option<u32> {
    if numerator == 0 {
        return None;
    }
    let rate = (u64::from(denominator) + u64::from(numerator) / 2) / u64::from(numerator);
    u32::try_from(rate).ok().filter(|&r| r > 0)
}

pub(crate) fn now_ns() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

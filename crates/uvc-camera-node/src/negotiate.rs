//! Stream negotiation: pick what the camera streams, once, at startup.

use crate::config::StreamRequest;
use crate::driver::{CameraDriver, StreamSelection};
use crate::error::Result;
use crate::format::StreamFormat;

/// Result of negotiating a stream with the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Negotiation {
    /// Nothing was constrained; the device's first mode is streaming.
    FirstAvailable(StreamSelection),
    /// The requested mode exists and is streaming.
    Exact(StreamSelection),
    /// The requested mode does not exist; nothing is streaming.
    Unsupported,
}

/// True only when format, width, height and frame rate are all unconstrained.
///
/// A partially constrained request (say width 0 with 15 fps) still goes
/// through the exact-match path, where the zero is compared literally.
pub fn wants_first_available(request: &StreamRequest) -> bool {
    request.format == StreamFormat::Any
        && request.width == 0
        && request.height == 0
        && request.frame_rate == 0
}

/// Start streaming according to `request`.
pub fn negotiate<D: CameraDriver + ?Sized>(
    driver: &mut D,
    request: &StreamRequest,
) -> Result<Negotiation> {
    if wants_first_available(request) {
        log::info!("No frame parameters specified. Using first available stream type.");
        let selection = driver.start_streaming()?;
        return Ok(Negotiation::FirstAvailable(selection));
    }

    log::info!(
        "Attempting to acquire stream {} {}x{} @ {} fps",
        request.format,
        request.width,
        request.height,
        request.frame_rate
    );

    if !driver.format_is_supported(request.format, request.width, request.height, request.frame_rate) {
        return Ok(Negotiation::Unsupported);
    }

    log::info!("Requested stream parameters available! Connecting...");
    let selection = driver.start_streaming_with_format(
        request.format,
        request.width,
        request.height,
        request.frame_rate,
    )?;
    Ok(Negotiation::Exact(selection))
}

//! Synthetic camera backend.
//!
//! Advertises a configurable list of modes and generates a moving gradient on
//! a capture thread, so the node can run end to end without hardware.

use super::capture::{run_capture, FrameSource};
use super::{find_mode, first_mode, CameraDriver, FrameSink, StreamMode, StreamSelection};
use crate::config::{ConfigError, DeviceSelector, ModeConfig};
use crate::error::{NodeError, Result};
use crate::format::{FrameFormat, StreamFormat};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Widest pixel any generated frame uses (RGB/BGR).
const MAX_BYTES_PER_PIXEL: u32 = 3;

struct CaptureThread {
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

pub struct SyntheticCamera {
    device: DeviceSelector,
    modes: Vec<StreamMode>,
    sink: Option<Arc<dyn FrameSink>>,
    capture: Option<CaptureThread>,
}

impl SyntheticCamera {
    /// Fails when a mode's frame would not fit in a `u32` byte count.
    pub fn open(device: &DeviceSelector, modes: &[ModeConfig]) -> Result<Self> {
        let modes = modes
            .iter()
            .map(|m| -> Result<StreamMode> {
                check_frame_size(m)?;
                Ok(StreamMode {
                    format: m.format,
                    width: m.width,
                    height: m.height,
                    fps: m.fps.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        log::info!("Opened synthetic camera for {}", device);
        Ok(Self {
            device: device.clone(),
            modes,
            sink: None,
            capture: None,
        })
    }

    pub fn is_streaming(&self) -> bool {
        self.capture.is_some()
    }

    fn start(&mut self, selection: StreamSelection) -> Result<StreamSelection> {
        if self.capture.is_some() {
            return Err(NodeError::Stream("stream already running".to_string()));
        }
        let sink = self
            .sink
            .clone()
            .ok_or_else(|| NodeError::Stream("no frame callback registered".to_string()))?;

        let running = Arc::new(AtomicBool::new(true));
        let handle = std::thread::Builder::new()
            .name("synthetic-capture".to_string())
            .spawn({
                let running = running.clone();
                move || {
                    let mut source = PatternSource::new(selection);
                    let step = source.step;
                    if let Err(e) = run_capture(&mut source, selection, step, sink.as_ref(), &running) {
                        log::error!("Synthetic capture stopped: {}", e);
                    }
                }
            })?;

        log::info!("Synthetic camera {} streaming {}", self.device, selection);
        self.capture = Some(CaptureThread { running, handle });
        Ok(selection)
    }
}

impl CameraDriver for SyntheticCamera {
    fn register_frame_callback(&mut self, sink: Arc<dyn FrameSink>) {
        self.sink = Some(sink);
    }

    fn supported_formats(&self) -> Vec<StreamMode> {
        self.modes.clone()
    }

    fn start_streaming(&mut self) -> Result<StreamSelection> {
        let selection = first_mode(&self.modes)
            .ok_or_else(|| NodeError::Stream("device advertises no stream modes".to_string()))?;
        self.start(selection)
    }

    fn start_streaming_with_format(
        &mut self,
        format: StreamFormat,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<StreamSelection> {
        let selection = find_mode(&self.modes, format, width, height, fps).ok_or_else(|| {
            NodeError::StreamUnsupported(format!("{} {}x{} @ {} fps", format, width, height, fps))
        })?;
        self.start(selection)
    }

    fn stop_streaming(&mut self) -> Result<()> {
        if let Some(capture) = self.capture.take() {
            capture.running.store(false, Ordering::Relaxed);
            capture
                .handle
                .join()
                .map_err(|_| NodeError::Stream("capture thread panicked".to_string()))?;
            log::info!("Synthetic camera {} stopped", self.device);
        }
        Ok(())
    }
}

impl Drop for SyntheticCamera {
    fn drop(&mut self) {
        let _ = self.stop_streaming();
    }
}

fn check_frame_size(mode: &ModeConfig) -> Result<()> {
    let fits = mode
        .width
        .checked_mul(MAX_BYTES_PER_PIXEL)
        .and_then(|row| row.checked_mul(mode.height))
        .is_some();
    if !fits {
        return Err(ConfigError::InvalidParameter(format!(
            "synthetic mode {} {}x{} is too large",
            mode.format, mode.width, mode.height
        ))
        .into());
    }
    Ok(())
}

/// Paced generator of a moving gradient, or of an opaque JPEG-framed payload
/// for compressed formats.
struct PatternSource {
    selection: StreamSelection,
    period: Duration,
    // time left until the next frame is due
    remaining: Duration,
    step: u32,
    frame: u32,
    buf: Vec<u8>,
}

impl PatternSource {
    fn new(selection: StreamSelection) -> Self {
        let format = selection.format;
        let step = match format.packed_step(selection.width) {
            Some(step) => step,
            None if format == FrameFormat::Nv12 => selection.width,
            None => 0,
        };
        let period = Duration::from_secs(1) / selection.fps.max(1);
        Self {
            selection,
            period,
            remaining: period,
            step,
            frame: 0,
            buf: Vec::new(),
        }
    }

    fn render(&mut self) {
        let StreamSelection {
            format,
            width,
            height,
            ..
        } = self.selection;
        let shift = (self.frame % 256) as usize;
        self.buf.clear();

        if format.packed_step(width).is_some() {
            let step = self.step as usize;
            let len = step * height as usize;
            self.buf.extend((0..len).map(|i| ((i % step + shift) % 256) as u8));
        } else if format == FrameFormat::Nv12 {
            let len = width as usize * height as usize * 3 / 2;
            self.buf.extend((0..len).map(|i| ((i + shift) % 256) as u8));
        } else {
            self.buf.extend([0xFF, 0xD8]);
            self.buf.extend((0..64).map(|i| ((i + shift) % 256) as u8));
            self.buf.extend([0xFF, 0xD9]);
        }
        self.frame = self.frame.wrapping_add(1);
    }
}

impl FrameSource for PatternSource {
    fn next_frame(&mut self, timeout: Duration) -> std::io::Result<Option<&[u8]>> {
        if self.remaining > timeout {
            std::thread::sleep(timeout);
            self.remaining -= timeout;
            return Ok(None);
        }
        std::thread::sleep(self.remaining);
        self.remaining = self.period;
        self.render();
        Ok(Some(self.buf.as_slice()))
    }
}

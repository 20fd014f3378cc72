//! V4L2 backend for uvcvideo devices.
//!
//! The USB vendor/product/serial of each `/dev/videoN` node is read from
//! sysfs; the first capture node matching the selector is opened. Streaming
//! runs on a capture thread that owns the mmap stream and shares the device
//! handle with the camera, so a failed start leaves the camera reusable.

use super::capture::{run_capture, FrameSource};
use super::sysfs::{read_usb_identity, usb_device_dir};
use super::{
    find_mode, first_mode, fps_from_interval, CameraDriver, FrameSink, StreamMode, StreamSelection,
};
use crate::config::DeviceSelector;
use crate::error::{NodeError, Result};
use crate::format::{FrameFormat, StreamFormat};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use v4l::buffer::Type;
use v4l::device::Handle;
use v4l::frameinterval::FrameIntervalEnum;
use v4l::framesize::FrameSizeEnum;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::capture::Parameters;
use v4l::video::Capture;

const BUFFER_COUNT: u32 = 4;

/// Deadline for the first frame after STREAMON.
const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(5);

struct CaptureThread {
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

pub struct V4l2Camera {
    path: PathBuf,
    device: Arc<Device>,
    modes: Vec<StreamMode>,
    sink: Option<Arc<dyn FrameSink>>,
    capture: Option<CaptureThread>,
}

impl V4l2Camera {
    /// Open the first video capture node whose USB ids match `selector`.
    pub fn open(selector: &DeviceSelector) -> Result<Self> {
        for node in v4l::context::enum_devices() {
            let Some(usb) = usb_device_dir(node.index()).and_then(|dir| read_usb_identity(&dir))
            else {
                continue;
            };
            if !selector.matches(usb.vendor_id, usb.product_id, usb.serial.as_deref()) {
                continue;
            }

            let device = match Device::with_path(node.path()) {
                Ok(d) => d,
                Err(e) => {
                    log::warn!("Cannot open {}: {}", node.path().display(), e);
                    continue;
                }
            };
            let is_capture = device
                .query_caps()
                .map(|caps| caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE))
                .unwrap_or(false);
            if !is_capture {
                log::debug!("Skipping {} (no video capture)", node.path().display());
                continue;
            }

            let modes = enumerate_modes(&device)?;
            log::info!(
                "Opened {} for {} ({} stream modes)",
                node.path().display(),
                selector,
                modes.len()
            );
            return Ok(Self {
                path: node.path().to_path_buf(),
                device: Arc::new(device),
                modes,
                sink: None,
                capture: None,
            });
        }

        Err(NodeError::Device(format!(
            "no accessible UVC capture device matching {}",
            selector
        )))
    }

    fn start(&mut self, selection: StreamSelection) -> Result<StreamSelection> {
        if self.capture.is_some() {
            return Err(NodeError::Stream("stream already running".to_string()));
        }
        let sink = self
            .sink
            .clone()
            .ok_or_else(|| NodeError::Stream("no frame callback registered".to_string()))?;

        let step = self.configure(selection)?;

        let running = Arc::new(AtomicBool::new(true));
        let handle = std::thread::Builder::new()
            .name("v4l2-capture".to_string())
            .spawn({
                let running = running.clone();
                let device = self.device.clone();
                let path = self.path.clone();
                move || {
                    let result = MmapSource::new(&device).and_then(|mut source| {
                        run_capture(&mut source, selection, step, sink.as_ref(), &running)
                    });
                    if let Err(e) = result {
                        log::error!("Capture on {} stopped: {}", path.display(), e);
                    }
                }
            })?;

        log::info!("{} streaming {}", self.path.display(), selection);
        self.capture = Some(CaptureThread { running, handle });
        Ok(selection)
    }

    /// Apply `selection` to the device and return the row stride frames will
    /// carry.
    fn configure(&self, selection: StreamSelection) -> Result<u32> {
        let requested = v4l::Format::new(
            selection.width,
            selection.height,
            v4l::FourCC::new(&selection.format.fourcc()),
        );
        let active = self.device.set_format(&requested)?;
        if !format_accepted(&requested, &active) {
            return Err(NodeError::Stream(format!(
                "device {} refused {}",
                self.path.display(),
                selection
            )));
        }
        if let Err(e) = self.device.set_params(&Parameters::with_fps(selection.fps)) {
            log::warn!("Failed to set {} fps on {}: {}", selection.fps, self.path.display(), e);
        }

        Ok(if selection.format.is_compressed() {
            0
        } else {
            active.stride
        })
    }
}

/// The driver may adjust a requested format; anything but an exact echo of
/// size and fourcc is a refusal.
fn format_accepted(requested: &v4l::Format, active: &v4l::Format) -> bool {
    active.width == requested.width
        && active.height == requested.height
        && active.fourcc == requested.fourcc
}

impl CameraDriver for V4l2Camera {
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
            log::info!("{} stopped", self.path.display());
        }
        Ok(())
    }
}

impl Drop for V4l2Camera {
    fn drop(&mut self) {
        let _ = self.stop_streaming();
    }
}

/// Memory-mapped capture stream that never blocks past the caller's timeout.
struct MmapSource {
    stream: MmapStream<'static>,
    handle: Arc<Handle>,
    streaming: bool,
}

impl MmapSource {
    fn new(device: &Device) -> io::Result<Self> {
        let mut stream = MmapStream::with_buffers(device, Type::VideoCapture, BUFFER_COUNT)?;
        stream.set_timeout(FIRST_FRAME_TIMEOUT);
        Ok(Self {
            handle: stream.handle(),
            stream,
            streaming: false,
        })
    }
}

impl FrameSource for MmapSource {
    fn next_frame(&mut self, timeout: Duration) -> io::Result<Option<&[u8]>> {
        if self.streaming {
            // next() re-queues the previous buffer before dequeuing, so it may
            // only be called once a filled buffer is waiting
            let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
            if self.handle.poll(libc::POLLIN, millis)? == 0 {
                return Ok(None);
            }
        }
        // the first call queues every buffer and starts the stream
        self.streaming = true;
        let (buf, meta) = CaptureStream::next(&mut self.stream)?;
        let used = (meta.bytesused as usize).min(buf.len());
        Ok(Some(&buf[..used]))
    }
}

fn enumerate_modes(device: &Device) -> Result<Vec<StreamMode>> {
    let mut modes = Vec::new();
    for description in device.enum_formats()? {
        let Some(format) = FrameFormat::from_fourcc(&description.fourcc.repr) else {
            log::debug!("Ignoring unknown pixel format {}", description.fourcc);
            continue;
        };
        for size in device.enum_framesizes(description.fourcc)? {
            let FrameSizeEnum::Discrete(discrete) = size.size else {
                continue;
            };
            let mut fps = Vec::new();
            for interval in
                device.enum_frameintervals(description.fourcc, discrete.width, discrete.height)?
            {
                let FrameIntervalEnum::Discrete(fraction) = interval.interval else {
                    continue;
                };
                if let Some(rate) = fps_from_interval(fraction.numerator, fraction.denominator) {
                    if !fps.contains(&rate) {
                        fps.push(rate);
                    }
                }
            }
            modes.push(StreamMode {
                format,
                width: discrete.width,
                height: discrete.height,
                fps,
            });
        }
    }
    Ok(modes)
}

//! In-memory driver and publisher used by unit tests.

use crate::driver::{find_mode, first_mode, CameraDriver, FrameSink, StreamMode, StreamSelection, UvcFrame};
use crate::error::{NodeError, Result};
use crate::format::{FrameFormat, StreamFormat};
use crate::messages::RawImage;
use crate::publisher::ImagePublisher;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct CollectingPublisher {
    images: Arc<Mutex<Vec<RawImage>>>,
    fail: bool,
}

impl CollectingPublisher {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn images(&self) -> Vec<RawImage> {
        self.images.lock().unwrap().clone()
    }
}

impl ImagePublisher for CollectingPublisher {
    fn publish(&self, image: RawImage) -> Result<()> {
        if self.fail {
            return Err(NodeError::Publish("transport down".to_string()));
        }
        self.images.lock().unwrap().push(image);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    RegisterFrameCallback,
    StartStreaming,
    FormatIsSupported(StreamFormat, u32, u32, u32),
    StartStreamingWithFormat(StreamFormat, u32, u32, u32),
    StopStreaming,
    PrintSupportedFormats,
}

/// Driver that records every call and streams only when told to `emit`.
#[derive(Clone)]
pub struct MockDriver {
    modes: Vec<StreamMode>,
    calls: Arc<Mutex<Vec<DriverCall>>>,
    sink: Arc<Mutex<Option<Arc<dyn FrameSink>>>>,
}

impl MockDriver {
    pub fn new(modes: Vec<StreamMode>) -> Self {
        Self {
            modes,
            calls: Arc::default(),
            sink: Arc::default(),
        }
    }

    pub fn webcam() -> Self {
        Self::new(vec![
            StreamMode {
                format: FrameFormat::Yuyv,
                width: 640,
                height: 480,
                fps: vec![30, 15],
            },
            StreamMode {
                format: FrameFormat::Mjpeg,
                width: 1280,
                height: 720,
                fps: vec![30],
            },
        ])
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn emit(&self, frame: &UvcFrame<'_>) {
        if let Some(sink) = self.sink.lock().unwrap().as_ref() {
            sink.on_frame(frame);
        }
    }

    fn record(&self, call: DriverCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl CameraDriver for MockDriver {
    fn register_frame_callback(&mut self, sink: Arc<dyn FrameSink>) {
        self.record(DriverCall::RegisterFrameCallback);
        *self.sink.lock().unwrap() = Some(sink);
    }

    fn supported_formats(&self) -> Vec<StreamMode> {
        self.modes.clone()
    }

    fn start_streaming(&mut self) -> Result<StreamSelection> {
        self.record(DriverCall::StartStreaming);
        first_mode(&self.modes).ok_or_else(|| NodeError::Stream("no modes".to_string()))
    }

    fn format_is_supported(&self, format: StreamFormat, width: u32, height: u32, fps: u32) -> bool {
        self.record(DriverCall::FormatIsSupported(format, width, height, fps));
        find_mode(&self.modes, format, width, height, fps).is_some()
    }

    fn start_streaming_with_format(
        &mut self,
        format: StreamFormat,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<StreamSelection> {
        self.record(DriverCall::StartStreamingWithFormat(format, width, height, fps));
        find_mode(&self.modes, format, width, height, fps)
            .ok_or_else(|| NodeError::StreamUnsupported(format.to_string()))
    }

    fn stop_streaming(&mut self) -> Result<()> {
        self.record(DriverCall::StopStreaming);
        Ok(())
    }

    fn print_supported_formats(&self) {
        self.record(DriverCall::PrintSupportedFormats);
    }
}

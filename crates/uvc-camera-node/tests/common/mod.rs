//! Test helpers for node integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;
use uvc_camera_node::{ImagePublisher, RawImage, RelayLabels, Result};

/// Publisher that keeps every image in memory
#[derive(Clone, Default)]
pub struct MemoryPublisher {
    images: Arc<Mutex<Vec<RawImage>>>,
}

impl MemoryPublisher {
    pub fn images(&self) -> Vec<RawImage> {
        self.images.lock().unwrap().clone()
    }

    /// Poll until at least `count` images arrived or `timeout` elapsed
    pub fn wait_for(&self, count: usize, timeout: Duration) -> Vec<RawImage> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            let images = self.images();
            if images.len() >= count || std::time::Instant::now() >= deadline {
                return images;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}

impl ImagePublisher for MemoryPublisher {
    fn publish(&self, image: RawImage) -> Result<()> {
        self.images.lock().unwrap().push(image);
        Ok(())
    }
}

pub fn labels(frame_id: &str) -> RelayLabels {
    RelayLabels {
        frame_id: frame_id.to_string(),
        machine_id: "test_machine".to_string(),
        scope: "test".to_string(),
    }
}

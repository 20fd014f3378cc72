//! Frame relay: turns each driver frame into a published `RawImage`.

use crate::driver::{now_ns, FrameSink, UvcFrame};
use crate::format::FrameFormat;
use crate::messages::{Header, RawImage};
use crate::publisher::ImagePublisher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Labels copied onto every published header.
#[derive(Debug, Clone, Default)]
pub struct RelayLabels {
    pub frame_id: String,
    pub machine_id: String,
    pub scope: String,
}

/// Why a frame was not published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Payload length disagrees with `height * step`
    Malformed { expected: usize, actual: usize },
    /// No encoding tag exists and the relay is configured to drop such frames
    Unmapped(FrameFormat),
}

/// Build the outbound record for one frame.
///
/// Dimensions and stride are copied verbatim and the payload byte for byte;
/// the pixel format only selects the encoding label.
pub fn frame_to_image(frame: &UvcFrame<'_>, labels: &RelayLabels) -> RawImage {
    RawImage {
        header: Some(Header {
            acq_time: frame.capture_time_ns,
            pub_time: now_ns(),
            sequence: frame.sequence,
            frame_id: labels.frame_id.clone(),
            machine_id: labels.machine_id.clone(),
            scope: labels.scope.clone(),
        }),
        width: frame.width,
        height: frame.height,
        encoding: frame.format.encoding().unwrap_or_default().to_string(),
        step: frame.step,
        data: frame.data.to_vec(),
    }
}

/// Check a frame before relaying it.
pub fn validate(frame: &UvcFrame<'_>, drop_unmapped: bool) -> Result<(), DropReason> {
    if frame.format.encoding().is_none() {
        if drop_unmapped {
            return Err(DropReason::Unmapped(frame.format));
        }
        // compressed/planar payloads carry their own length
        return Ok(());
    }
    let expected = frame.height as usize * frame.step as usize;
    if frame.data.len() != expected {
        return Err(DropReason::Malformed {
            expected,
            actual: frame.data.len(),
        });
    }
    Ok(())
}

/// Frame sink that republishes every frame through an [`ImagePublisher`].
pub struct FrameRelay {
    labels: RelayLabels,
    drop_unmapped: bool,
    publisher: Box<dyn ImagePublisher>,
    started: Instant,
    published: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
    // bit per FrameFormat already warned about
    unmapped_warned: AtomicU64,
    last_stats_ms: AtomicU64,
}

impl FrameRelay {
    pub fn new(labels: RelayLabels, drop_unmapped: bool, publisher: Box<dyn ImagePublisher>) -> Self {
        Self {
            labels,
            drop_unmapped,
            publisher,
            started: Instant::now(),
            published: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            unmapped_warned: AtomicU64::new(0),
            last_stats_ms: AtomicU64::new(0),
        }
    }

    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Warn about `format` having no encoding tag. Returns whether this call
    /// emitted the warning, which happens once per format.
    fn warn_unmapped_once(&self, format: FrameFormat) -> bool {
        let bit = 1u64 << format as u64;
        let first = self.unmapped_warned.fetch_or(bit, Ordering::Relaxed) & bit == 0;
        if first {
            log::warn!(
                "[{}] {} frames have no encoding tag; publishing with empty encoding",
                self.labels.frame_id,
                format
            );
        }
        first
    }

    /// Claim the stats slot at `now_ms` (since the relay started). At most one
    /// caller wins per second.
    fn stats_due(&self, now_ms: u64) -> bool {
        let last = self.last_stats_ms.load(Ordering::Relaxed);
        if now_ms.saturating_sub(last) < 1000 {
            return false;
        }
        self.last_stats_ms
            .compare_exchange(last, now_ms, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
    }

    fn log_stats(&self, frame: &UvcFrame<'_>) {
        if self.stats_due(self.started.elapsed().as_millis() as u64) {
            log::info!(
                "[{}] frame {}, {} published, {} dropped, {} failed ({}x{} {}, {} bytes)",
                self.labels.frame_id,
                frame.sequence,
                self.published(),
                self.dropped(),
                self.failed(),
                frame.width,
                frame.height,
                frame.format,
                frame.data.len()
            );
        }
    }
}

impl FrameSink for FrameRelay {
    fn on_frame(&self, frame: &UvcFrame<'_>) {
        match validate(frame, self.drop_unmapped) {
            Ok(()) => {}
            Err(DropReason::Malformed { expected, actual }) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::warn!(
                    "[{}] Dropping malformed {} frame {}: {} bytes, expected {} ({} rows x {} step)",
                    self.labels.frame_id,
                    frame.format,
                    frame.sequence,
                    actual,
                    expected,
                    frame.height,
                    frame.step
                );
                return;
            }
            Err(DropReason::Unmapped(format)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::debug!("[{}] Dropping unmapped {} frame", self.labels.frame_id, format);
                return;
            }
        }

        if frame.format.encoding().is_none() {
            self.warn_unmapped_once(frame.format);
        }

        let image = frame_to_image(frame, &self.labels);
        match self.publisher.publish(image) {
            Ok(()) => {
                self.published.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                log::warn!("[{}] Publish failed: {}", self.labels.frame_id, e);
            }
        }

        self.log_stats(frame);
    }
}

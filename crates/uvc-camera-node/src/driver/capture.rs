//! Capture loop shared by the driver backends.

use super::{now_ns, FrameSink, StreamSelection, UvcFrame};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Longest a capture thread waits for a frame before re-checking whether it
/// should keep running.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Raw frame payloads, pulled from a capture thread.
pub(crate) trait FrameSource {
    /// Wait up to `timeout` for the next payload. `Ok(None)` means nothing
    /// arrived in time.
    fn next_frame(&mut self, timeout: Duration) -> io::Result<Option<&[u8]>>;
}

/// Pull payloads from `source` into `sink` until `running` is cleared or the
/// source fails. Sequence numbers count delivered frames only.
pub(crate) fn run_capture<S: FrameSource + ?Sized>(
    source: &mut S,
    selection: StreamSelection,
    step: u32,
    sink: &dyn FrameSink,
    running: &AtomicBool,
) -> io::Result<()> {
    let mut sequence: u32 = 0;
    while running.load(Ordering::Relaxed) {
        let Some(data) = source.next_frame(POLL_INTERVAL)? else {
            continue;
        };
        sink.on_frame(&UvcFrame {
            width: selection.width,
            height: selection.height,
            step,
            format: selection.format,
            data,
            sequence,
            capture_time_ns: now_ns(),
        });
        sequence = sequence.wrapping_add(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FrameFormat;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    enum Step {
        Frame(u8),
        Idle,
        Fail,
    }

    /// Plays back `steps`, then idles and clears `running` once they run out.
    struct Scripted<'a> {
        steps: VecDeque<Step>,
        running: &'a AtomicBool,
        buf: Vec<u8>,
        calls: usize,
    }

    impl<'a> Scripted<'a> {
        fn new(steps: Vec<Step>, running: &'a AtomicBool) -> Self {
            Self {
                steps: steps.into(),
                running,
                buf: Vec::new(),
                calls: 0,
            }
        }
    }

    impl FrameSource for Scripted<'_> {
        fn next_frame(&mut self, _timeout: Duration) -> io::Result<Option<&[u8]>> {
            self.calls += 1;
            match self.steps.pop_front() {
                Some(Step::Frame(value)) => {
                    self.buf = vec![value; 4];
                    Ok(Some(self.buf.as_slice()))
                }
                Some(Step::Idle) => Ok(None),
                Some(Step::Fail) => Err(io::Error::new(io::ErrorKind::Other, "device gone")),
                None => {
                    self.running.store(false, Ordering::Relaxed);
                    Ok(None)
                }
            }
        }
    }

    #[derive(Default)]
    struct Collect {
        frames: Mutex<Vec<(u32, Vec<u8>)>>,
    }

    impl FrameSink for Collect {
        fn on_frame(&self, frame: &UvcFrame<'_>) {
            self.frames
                .lock()
                .unwrap()
                .push((frame.sequence, frame.data.to_vec()));
        }
    }

    fn selection() -> StreamSelection {
        StreamSelection {
            format: FrameFormat::Gray8,
            width: 2,
            height: 2,
            fps: 30,
        }
    }

    #[test]
    fn test_idle_polls_do_not_emit_frames() {
        let running = AtomicBool::new(true);
        let sink = Collect::default();
        let mut source = Scripted::new(
            vec![Step::Idle, Step::Frame(1), Step::Idle, Step::Idle, Step::Frame(2)],
            &running,
        );

        run_capture(&mut source, selection(), 2, &sink, &running).unwrap();

        let frames = sink.frames.lock().unwrap();
        assert_eq!(*frames, vec![(0, vec![1; 4]), (1, vec![2; 4])]);
    }

    #[test]
    fn test_stop_is_noticed_while_idle() {
        let running = AtomicBool::new(true);
        let sink = Collect::default();
        // a stalled camera: nothing but timeouts until the flag is cleared
        let mut source = Scripted::new(vec![Step::Idle, Step::Idle, Step::Idle], &running);

        run_capture(&mut source, selection(), 2, &sink, &running).unwrap();

        assert!(!running.load(Ordering::Relaxed));
        assert_eq!(source.calls, 4);
        assert!(sink.frames.lock().unwrap().is_empty());
    }

    #[test]
    fn test_source_error_ends_capture() {
        let running = AtomicBool::new(true);
        let sink = Collect::default();
        let mut source = Scripted::new(vec![Step::Frame(7), Step::Fail, Step::Frame(8)], &running);

        let err = run_capture(&mut source, selection(), 2, &sink, &running).unwrap_err();

        assert_eq!(err.to_string(), "device gone");
        assert_eq!(source.calls, 2);
        assert_eq!(sink.frames.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_not_running_never_polls() {
        let running = AtomicBool::new(false);
        let sink = Collect::default();
        let mut source = Scripted::new(vec![Step::Frame(1)], &running);

        run_capture(&mut source, selection(), 2, &sink, &running).unwrap();

        assert_eq!(source.calls, 0);
    }
}

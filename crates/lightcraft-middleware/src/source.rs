//! The motion-source boundary.
//!
//! The relay never speaks to a motion-capture server directly.  A
//! [`MotionSource`] owns the connection and pushes every decoded
//! [`MocapFrame`] into a [`FrameSink`], synchronously, on the thread that
//! called [`MotionSource::run`].
//!
//! # Overview
//!
//! - [`MotionSource`] – the trait every source must implement.
//! - [`SimSource`][crate::sim_source::SimSource] – a synthetic body for
//!   headless runs.
//! - [`ReplaySource`][crate::replay::ReplaySource] – recorded frames read
//!   from newline-delimited JSON.

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use lightcraft_types::{MocapFrame, RelayError};

/// Receiver of motion-capture frames.
///
/// `deliver` is called once per frame, in arrival order, and must return
/// before the next frame is produced.  Per-frame problems are the sink's to
/// handle; they never stop the source.
pub trait FrameSink {
    fn deliver(&mut self, frame: &MocapFrame);
}

/// Every motion-capture source must implement this trait.
///
/// # Contract
///
/// * `connect` – establish the session.  Must be called once before `run`.
///
/// * `run` – block, delivering frames to `sink` until `shutdown` is observed
///   (return `Ok`) or the source ends.  An orderly end of data also returns
///   `Ok`.  `Err(RelayError::SourceDisconnected)` signals a lost source and
///   is unrecoverable.
pub trait MotionSource: Send {
    /// Short human-readable name for logs, e.g. `"sim"`.
    fn name(&self) -> &str;

    fn connect(&mut self) -> Result<(), RelayError>;

    fn run(&mut self, sink: &mut dyn FrameSink, shutdown: &AtomicBool) -> Result<(), RelayError>;
}

/// Interval between frames at `rate_hz`.
///
/// `None` for a rate that is not finite and positive, or whose period does
/// not fit in a [`Duration`].
pub fn frame_period(rate_hz: f64) -> Option<Duration> {
    if !(rate_hz.is_finite() && rate_hz > 0.0) {
        return None;
    }
    Duration::try_from_secs_f64(1.0 / rate_hz).ok()
}

/// A [`FrameSink`] that keeps every frame; handy in tests.
impl FrameSink for Vec<MocapFrame> {
    fn deliver(&mut self, frame: &MocapFrame) {
        self.push(frame.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    /// A source that delivers a fixed list of frames.
    struct ScriptedSource {
        frames: Vec<MocapFrame>,
        connected: bool,
    }

    impl MotionSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        fn connect(&mut self) -> Result<(), RelayError> {
            self.connected = true;
            Ok(())
        }

        fn run(
            &mut self,
            sink: &mut dyn FrameSink,
            shutdown: &AtomicBool,
        ) -> Result<(), RelayError> {
            if !self.connected {
                return Err(RelayError::NotConnected);
            }
            for frame in &self.frames {
                if shutdown.load(Ordering::Acquire) {
                    break;
                }
                sink.deliver(frame);
            }
            Ok(())
        }
    }

    fn frame(n: i32) -> MocapFrame {
        MocapFrame {
            frame_number: n,
            timecode: 0,
            timecode_subframe: 0,
            rigid_bodies: Vec::new(),
        }
    }

    #[test]
    fn source_delivers_in_order_to_vec_sink() {
        let mut src = ScriptedSource {
            frames: vec![frame(1), frame(2), frame(3)],
            connected: false,
        };
        let mut sink: Vec<MocapFrame> = Vec::new();
        let shutdown = AtomicBool::new(false);

        src.connect().unwrap();
        src.run(&mut sink, &shutdown).unwrap();

        let numbers: Vec<i32> = sink.iter().map(|f| f.frame_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn frame_period_for_valid_rates() {
        assert_eq!(frame_period(100.0), Some(Duration::from_millis(10)));
        assert_eq!(frame_period(1.0), Some(Duration::from_secs(1)));
    }

    #[test]
    fn frame_period_rejects_unusable_rates() {
        assert_eq!(frame_period(0.0), None);
        assert_eq!(frame_period(-5.0), None);
        assert_eq!(frame_period(f64::NAN), None);
        assert_eq!(frame_period(f64::INFINITY), None);
        // 1 / 1e-30 seconds overflows Duration.
        assert_eq!(frame_period(1e-30), None);
    }

    #[test]
    fn raised_shutdown_stops_delivery() {
        let mut src = ScriptedSource {
            frames: vec![frame(1)],
            connected: true,
        };
        let mut sink: Vec<MocapFrame> = Vec::new();
        let shutdown = AtomicBool::new(true);
        src.run(&mut sink, &shutdown).unwrap();
        assert!(sink.is_empty());
    }
}

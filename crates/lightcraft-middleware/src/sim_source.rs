//! [`SimSource`] – a synthetic motion-capture server for headless runs.
//!
//! Produces one target body orbiting the origin at head height while slowly
//! rolling about its own forward axis, plus a second "distractor" body so the
//! relay's target filtering is exercised.  Frames are paced at a fixed rate
//! and carry a 30 fps timecode derived from the frame counter.
//!
//! # Example
//!
//! ```rust
//! use std::sync::atomic::AtomicBool;
//! use lightcraft_middleware::sim_source::SimSource;
//! use lightcraft_middleware::source::MotionSource;
//! use lightcraft_types::MocapFrame;
//!
//! let mut src = SimSource::new(42, 10_000.0).with_max_frames(3);
//! let mut frames: Vec<MocapFrame> = Vec::new();
//!
//! src.connect().unwrap();
//! src.run(&mut frames, &AtomicBool::new(false)).unwrap();
//! assert_eq!(frames.len(), 3);
//! assert!(frames[0].body(42).is_some());
//! ```

use std::f32::consts::{FRAC_PI_6, PI};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use lightcraft_perception::math::{Quaternion, Vec3};
use lightcraft_types::{MocapFrame, RelayError, RigidBodyPose, Timecode};

use crate::source::{FrameSink, MotionSource, frame_period};

/// Frame rate used for the generated timecode.
pub const TIMECODE_FPS: f64 = 30.0;

/// Rate used when the requested one is unusable.
pub const DEFAULT_RATE_HZ: f64 = 120.0;

const ORBIT_RADIUS_M: f32 = 2.0;
const ORBIT_HEIGHT_M: f32 = 1.6;
const ORBIT_RAD_PER_SEC: f32 = 0.5;
const ROLL_AMPLITUDE_RAD: f32 = FRAC_PI_6;

pub struct SimSource {
    body_id: i32,
    rate_hz: f64,
    period: Duration,
    max_frames: Option<u64>,
    connected: bool,
    produced: u64,
}

impl SimSource {
    /// A source emitting `body_id` at `rate_hz` frames per second.
    /// Rates with no representable frame period fall back to
    /// [`DEFAULT_RATE_HZ`].
    pub fn new(body_id: i32, rate_hz: f64) -> Self {
        let (rate_hz, period) = match frame_period(rate_hz) {
            Some(period) => (rate_hz, period),
            None => {
                warn!(rate_hz, fallback_hz = DEFAULT_RATE_HZ, "unusable sim rate");
                (DEFAULT_RATE_HZ, Duration::from_secs_f64(1.0 / DEFAULT_RATE_HZ))
            }
        };
        Self {
            body_id,
            rate_hz,
            period,
            max_frames: None,
            connected: false,
            produced: 0,
        }
    }

    /// Stop after `n` frames instead of running until shutdown.
    pub fn with_max_frames(mut self, n: u64) -> Self {
        self.max_frames = Some(n);
        self
    }

    pub fn frames_produced(&self) -> u64 {
        self.produced
    }

    /// The frame the source emits at index `n`.
    pub fn frame_at(&self, n: u64) -> MocapFrame {
        let elapsed = n as f64 / self.rate_hz;
        let t = elapsed as f32;

        let angle = t * ORBIT_RAD_PER_SEC;
        let position = [
            ORBIT_RADIUS_M * angle.cos(),
            ORBIT_HEIGHT_M,
            ORBIT_RADIUS_M * angle.sin(),
        ];

        // Face the direction of travel, then roll about the local forward axis.
        let yaw = Quaternion::from_axis_angle(Vec3::unit_y(), -angle);
        let roll = Quaternion::from_axis_angle(Vec3::unit_z(), ROLL_AMPLITUDE_RAD * t.sin());
        let q = yaw.mul(roll);

        let target = RigidBodyPose::new(self.body_id, position, [q.x, q.y, q.z, q.w]);
        let distractor = RigidBodyPose::new(
            self.body_id.wrapping_add(1),
            [0.0, 0.0, 0.0],
            [0.0, (PI * 0.25).sin(), 0.0, (PI * 0.25).cos()],
        );

        MocapFrame {
            frame_number: n as i32,
            timecode: timecode_at(elapsed).pack(),
            timecode_subframe: 0,
            rigid_bodies: vec![distractor, target],
        }
    }
}

fn timecode_at(elapsed: f64) -> Timecode {
    let whole = elapsed.floor();
    let secs = whole as u64;
    let frame = ((elapsed - whole) * TIMECODE_FPS).floor() as u8;
    Timecode::new(
        ((secs / 3600) % 24) as u8,
        ((secs / 60) % 60) as u8,
        (secs % 60) as u8,
        frame,
    )
}

impl MotionSource for SimSource {
    fn name(&self) -> &str {
        "sim"
    }

    fn connect(&mut self) -> Result<(), RelayError> {
        self.connected = true;
        info!(body_id = self.body_id, rate_hz = self.rate_hz, "sim source connected");
        Ok(())
    }

    fn run(&mut self, sink: &mut dyn FrameSink, shutdown: &AtomicBool) -> Result<(), RelayError> {
        if !self.connected {
            return Err(RelayError::NotConnected);
        }

        let period = self.period;
        let mut deadline = Instant::now();

        while !shutdown.load(Ordering::Acquire) {
            if self.max_frames.is_some_and(|max| self.produced >= max) {
                debug!(frames = self.produced, "sim source reached frame limit");
                break;
            }

            let frame = self.frame_at(self.produced);
            sink.deliver(&frame);
            self.produced += 1;

            deadline += period;
            let now = Instant::now();
            if deadline > now {
                thread::sleep(deadline - now);
            } else {
                deadline = now;
            }
        }
        Ok(())
    }
}

//! [`StreamingDriver`] – turns motion-capture frames into wire frames.
//!
//! For every delivered [`MocapFrame`] the driver picks out the configured
//! target body, admits it through the [`FrameVerifier`], decomposes its
//! orientation, encodes a [`WireFrame`] and writes it to the [`Transport`].
//!
//! Per-frame problems never stop streaming:
//!
//! | Situation | Outcome |
//! |---|---|
//! | target body absent | [`FrameOutcome::NoTarget`] |
//! | target body fails a rule | [`FrameOutcome::Rejected`] |
//! | transport write fails | [`FrameOutcome::Dropped`] |
//!
//! Dropped frames are not retried.
//!
//! # Example
//!
//! ```rust
//! use lightcraft_hal::sim::RecordingTransport;
//! use lightcraft_runtime::driver::{DriverConfig, FrameOutcome, StreamingDriver};
//! use lightcraft_types::{MocapFrame, RigidBodyPose};
//!
//! let link = RecordingTransport::new("sim");
//! let handle = link.handle();
//! let mut driver = StreamingDriver::new(DriverConfig::default(), Box::new(link));
//!
//! driver.on_connected().unwrap();
//! let frame = MocapFrame {
//!     frame_number: 1,
//!     timecode: 0x0102_0304,
//!     timecode_subframe: 0,
//!     rigid_bodies: vec![RigidBodyPose::new(42, [1.0, 2.0, 3.0], [0.0, 0.0, 0.0, 1.0])],
//! };
//! assert!(matches!(driver.handle_frame(&frame), Ok(FrameOutcome::Sent(_))));
//! assert_eq!(handle.frame_count(), 1);
//! ```

use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use lightcraft_hal::transport::Transport;
use lightcraft_kernel::frame_verifier::FrameVerifier;
use lightcraft_kernel::watchdog::SourceWatchdog;
use lightcraft_middleware::source::FrameSink;
use lightcraft_perception::math::{Quaternion, UnitQuaternion, Vec3};
use lightcraft_perception::pose::decompose;
use lightcraft_protocol::frame::{FramePayload, WireFrame, encode};
use lightcraft_types::{MocapFrame, RelayError, RigidBodyPose};

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

/// Tunables for a [`StreamingDriver`].
#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfig {
    /// Rigid body forwarded to the tracker.  Other bodies are ignored.
    pub target_body_id: i32,
    /// Allowed deviation of the orientation norm from 1.
    pub quaternion_tolerance: f32,
    /// Inter-frame interval above which a delivery gap is reported.
    pub stale_timeout: Duration,
    /// Log the raw target body and every sent frame as hex together with
    /// its send duration.
    pub test_mode: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            target_body_id: 42,
            quaternion_tolerance: 1e-3,
            stale_timeout: Duration::from_millis(500),
            test_mode: false,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Public types
// ────────────────────────────────────────────────────────────────────────────

/// Lifecycle of a driver.  `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Connected,
    Streaming,
    Closed,
}

/// What happened to a single delivered frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Encoded and written to the transport.
    Sent(WireFrame),
    /// The frame did not contain the target body.
    NoTarget,
    /// The target body failed verification.
    Rejected,
    /// Encoded, but the transport write failed.
    Dropped,
}

/// Counters accumulated over a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub frames_seen: u64,
    pub frames_sent: u64,
    pub no_target: u64,
    pub rejected: u64,
    pub dropped: u64,
    pub gaps: u64,
}

// ────────────────────────────────────────────────────────────────────────────
// StreamingDriver
// ────────────────────────────────────────────────────────────────────────────

pub struct StreamingDriver {
    config: DriverConfig,
    verifier: FrameVerifier,
    watchdog: SourceWatchdog,
    transport: Box<dyn Transport>,
    state: DriverState,
    stats: StreamStats,
}

impl StreamingDriver {
    /// A driver using the default verifier rules.
    pub fn new(config: DriverConfig, transport: Box<dyn Transport>) -> Self {
        let verifier = FrameVerifier::with_defaults(config.quaternion_tolerance);
        Self::with_verifier(config, verifier, transport)
    }

    pub fn with_verifier(
        config: DriverConfig,
        verifier: FrameVerifier,
        transport: Box<dyn Transport>,
    ) -> Self {
        let watchdog = SourceWatchdog::new(config.stale_timeout);
        Self {
            config,
            verifier,
            watchdog,
            transport,
            state: DriverState::Idle,
            stats: StreamStats::default(),
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// The motion source handshake completed.
    ///
    /// # Errors
    ///
    /// [`RelayError::SessionClosed`] once the driver has been closed.
    pub fn on_connected(&mut self) -> Result<(), RelayError> {
        match self.state {
            DriverState::Closed => Err(RelayError::SessionClosed),
            DriverState::Idle => {
                self.watchdog.reset();
                self.state = DriverState::Connected;
                info!(
                    target_body_id = self.config.target_body_id,
                    transport = self.transport.id(),
                    "motion source connected"
                );
                Ok(())
            }
            DriverState::Connected | DriverState::Streaming => Ok(()),
        }
    }

    /// Process one motion-capture frame.
    ///
    /// # Errors
    ///
    /// [`RelayError::NotConnected`] before [`on_connected`](Self::on_connected),
    /// [`RelayError::SessionClosed`] after [`close`](Self::close).  Every other
    /// problem is reported through the returned [`FrameOutcome`].
    pub fn handle_frame(&mut self, frame: &MocapFrame) -> Result<FrameOutcome, RelayError> {
        match self.state {
            DriverState::Idle => return Err(RelayError::NotConnected),
            DriverState::Closed => return Err(RelayError::SessionClosed),
            DriverState::Connected => {
                debug!(frame = frame.frame_number, "first frame received, streaming");
                self.state = DriverState::Streaming;
            }
            DriverState::Streaming => {}
        }

        self.stats.frames_seen += 1;
        if let Some(gap) = self.watchdog.heartbeat() {
            self.stats.gaps += 1;
            warn!(
                gap_ms = gap.as_millis() as u64,
                frame = frame.frame_number,
                "motion source delivery gap"
            );
        }

        let Some(body) = frame.body(self.config.target_body_id) else {
            trace!(frame = frame.frame_number, "target body not in frame");
            self.stats.no_target += 1;
            return Ok(FrameOutcome::NoTarget);
        };

        let Some(orientation) = self.admit(body) else {
            self.stats.rejected += 1;
            return Ok(FrameOutcome::Rejected);
        };

        let started = Instant::now();
        let pose = decompose(orientation);
        let payload = FramePayload::new(
            frame.decoded_timecode(),
            &pose,
            Vec3::from_array(body.position),
        );
        let wire = encode(&payload);

        if let Err(e) = self.transport.write_frame(wire.as_bytes()) {
            warn!(frame = frame.frame_number, error = %e, "frame dropped");
            self.stats.dropped += 1;
            return Ok(FrameOutcome::Dropped);
        }
        let elapsed = started.elapsed();
        self.stats.frames_sent += 1;

        if self.config.test_mode {
            info!(
                body_id = body.id,
                mean_error = body.mean_error,
                tracking_valid = body.tracking_valid,
                report = %body_report(body),
                "target body"
            );
            info!(
                frame = frame.frame_number,
                timecode = %payload.timecode,
                send_us = elapsed.as_micros() as u64,
                bytes = %wire.to_hex(),
                "frame sent"
            );
            if let Ok(decoded) = WireFrame::parse(wire.as_bytes()) {
                debug!(
                    forward = ?decoded.forward,
                    roll_degrees = decoded.roll_degrees,
                    position_cm = ?decoded.position_cm,
                    "frame contents"
                );
            }
        }

        Ok(FrameOutcome::Sent(wire))
    }

    fn admit(&self, body: &RigidBodyPose) -> Option<UnitQuaternion> {
        if let Err(e) = self.verifier.verify(body) {
            warn!(error = %e, "pose rejected");
            return None;
        }
        let q = Quaternion::from_array(body.orientation);
        let unit = UnitQuaternion::try_new(q, self.config.quaternion_tolerance);
        if unit.is_none() {
            warn!(body_id = body.id, orientation = ?body.orientation, "pose rejected: not a unit quaternion");
        }
        unit
    }

    /// Close the transport and enter [`DriverState::Closed`].  Idempotent.
    pub fn close(&mut self) {
        if self.state == DriverState::Closed {
            return;
        }
        self.transport.close();
        self.state = DriverState::Closed;
        info!(
            frames_sent = self.stats.frames_sent,
            dropped = self.stats.dropped,
            "driver closed"
        );
    }
}

/// One-line summary of a body as reported by the source, before any
/// conversion: id, mean error, tracking flag, raw position and quaternion.
pub fn body_report(body: &RigidBodyPose) -> String {
    let [x, y, z] = body.position;
    let [qx, qy, qz, qw] = body.orientation;
    format!(
        "id={} mean_error={:.6} tracking_valid={} pos=({x:.4}, {y:.4}, {z:.4}) quat=({qx:.4}, {qy:.4}, {qz:.4}, {qw:.4})",
        body.id, body.mean_error, body.tracking_valid
    )
}

impl FrameSink for StreamingDriver {
    fn deliver(&mut self, frame: &MocapFrame) {
        if let Err(e) = self.handle_frame(frame) {
            debug!(frame = frame.frame_number, error = %e, "frame ignored");
        }
    }
}

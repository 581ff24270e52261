//! [`SourceWatchdog`] – motion-source liveness monitor.
//!
//! The streaming driver calls [`SourceWatchdog::heartbeat`] once per delivered
//! frame.  When the interval since the previous delivery exceeds the
//! configured timeout, the heartbeat reports the gap so the caller can log
//! it.  Frames lost in a gap are never backfilled.

use std::time::{Duration, Instant};

// ────────────────────────────────────────────────────────────────────────────
// Public types
// ────────────────────────────────────────────────────────────────────────────

/// Liveness state of the motion source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceHealth {
    /// No frame has arrived yet.
    Waiting,
    /// The last frame arrived within the timeout.
    Live,
    /// The last frame is older than the timeout.
    Stale,
}

// ────────────────────────────────────────────────────────────────────────────
// SourceWatchdog
// ────────────────────────────────────────────────────────────────────────────

/// Tracks inter-frame gaps on a single motion source.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use lightcraft_kernel::watchdog::{SourceHealth, SourceWatchdog};
///
/// let mut wd = SourceWatchdog::new(Duration::from_secs(1));
/// assert_eq!(wd.health(), SourceHealth::Waiting);
///
/// assert!(wd.heartbeat().is_none());
/// assert_eq!(wd.health(), SourceHealth::Live);
/// ```
#[derive(Debug)]
pub struct SourceWatchdog {
    timeout: Duration,
    last_heartbeat: Option<Instant>,
    gaps: u64,
}

impl SourceWatchdog {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_heartbeat: None,
            gaps: 0,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Record a delivery.
    ///
    /// Returns the elapsed interval when it exceeded the timeout.  The first
    /// heartbeat never reports a gap.
    pub fn heartbeat(&mut self) -> Option<Duration> {
        self.heartbeat_at(Instant::now())
    }

    fn heartbeat_at(&mut self, now: Instant) -> Option<Duration> {
        let gap = self
            .last_heartbeat
            .map(|last| now.saturating_duration_since(last))
            .filter(|elapsed| *elapsed > self.timeout);
        self.last_heartbeat = Some(now);
        if gap.is_some() {
            self.gaps += 1;
        }
        gap
    }

    pub fn health(&self) -> SourceHealth {
        match self.last_heartbeat {
            None => SourceHealth::Waiting,
            Some(last) if last.elapsed() <= self.timeout => SourceHealth::Live,
            Some(_) => SourceHealth::Stale,
        }
    }

    /// Number of gaps reported since construction or the last [`reset`](Self::reset).
    pub fn gaps(&self) -> u64 {
        self.gaps
    }

    /// Forget the previous delivery, e.g. after a reconnect.
    pub fn reset(&mut self) {
        self.last_heartbeat = None;
        self.gaps = 0;
    }
}

//! In-process transports for CI/CD testing without a serial device.
//!
//! [`RecordingTransport`] keeps every written frame in memory and can be
//! told to fail, so the whole relay can run in headless tests.  A
//! [`RecordingHandle`] stays with the test after the transport itself has
//! been moved onto the delivery thread.
//!
//! # Example
//!
//! ```rust
//! use lightcraft_hal::sim::RecordingTransport;
//! use lightcraft_hal::transport::Transport;
//!
//! let mut link = RecordingTransport::new("sim-serial");
//! let handle = link.handle();
//!
//! link.write_frame(&[0xD1, 0x00]).expect("sim write must succeed");
//! link.close();
//!
//! assert_eq!(handle.frames(), vec![vec![0xD1, 0x00]]);
//! assert!(handle.is_closed());
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use lightcraft_types::RelayError;

use crate::transport::Transport;

#[derive(Default)]
struct Shared {
    frames: Mutex<Vec<Vec<u8>>>,
    closed: AtomicBool,
    close_calls: AtomicUsize,
    failing: AtomicBool,
}

// ────────────────────────────────────────────────────────────────────────────
// RecordingTransport
// ────────────────────────────────────────────────────────────────────────────

/// A transport that stores written frames instead of sending them.
pub struct RecordingTransport {
    id: String,
    shared: Arc<Shared>,
}

impl RecordingTransport {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            shared: Arc::new(Shared::default()),
        }
    }

    /// A cloneable view onto what this transport has recorded.
    pub fn handle(&self) -> RecordingHandle {
        RecordingHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Transport for RecordingTransport {
    fn id(&self) -> &str {
        &self.id
    }

    fn write_frame(&mut self, bytes: &[u8]) -> Result<(), RelayError> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(RelayError::Transport {
                port: self.id.clone(),
                details: "transport is closed".to_string(),
            });
        }
        if self.shared.failing.load(Ordering::Acquire) {
            return Err(RelayError::Transport {
                port: self.id.clone(),
                details: "simulated write failure".to_string(),
            });
        }
        if let Ok(mut frames) = self.shared.frames.lock() {
            frames.push(bytes.to_vec());
        }
        Ok(())
    }

    fn close(&mut self) {
        self.shared.close_calls.fetch_add(1, Ordering::AcqRel);
        self.shared.closed.store(true, Ordering::Release);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// RecordingHandle
// ────────────────────────────────────────────────────────────────────────────

/// Inspection and fault-injection side of a [`RecordingTransport`].
#[derive(Clone)]
pub struct RecordingHandle {
    shared: Arc<Shared>,
}

impl RecordingHandle {
    /// Snapshot of every frame written so far, in order.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.shared
            .frames
            .lock()
            .map(|f| f.clone())
            .unwrap_or_default()
    }

    pub fn frame_count(&self) -> usize {
        self.shared.frames.lock().map(|f| f.len()).unwrap_or(0)
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// How many times `close` was called on the transport.
    pub fn close_calls(&self) -> usize {
        self.shared.close_calls.load(Ordering::Acquire)
    }

    /// Make subsequent writes fail (`true`) or succeed again (`false`).
    pub fn set_failing(&self, failing: bool) {
        self.shared.failing.store(failing, Ordering::Release);
    }
}

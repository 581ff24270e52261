//! [`Session`] – one motion source streaming into one driver on a dedicated
//! delivery thread.
//!
//! The delivery thread owns both the source and the driver (and through it
//! the transport).  It connects the source, runs it until the shared
//! shutdown flag is raised or the source ends, and then closes the driver.
//! The transport is therefore only ever closed after the last send has
//! finished.
//!
//! # Example
//!
//! ```rust
//! use lightcraft_hal::sim::RecordingTransport;
//! use lightcraft_middleware::sim_source::SimSource;
//! use lightcraft_runtime::driver::{DriverConfig, StreamingDriver};
//! use lightcraft_runtime::session::Session;
//!
//! let link = RecordingTransport::new("sim");
//! let handle = link.handle();
//! let driver = StreamingDriver::new(DriverConfig::default(), Box::new(link));
//! let source = SimSource::new(42, 10_000.0).with_max_frames(10);
//!
//! let stats = Session::start(Box::new(source), driver).unwrap().join().unwrap();
//! assert_eq!(stats.frames_sent, 10);
//! assert!(handle.is_closed());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use tracing::{error, info};

use lightcraft_middleware::source::MotionSource;
use lightcraft_types::RelayError;

use crate::driver::{StreamStats, StreamingDriver};

/// Name given to the delivery thread.
pub const DELIVERY_THREAD: &str = "lightcraft-delivery";

pub struct Session {
    shutdown: Arc<AtomicBool>,
    handle: JoinHandle<Result<StreamStats, RelayError>>,
}

impl Session {
    /// Spawn the delivery thread with a fresh shutdown flag.
    pub fn start(
        source: Box<dyn MotionSource>,
        driver: StreamingDriver,
    ) -> Result<Self, RelayError> {
        Self::with_shutdown(source, driver, Arc::new(AtomicBool::new(false)))
    }

    /// Spawn the delivery thread observing an existing shutdown flag, e.g.
    /// one shared with a Ctrl-C handler.
    ///
    /// # Errors
    ///
    /// [`RelayError::Io`] if the thread cannot be spawned.
    pub fn with_shutdown(
        source: Box<dyn MotionSource>,
        driver: StreamingDriver,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self, RelayError> {
        let flag = Arc::clone(&shutdown);
        let handle = thread::Builder::new()
            .name(DELIVERY_THREAD.to_string())
            .spawn(move || deliver(source, driver, &flag))?;
        Ok(Self { shutdown, handle })
    }

    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// `true` once the delivery thread has returned.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Raise the shutdown flag and wait for the delivery thread.
    pub fn stop(self) -> Result<StreamStats, RelayError> {
        self.shutdown.store(true, Ordering::Release);
        self.join()
    }

    /// Wait for the delivery thread without requesting shutdown.
    pub fn join(self) -> Result<StreamStats, RelayError> {
        self.handle.join().map_err(|_| {
            RelayError::SourceDisconnected("delivery thread panicked".to_string())
        })?
    }
}

fn deliver(
    mut source: Box<dyn MotionSource>,
    mut driver: StreamingDriver,
    shutdown: &AtomicBool,
) -> Result<StreamStats, RelayError> {
    info!(source = source.name(), "delivery thread started");

    let result = source
        .connect()
        .and_then(|()| driver.on_connected())
        .and_then(|()| source.run(&mut driver, shutdown));
    driver.close();

    match result {
        Ok(()) => {
            let stats = driver.stats();
            info!(
                frames_seen = stats.frames_seen,
                frames_sent = stats.frames_sent,
                "delivery thread finished"
            );
            Ok(stats)
        }
        Err(e) => {
            error!(source = source.name(), error = %e, "motion source lost");
            Err(e)
        }
    }
}

//! Generic `Transport` trait for the outbound byte link to the tracker.
//!
//! The streaming driver only ever talks to this trait, so a real serial port
//! and an in-memory recorder are interchangeable.

use lightcraft_types::RelayError;

/// A write-only link that carries encoded frames to the receiving tracker.
///
/// Implementations must be [`Send`] so the handle can be moved onto the
/// delivery thread that owns it for the lifetime of a session.
pub trait Transport: Send {
    /// Stable identifier for this link, e.g. `"/dev/ttyUSB0"`.
    fn id(&self) -> &str;

    /// Write one complete frame and block until it has been handed to the
    /// device.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Transport`] if the write fails or the link is
    /// already closed.
    fn write_frame(&mut self, bytes: &[u8]) -> Result<(), RelayError>;

    /// Release the underlying device.  Calling it again is a no-op.
    fn close(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal in-process transport used only for tests.
    struct CountingTransport {
        id: String,
        bytes_written: usize,
        closed: bool,
    }

    impl Transport for CountingTransport {
        fn id(&self) -> &str {
            &self.id
        }

        fn write_frame(&mut self, bytes: &[u8]) -> Result<(), RelayError> {
            if self.closed {
                return Err(RelayError::Transport {
                    port: self.id.clone(),
                    details: "closed".into(),
                });
            }
            self.bytes_written += bytes.len();
            Ok(())
        }

        fn close(&mut self) {
            self.closed = true;
        }
    }

    #[test]
    fn trait_object_writes_then_rejects_after_close() {
        let mut link: Box<dyn Transport> = Box::new(CountingTransport {
            id: "counting".into(),
            bytes_written: 0,
            closed: false,
        });
        assert_eq!(link.id(), "counting");
        link.write_frame(&[0xD1; 48]).unwrap();
        link.close();
        assert!(link.write_frame(&[0xD1; 48]).is_err());
    }
}

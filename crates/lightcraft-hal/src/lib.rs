//! `lightcraft-hal` – Output Link Abstraction
//!
//! Everything that touches the physical link to the receiving tracker lives
//! behind the [`Transport`] trait.
//!
//! # Modules
//!
//! - [`transport`] – the [`Transport`] trait.
//! - [`serial`] – [`SerialTransport`], an 8N1 serial port via `serialport`.
//! - [`sim`] – [`RecordingTransport`] for headless tests.

pub mod serial;
pub mod sim;
pub mod transport;

pub use serial::{SerialSettings, SerialTransport};
pub use sim::{RecordingHandle, RecordingTransport};
pub use transport::Transport;

//! `lightcraft-runtime` – The Relay Engine
//!
//! Wires a motion source, the admission rules, the pose math and the wire
//! encoder into a running relay.
//!
//! # Modules
//!
//! - [`driver`] – [`StreamingDriver`][driver::StreamingDriver]: the
//!   per-frame pipeline (filter → verify → decompose → encode → send) and its
//!   `Idle → Connected → Streaming → Closed` lifecycle.
//! - [`session`] – [`Session`][session::Session]: runs a source and a driver
//!   on the dedicated delivery thread and shuts them down in order.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs the
//!   global `tracing` subscriber with an optional OTLP span exporter.

pub mod driver;
pub mod session;
pub mod telemetry;

pub use driver::{DriverConfig, DriverState, FrameOutcome, StreamStats, StreamingDriver};
pub use session::Session;
pub use telemetry::{TracerProviderGuard, init_tracing};

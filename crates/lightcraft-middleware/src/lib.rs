//! `lightcraft-middleware` – Motion Sources
//!
//! Brings motion-capture frames into the relay without caring what they mean.
//!
//! # Modules
//!
//! - [`source`] – the [`MotionSource`] and [`FrameSink`] traits.
//! - [`sim_source`] – [`SimSource`], a synthetic orbiting body.
//! - [`replay`] – [`ReplaySource`], recorded frames from JSON lines.

pub mod replay;
pub mod sim_source;
pub mod source;

pub use replay::ReplaySource;
pub use sim_source::SimSource;
pub use source::{FrameSink, MotionSource, frame_period};

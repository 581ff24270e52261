//! `lightcraft-kernel` – Admission & Liveness
//!
//! Decides which motion-capture samples are fit to encode and keeps an eye on
//! the motion source between frames.
//!
//! # Modules
//!
//! - [`frame_verifier`] – [`FrameVerifier`][frame_verifier::FrameVerifier]:
//!   a rule engine that validates every target
//!   [`RigidBodyPose`][lightcraft_types::RigidBodyPose] (tracking state,
//!   finite values, unit quaternion) and returns a
//!   [`RelayError::MalformedPose`][lightcraft_types::RelayError::MalformedPose]
//!   when a rule is violated.
//! - [`watchdog`] – [`SourceWatchdog`][watchdog::SourceWatchdog]:
//!   detects delivery gaps longer than a configured timeout.

pub mod frame_verifier;
pub mod watchdog;

pub use frame_verifier::{
    FiniteValuesRule, FrameVerifier, Rule, TrackingValidRule, UnitQuaternionRule,
};
pub use watchdog::{SourceHealth, SourceWatchdog};

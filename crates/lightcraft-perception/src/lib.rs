//! `lightcraft-perception` – orientation maths.
//!
//! Turns the quaternion reported by the motion-capture system into the
//! forward-vector / roll-angle representation the camera tracker expects.
//!
//! # Modules
//!
//! - [`math`] – [`Vec3`][math::Vec3], [`Quaternion`][math::Quaternion] and
//!   [`UnitQuaternion`][math::UnitQuaternion]: the minimal algebra needed to
//!   rotate vectors.
//! - [`pose`] – [`decompose`][pose::decompose]: derives the rotated forward
//!   axis and the roll angle about it.

pub mod math;
pub mod pose;

pub use math::{Quaternion, UnitQuaternion, Vec3};
pub use pose::{PoseDecomposition, decompose};

//! Pose decomposition: forward vector plus roll angle.
//!
//! The receiving tracker does not take quaternions.  It wants the direction
//! the body is pointing (its rotated +Z axis) and a scalar roll about that
//! direction.  The rest pose has "up" = +Y and "forward" = +Z.
//!
//! Roll is measured by projecting the rest-pose up axis onto the plane
//! orthogonal to the rotated forward axis, carrying the projection back into
//! body space with the inverse rotation, and taking its planar angle from +Y.
//!
//! # Example
//!
//! ```rust
//! use lightcraft_perception::math::{UnitQuaternion, Vec3};
//! use lightcraft_perception::pose::decompose;
//!
//! let pose = decompose(UnitQuaternion::identity());
//! assert_eq!(pose.forward, Vec3::unit_z());
//! assert!(pose.roll_degrees.abs() < 1e-6);
//! ```

use tracing::trace;

use crate::math::{UnitQuaternion, Vec3};

/// Output of [`decompose`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseDecomposition {
    /// Rest-pose +Z rotated into the tracked orientation.
    pub forward: Vec3,
    /// Rest-pose +Y rotated into the tracked orientation.  Reported for
    /// diagnostics; the roll angle does not use it.
    pub up: Vec3,
    /// Rotation about `forward`, in degrees, in `(-180, 180]`.
    pub roll_degrees: f32,
}

/// Decompose an orientation into forward vector and roll angle.
pub fn decompose(q: UnitQuaternion) -> PoseDecomposition {
    let forward = q.rotate(Vec3::unit_z());
    let up = q.rotate(Vec3::unit_y());

    debug_assert!(
        forward.normalized().is_some(),
        "rotated forward axis must be non-degenerate for a unit quaternion"
    );

    // Rest-pose up with its component along `forward` removed.
    let rest_up = Vec3::unit_y();
    let projected = rest_up - forward * rest_up.dot(forward);
    let local = q.inverse().rotate(projected);

    let roll_degrees = local.x.atan2(local.y).to_degrees();

    trace!(
        forward = ?forward,
        roll_degrees,
        "decomposed orientation"
    );

    PoseDecomposition {
        forward,
        up,
        roll_degrees,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Quaternion;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    fn unit(axis: Vec3, angle_rad: f32) -> UnitQuaternion {
        UnitQuaternion::try_new(Quaternion::from_axis_angle(axis, angle_rad), 1e-5).unwrap()
    }

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn identity_points_forward_with_zero_roll() {
        let pose = decompose(UnitQuaternion::identity());
        assert!(approx(pose.forward, Vec3::unit_z()));
        assert!(approx(pose.up, Vec3::unit_y()));
        assert!(pose.roll_degrees.abs() < 1e-5);
    }

    #[test]
    fn rotation_about_forward_changes_roll_only() {
        let pose = decompose(unit(Vec3::unit_z(), FRAC_PI_2));
        assert!(approx(pose.forward, Vec3::unit_z()), "forward moved: {:?}", pose.forward);
        assert!(
            (pose.roll_degrees - 90.0).abs() < 1e-3,
            "roll = {}",
            pose.roll_degrees
        );
    }

    #[test]
    fn roll_sign_follows_rotation_direction() {
        let pos = decompose(unit(Vec3::unit_z(), FRAC_PI_4));
        let neg = decompose(unit(Vec3::unit_z(), -FRAC_PI_4));
        assert!((pos.roll_degrees - 45.0).abs() < 1e-3);
        assert!((neg.roll_degrees + 45.0).abs() < 1e-3);
    }

    #[test]
    fn yaw_moves_forward_without_roll() {
        // 90° about +Y swings +Z onto +X; the up axis is untouched.
        let pose = decompose(unit(Vec3::unit_y(), FRAC_PI_2));
        assert!(approx(pose.forward, Vec3::new(1.0, 0.0, 0.0)), "{:?}", pose.forward);
        assert!(pose.roll_degrees.abs() < 1e-3, "roll = {}", pose.roll_degrees);
    }

    #[test]
    fn pitch_moves_forward_without_roll() {
        let pose = decompose(unit(Vec3::new(1.0, 0.0, 0.0), FRAC_PI_4));
        assert!(pose.forward.y < 0.0);
        assert!(pose.roll_degrees.abs() < 1e-3, "roll = {}", pose.roll_degrees);
    }

    #[test]
    fn forward_is_unit_length() {
        let q = UnitQuaternion::new_normalize(Quaternion::new(0.3, -0.5, 0.2, 0.7)).unwrap();
        let pose = decompose(q);
        assert!((pose.forward.length() - 1.0).abs() < 1e-5);
        assert!(pose.roll_degrees.is_finite());
    }
}

//! [`FrameVerifier`] – admission checks for incoming rigid-body poses.
//!
//! Before a pose is decomposed and encoded, pass it through
//! [`FrameVerifier::verify`].  Every registered [`Rule`] is evaluated in
//! order; the first violation returns a [`RelayError::MalformedPose`] and the
//! sample is skipped.
//!
//! Three built-in rules are provided:
//! - [`TrackingValidRule`] – rejects bodies the server lost track of.
//! - [`FiniteValuesRule`] – rejects NaN or infinite position / orientation
//!   components.
//! - [`UnitQuaternionRule`] – rejects orientations whose norm is further
//!   than `tolerance` from 1.

use tracing::debug;

use lightcraft_perception::math::{Quaternion, Vec3};
use lightcraft_types::{RelayError, RigidBodyPose};

// ────────────────────────────────────────────────────────────────────────────
// Rule trait
// ────────────────────────────────────────────────────────────────────────────

/// A single property an incoming pose must satisfy.
pub trait Rule: Send + Sync {
    /// Human-readable name used in log output.
    fn name(&self) -> &str;

    /// Return `Ok(())` when `pose` satisfies the rule, or
    /// [`RelayError::MalformedPose`] when it does not.
    fn check(&self, pose: &RigidBodyPose) -> Result<(), RelayError>;
}

fn malformed(pose: &RigidBodyPose, details: String) -> RelayError {
    RelayError::MalformedPose {
        body_id: pose.id,
        details,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// FrameVerifier
// ────────────────────────────────────────────────────────────────────────────

/// Rule engine applied to the target body of every frame.
///
/// # Example
///
/// ```
/// use lightcraft_kernel::frame_verifier::FrameVerifier;
/// use lightcraft_types::RigidBodyPose;
///
/// let verifier = FrameVerifier::with_defaults(1e-3);
///
/// let good = RigidBodyPose::new(42, [1.0, 2.0, 3.0], [0.0, 0.0, 0.0, 1.0]);
/// assert!(verifier.verify(&good).is_ok());
///
/// let zero = RigidBodyPose::new(42, [1.0, 2.0, 3.0], [0.0, 0.0, 0.0, 0.0]);
/// assert!(verifier.verify(&zero).is_err());
/// ```
#[derive(Default)]
pub struct FrameVerifier {
    rules: Vec<Box<dyn Rule>>,
}

impl FrameVerifier {
    /// Create an empty verifier with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracking, finiteness and unit-norm checks, in that order.
    pub fn with_defaults(quaternion_tolerance: f32) -> Self {
        let mut v = Self::new();
        v.add_rule(Box::new(TrackingValidRule));
        v.add_rule(Box::new(FiniteValuesRule));
        v.add_rule(Box::new(UnitQuaternionRule {
            tolerance: quaternion_tolerance,
        }));
        v
    }

    /// Register a new [`Rule`].  Rules are evaluated in insertion order.
    pub fn add_rule(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Validate `pose` against every registered rule.
    ///
    /// Returns the first [`RelayError::MalformedPose`] encountered.
    pub fn verify(&self, pose: &RigidBodyPose) -> Result<(), RelayError> {
        match self.first_violation(pose) {
            None => Ok(()),
            Some((rule, err)) => {
                debug!(rule, body_id = pose.id, "rule violated");
                Err(err)
            }
        }
    }

    /// Name of the first failing rule and its error, if any rule fails.
    pub fn first_violation(&self, pose: &RigidBodyPose) -> Option<(&str, RelayError)> {
        self.rules
            .iter()
            .find_map(|rule| rule.check(pose).err().map(|e| (rule.name(), e)))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Built-in rules
// ────────────────────────────────────────────────────────────────────────────

/// Rejects poses with `tracking_valid == false`.
pub struct TrackingValidRule;

impl Rule for TrackingValidRule {
    fn name(&self) -> &str {
        "tracking_valid"
    }

    fn check(&self, pose: &RigidBodyPose) -> Result<(), RelayError> {
        if !pose.tracking_valid {
            return Err(malformed(pose, "body is not tracked".to_string()));
        }
        Ok(())
    }
}

/// Rejects NaN or infinite components in position or orientation.
pub struct FiniteValuesRule;

impl Rule for FiniteValuesRule {
    fn name(&self) -> &str {
        "finite_values"
    }

    fn check(&self, pose: &RigidBodyPose) -> Result<(), RelayError> {
        if !Vec3::from_array(pose.position).is_finite() {
            return Err(malformed(
                pose,
                format!("non-finite position {:?}", pose.position),
            ));
        }
        if !Quaternion::from_array(pose.orientation).is_finite() {
            return Err(malformed(
                pose,
                format!("non-finite orientation {:?}", pose.orientation),
            ));
        }
        Ok(())
    }
}

/// Rejects orientations whose norm differs from 1 by more than `tolerance`.
pub struct UnitQuaternionRule {
    pub tolerance: f32,
}

impl Rule for UnitQuaternionRule {
    fn name(&self) -> &str {
        "unit_quaternion"
    }

    fn check(&self, pose: &RigidBodyPose) -> Result<(), RelayError> {
        let norm = Quaternion::from_array(pose.orientation).norm();
        if (norm - 1.0).abs() > self.tolerance {
            return Err(malformed(
                pose,
                format!(
                    "quaternion norm {norm} outside 1 ± {}",
                    self.tolerance
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

    fn pose(orientation: [f32; 4]) -> RigidBodyPose {
        RigidBodyPose::new(42, [1.0, 2.0, 3.0], orientation)
    }

    // ------------------------------------------------------------------ defaults

    #[test]
    fn identity_pose_passes_defaults() {
        let v = FrameVerifier::with_defaults(1e-3);
        assert!(v.verify(&pose(IDENTITY)).is_ok());
    }

    #[test]
    fn default_rules_in_order() {
        let v = FrameVerifier::with_defaults(1e-3);
        assert_eq!(
            v.rule_names(),
            vec!["tracking_valid", "finite_values", "unit_quaternion"]
        );
    }

    #[test]
    fn untracked_pose_rejected() {
        let v = FrameVerifier::with_defaults(1e-3);
        let mut p = pose(IDENTITY);
        p.tracking_valid = false;
        let err = v.verify(&p).unwrap_err();
        assert!(matches!(err, RelayError::MalformedPose { body_id: 42, .. }));
        assert!(err.to_string().contains("not tracked"));
    }

    #[test]
    fn nan_position_rejected() {
        let v = FrameVerifier::with_defaults(1e-3);
        let mut p = pose(IDENTITY);
        p.position[1] = f32::NAN;
        assert!(matches!(
            v.verify(&p),
            Err(RelayError::MalformedPose { .. })
        ));
    }

    #[test]
    fn infinite_orientation_rejected_by_finite_rule_first() {
        let v = FrameVerifier::with_defaults(1e-3);
        let err = v
            .verify(&pose([f32::INFINITY, 0.0, 0.0, 1.0]))
            .unwrap_err();
        assert!(err.to_string().contains("non-finite orientation"));
    }

    #[test]
    fn zero_quaternion_rejected() {
        let v = FrameVerifier::with_defaults(1e-3);
        assert!(v.verify(&pose([0.0; 4])).is_err());
    }

    // ------------------------------------------------------------------ UnitQuaternionRule

    #[test]
    fn slightly_off_norm_within_tolerance_passes() {
        let rule = UnitQuaternionRule { tolerance: 1e-2 };
        assert!(rule.check(&pose([0.0, 0.0, 0.0, 1.005])).is_ok());
    }

    #[test]
    fn norm_outside_tolerance_rejected() {
        let rule = UnitQuaternionRule { tolerance: 1e-3 };
        assert!(rule.check(&pose([0.0, 0.0, 0.0, 2.0])).is_err());
    }

    // ------------------------------------------------------------------ engine

    #[test]
    fn empty_verifier_always_passes() {
        let v = FrameVerifier::new();
        let mut p = pose([0.0; 4]);
        p.tracking_valid = false;
        assert!(v.verify(&p).is_ok());
    }

    #[test]
    fn first_failing_rule_short_circuits() {
        let v = FrameVerifier::with_defaults(1e-3);
        let mut p = pose([f32::NAN; 4]);
        p.tracking_valid = false;
        let err = v.verify(&p).unwrap_err();
        assert!(err.to_string().contains("not tracked"));
    }

    #[test]
    fn first_violation_names_the_failing_rule() {
        let v = FrameVerifier::with_defaults(1e-3);
        assert!(v.first_violation(&pose(IDENTITY)).is_none());

        let (rule, err) = v.first_violation(&pose([0.0, 0.0, 0.0, 3.0])).unwrap();
        assert_eq!(rule, "unit_quaternion");
        assert!(matches!(err, RelayError::MalformedPose { body_id: 42, .. }));

        let mut untracked = pose(IDENTITY);
        untracked.tracking_valid = false;
        assert_eq!(v.first_violation(&untracked).unwrap().0, "tracking_valid");
    }

    #[test]
    fn custom_rule_can_be_added() {
        struct MaxHeight(f32);
        impl Rule for MaxHeight {
            fn name(&self) -> &str {
                "max_height"
            }
            fn check(&self, pose: &RigidBodyPose) -> Result<(), RelayError> {
                if pose.position[1] > self.0 {
                    return Err(malformed(pose, "too high".into()));
                }
                Ok(())
            }
        }

        let mut v = FrameVerifier::new();
        v.add_rule(Box::new(MaxHeight(1.0)));
        assert!(v.verify(&pose(IDENTITY)).is_err());
    }
}

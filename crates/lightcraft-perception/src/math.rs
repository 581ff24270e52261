//! Minimal vector and quaternion algebra for pose decomposition.
//!
//! Only the operations the encoder needs are provided: component-wise
//! arithmetic, dot/cross products, normalisation and rotation of a vector by
//! a unit quaternion.
//!
//! Two quaternion types exist.  [`Quaternion`] is a raw 4-tuple with no
//! invariant.  [`UnitQuaternion`] is a rotation that is known to be unit
//! length, obtained either by *verifying* a raw quaternion against a
//! tolerance ([`UnitQuaternion::try_new`]) or by *rescaling* it
//! ([`UnitQuaternion::new_normalize`]).  Only a [`UnitQuaternion`] can rotate
//! vectors.
//!
//! # Example
//!
//! ```rust
//! use lightcraft_perception::math::{Quaternion, UnitQuaternion, Vec3};
//! use std::f32::consts::FRAC_1_SQRT_2;
//!
//! // 90° about +Y carries +Z onto +X.
//! let q = UnitQuaternion::try_new(Quaternion::new(0.0, FRAC_1_SQRT_2, 0.0, FRAC_1_SQRT_2), 1e-4)
//!     .unwrap();
//! let v = q.rotate(Vec3::unit_z());
//! assert!((v.x - 1.0).abs() < 1e-5);
//! ```

use std::ops::{Add, Mul, Neg, Sub};

// ────────────────────────────────────────────────────────────────────────────
// Vec3
// ────────────────────────────────────────────────────────────────────────────

/// A 3-component real vector.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Rest-pose "up" axis.
    pub const fn unit_y() -> Self {
        Self::new(0.0, 1.0, 0.0)
    }

    /// Rest-pose "forward" axis.
    pub const fn unit_z() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }

    pub fn from_array(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    pub fn scale(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn dot(self, rhs: Self) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn cross(self, rhs: Self) -> Self {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction, or `None` for a zero-length (or
    /// non-finite) vector.
    pub fn normalized(self) -> Option<Self> {
        let len = self.length();
        if len > f32::EPSILON && len.is_finite() {
            Some(self.scale(1.0 / len))
        } else {
            None
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        self.scale(rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Quaternion
// ────────────────────────────────────────────────────────────────────────────

/// A raw quaternion in (x, y, z, w) order, matching the motion-capture wire
/// convention.  No unit-length invariant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quaternion {
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub const fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }

    pub fn from_array(q: [f32; 4]) -> Self {
        Self::new(q[0], q[1], q[2], q[3])
    }

    /// Rotation of `angle_rad` about `axis`.  Returns the identity when the
    /// axis has zero length.
    pub fn from_axis_angle(axis: Vec3, angle_rad: f32) -> Self {
        match axis.normalized() {
            Some(a) => {
                let (s, c) = (angle_rad * 0.5).sin_cos();
                Self::new(a.x * s, a.y * s, a.z * s, c)
            }
            None => Self::identity(),
        }
    }

    /// Hamilton product: `self ⊗ rhs`.
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        )
    }

    /// `(-x, -y, -z, w)`; the inverse only when `self` is unit length.
    pub fn conjugate(self) -> Self {
        Self::new(-self.x, -self.y, -self.z, self.w)
    }

    pub fn norm(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.w.is_finite()
    }

    pub fn vector_part(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// UnitQuaternion
// ────────────────────────────────────────────────────────────────────────────

/// A quaternion known to be unit length, and therefore a valid rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitQuaternion(Quaternion);

impl UnitQuaternion {
    pub const fn identity() -> Self {
        Self(Quaternion::identity())
    }

    /// Accept `q` as-is when its norm is within `tolerance` of 1.
    ///
    /// The components are kept verbatim (no rescaling), so downstream maths
    /// sees exactly what the motion source reported.  Returns `None` for
    /// non-finite input or a norm outside the tolerance.
    pub fn try_new(q: Quaternion, tolerance: f32) -> Option<Self> {
        if !q.is_finite() {
            return None;
        }
        if (q.norm() - 1.0).abs() <= tolerance {
            Some(Self(q))
        } else {
            None
        }
    }

    /// Rescale `q` to unit length.  Returns `None` for zero-length or
    /// non-finite input.
    pub fn new_normalize(q: Quaternion) -> Option<Self> {
        if !q.is_finite() {
            return None;
        }
        let n = q.norm();
        if n <= f32::EPSILON {
            return None;
        }
        Some(Self(Quaternion::new(q.x / n, q.y / n, q.z / n, q.w / n)))
    }

    pub fn into_inner(self) -> Quaternion {
        self.0
    }

    /// The inverse rotation (conjugate).
    pub fn inverse(self) -> Self {
        Self(self.0.conjugate())
    }

    /// Compose two rotations: `self` applied after `rhs`.
    pub fn mul(self, rhs: Self) -> Self {
        Self(self.0.mul(rhs.0))
    }

    /// Rotate `v`: vector part of `q ⊗ (v, 0) ⊗ q⁻¹`.  No renormalisation.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let p = Quaternion::new(v.x, v.y, v.z, 0.0);
        self.0.mul(p).mul(self.0.conjugate()).vector_part()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

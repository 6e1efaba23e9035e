//! Minimal double-precision rigid-transform kernel.
//!
//! `Pose` composition is the one operation the rest of the tree engine
//! leans on. Kept hand-rolled (rather than `nalgebra::Isometry3` /
//! `UnitQuaternion`) because `Quat::from_axis_angle` must preserve a
//! non-unit input axis verbatim -- a unit-quaternion type would
//! renormalize it away.

use std::ops::{Add, Mul};

/// A 3D vector, double precision.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Vec3 { x, y, z }
    }

    pub fn dot(self, rhs: Vec3) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn cross(self, rhs: Vec3) -> Vec3 {
        Vec3::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;
    fn mul(self, s: f64) -> Vec3 {
        Vec3::new(self.x * s, self.y * s, self.z * s)
    }
}

/// Quaternion, stored `(x, y, z, w)` to match the wire format in §6.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quat {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quat {
    pub const IDENTITY: Quat = Quat { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };

    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Quat { x, y, z, w }
    }

    /// Normalize; used only at wire ingestion boundaries (§3: "inputs
    /// are normalized on entry from the wire").
    pub fn normalized(self) -> Quat {
        let len = (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt();
        if len == 0.0 {
            Quat::IDENTITY
        } else {
            Quat::new(self.x / len, self.y / len, self.z / len, self.w / len)
        }
    }

    /// Axis-angle construction. `axis` is **not** renormalized -- callers
    /// that want a unit axis must pass one (§4.1).
    pub fn from_axis_angle(axis: Vec3, theta: f64) -> Quat {
        let half = theta / 2.0;
        let s = half.sin();
        Quat::new(axis.x * s, axis.y * s, axis.z * s, half.cos())
    }

    /// Hamilton product.
    pub fn mul_quat(self, rhs: Quat) -> Quat {
        Quat::new(
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        )
    }

    /// Rotate `v` by the sandwich product `q . (v, 0) . q*`.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let qv = Quat::new(v.x, v.y, v.z, 0.0);
        let conj = Quat::new(-self.x, -self.y, -self.z, self.w);
        let r = self.mul_quat(qv).mul_quat(conj);
        Vec3::new(r.x, r.y, r.z)
    }
}

/// Rigid transform: position + orientation. Composition is
/// non-commutative; identity is `(0, 1)` (§3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Pose {
    pub const IDENTITY: Pose = Pose { position: Vec3::ZERO, orientation: Quat::IDENTITY };

    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Pose { position, orientation }
    }

    /// `P1 . P2 = (p1 + q1.p2, q1.q2)`.
    pub fn compose(self, rhs: Pose) -> Pose {
        Pose::new(
            self.position + self.orientation.rotate(rhs.position),
            self.orientation.mul_quat(rhs.orientation),
        )
    }
}

impl Mul for Pose {
    type Output = Pose;
    fn mul(self, rhs: Pose) -> Pose {
        self.compose(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn approx(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-6, "{} !~ {}", a, b);
    }

    #[test]
    fn identity_composes_to_self() {
        let p = Pose::new(Vec3::new(1.0, 2.0, 3.0), Quat::IDENTITY);
        let composed = Pose::IDENTITY.compose(p);
        assert_eq!(composed, p);
    }

    #[test]
    fn quat_from_axis_angle_quarter_turn_about_z() {
        let q = Quat::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), FRAC_PI_2);
        approx(q.x, 0.0);
        approx(q.y, 0.0);
        approx(q.z, std::f64::consts::FRAC_1_SQRT_2);
        approx(q.w, std::f64::consts::FRAC_1_SQRT_2);
    }

    #[test]
    fn quat_from_axis_angle_does_not_renormalize_axis() {
        let q = Quat::from_axis_angle(Vec3::new(0.0, 0.0, 2.0), FRAC_PI_2);
        approx(q.z, 2.0 * std::f64::consts::FRAC_1_SQRT_2);
    }

    #[test]
    fn rotate_vector_by_quarter_turn() {
        let q = Quat::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), FRAC_PI_2);
        let v = q.rotate(Vec3::new(1.0, 0.0, 0.0));
        approx(v.x, 0.0);
        approx(v.y, 1.0);
        approx(v.z, 0.0);
    }
}

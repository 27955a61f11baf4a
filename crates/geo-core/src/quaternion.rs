use std::ops::Mul;

use serde::{Deserialize, Serialize};

use crate::constants::EPSILON;

/// Rotation expressed in the East-Up-North frame.
///
/// Field order matches the persisted layout (`x, y, z, w`). Values read back
/// from storage are kept exactly as stored; only [`Quaternion::new`]
/// normalizes.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl PartialEq for Quaternion {
    fn eq(&self, other: &Self) -> bool {
        (self.w - other.w).abs() < EPSILON
            && (self.x - other.x).abs() < EPSILON
            && (self.y - other.y).abs() < EPSILON
            && (self.z - other.z).abs() < EPSILON
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl Quaternion {
    /// Create a new quaternion, automatically normalized.
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }.normalize()
    }

    /// Identity quaternion (1, 0, 0, 0).
    pub fn identity() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Rotation of `degrees` about `axis` (need not be unit length).
    pub fn from_axis_angle(axis: [f64; 3], degrees: f64) -> Self {
        let norm = (axis[0] * axis[0] + axis[1] * axis[1] + axis[2] * axis[2]).sqrt();
        if norm < EPSILON {
            return Self::identity();
        }
        let half = degrees.to_radians() / 2.0;
        let s = half.sin() / norm;
        Self {
            w: half.cos(),
            x: axis[0] * s,
            y: axis[1] * s,
            z: axis[2] * s,
        }
    }

    /// Rotation for history records written before rotations were stored:
    /// `180° - heading` about the up axis.
    pub fn from_legacy_heading(heading: f64) -> Self {
        Self::from_axis_angle([0.0, 1.0, 0.0], 180.0 - heading)
    }

    /// Normalize to unit length. Returns identity if near-zero magnitude.
    pub fn normalize(self) -> Self {
        let norm = (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt();
        if norm < EPSILON {
            return Self::identity();
        }
        Self {
            w: self.w / norm,
            x: self.x / norm,
            y: self.y / norm,
            z: self.z / norm,
        }
    }

    /// 4D dot product.
    pub fn dot(self, other: Self) -> f64 {
        self.w * other.w + self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// True when this rotation is (numerically) the identity rotation.
    /// q and -q are treated as the same rotation.
    pub fn is_identity(self) -> bool {
        self.dot(Self::identity()).abs() > 1.0 - 1e-6
    }

    /// Convert to [x, y, z, w] array.
    pub fn to_array(self) -> [f64; 4] {
        [self.x, self.y, self.z, self.w]
    }

    /// Create from [x, y, z, w] array without normalizing.
    pub fn from_array(arr: [f64; 4]) -> Self {
        Self {
            x: arr[0],
            y: arr[1],
            z: arr[2],
            w: arr[3],
        }
    }

    pub fn is_finite(self) -> bool {
        self.to_array().iter().all(|c| c.is_finite())
    }
}

impl std::ops::Neg for Quaternion {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            w: -self.w,
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

/// Hamilton product (quaternion multiplication).
impl Mul for Quaternion {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self {
            w: self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            x: self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            y: self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            z: self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_unit(q: Quaternion) {
        let norm = (q.w * q.w + q.x * q.x + q.y * q.y + q.z * q.z).sqrt();
        assert!(
            (norm - 1.0).abs() < 1e-10,
            "quaternion not unit: norm = {norm}"
        );
    }

    #[test]
    fn test_normalize() {
        let q = Quaternion::new(2.0, 0.0, 0.0, 0.0);
        assert_unit(q);
        assert!((q.w - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_normalize_near_zero() {
        let q = Quaternion::new(0.0, 0.0, 0.0, 0.0);
        assert_eq!(q, Quaternion::identity());
    }

    #[test]
    fn test_identity_detection_handles_antipode() {
        assert!(Quaternion::identity().is_identity());
        assert!((-Quaternion::identity()).is_identity());
        assert!(!Quaternion::from_axis_angle([0.0, 1.0, 0.0], 10.0).is_identity());
    }

    #[test]
    fn test_axis_angle_quarter_turn() {
        let q = Quaternion::from_axis_angle([0.0, 2.0, 0.0], 90.0);
        assert_unit(q);
        assert_abs_diff_eq!(q.w, (45f64).to_radians().cos(), epsilon = 1e-12);
        assert_abs_diff_eq!(q.y, (45f64).to_radians().sin(), epsilon = 1e-12);
    }

    #[test]
    fn test_legacy_heading_zero_faces_south() {
        // heading 0 → 180° about up
        let q = Quaternion::from_legacy_heading(0.0);
        assert!(q.w.abs() < 1e-12);
        assert!((q.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_legacy_heading_180_is_identity() {
        assert!(Quaternion::from_legacy_heading(180.0).is_identity());
    }

    #[test]
    fn test_hamilton_product_composes_angles() {
        let a = Quaternion::from_axis_angle([0.0, 1.0, 0.0], 30.0);
        let b = Quaternion::from_axis_angle([0.0, 1.0, 0.0], 60.0);
        let ab = a * b;
        assert_unit(ab);
        let quarter = Quaternion::from_axis_angle([0.0, 1.0, 0.0], 90.0);
        assert_abs_diff_eq!(ab.dot(quarter), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_from_array_keeps_raw_values() {
        let q = Quaternion::from_array([0.0, 0.0, 0.0, 2.0]);
        assert_eq!(q.to_array(), [0.0, 0.0, 0.0, 2.0]);
    }

    #[test]
    fn test_serialized_field_order() {
        let json = serde_json::to_string(&Quaternion::identity()).unwrap();
        assert_eq!(json, r#"{"x":0.0,"y":0.0,"z":0.0,"w":1.0}"#);
    }
}

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A point in the scene frame, in meters.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn example() -> Self {
        Self::new(0.1, 0.0, -0.1)
    }

    /// Rotates this position by the given orientation, or by its
    /// inverse when `inverse` is set.
    pub fn rotated(&self, rot: &Orientation, inverse: bool) -> Position {
        let q = if inverse {
            rot.normalized().inverse()
        } else {
            rot.normalized()
        };

        // Quaternion-vector rotation: q * (v, 0) * q⁻¹.
        let Orientation { x, y, z, w } = q;
        let (vx, vy, vz) = (self.x, self.y, self.z);

        let tx = 2.0 * (y * vz - z * vy);
        let ty = 2.0 * (z * vx - x * vz);
        let tz = 2.0 * (x * vy - y * vx);

        Position {
            x: vx + w * tx + (y * tz - z * ty),
            y: vy + w * ty + (z * tx - x * tz),
            z: vz + w * tz + (x * ty - y * tx),
        }
    }
}

/// A rotation, as a (not necessarily unit) quaternion.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Orientation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Orientation {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

impl Orientation {
    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    pub fn example() -> Self {
        Self::default()
    }

    /// Unit-norm form of this orientation. A degenerate zero quaternion
    /// normalizes to the identity.
    pub fn normalized(&self) -> Orientation {
        let norm = (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt();

        if norm == 0.0 {
            return Orientation::default();
        }

        Orientation {
            x: self.x / norm,
            y: self.y / norm,
            z: self.z / norm,
            w: self.w / norm,
        }
    }

    pub fn inverse(&self) -> Orientation {
        let n = self.normalized();
        Orientation {
            x: -n.x,
            y: -n.y,
            z: -n.z,
            w: n.w,
        }
    }

    /// Approximate equality of the rotations the two quaternions denote.
    /// q and -q are the same rotation.
    pub fn close_to(&self, other: &Orientation) -> bool {
        const TOLERANCE: f64 = 1e-8;

        let a = self.normalized();
        let b = other.normalized();

        let direct = (a.x - b.x).abs() + (a.y - b.y).abs() + (a.z - b.z).abs() + (a.w - b.w).abs();
        let negated = (a.x + b.x).abs() + (a.y + b.y).abs() + (a.z + b.z).abs() + (a.w + b.w).abs();

        direct < TOLERANCE || negated < TOLERANCE
    }
}

/// A rigid-body transform in the scene frame.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Pose {
    pub position: Position,
    pub orientation: Orientation,
}

impl Pose {
    pub fn new(position: Position, orientation: Orientation) -> Self {
        Self {
            position,
            orientation,
        }
    }

    pub fn example() -> Self {
        Self::new(Position::example(), Orientation::example())
    }
}

/// A single named robot joint and its value in radians.
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Joint {
    pub name: String,
    pub value: f64,
}

impl Joint {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_normalized() {
        let ori = Orientation::new(0.0, 0.0, 0.0, 2.0);
        assert_eq!(ori.normalized(), Orientation::default());

        let zero = Orientation::new(0.0, 0.0, 0.0, 0.0);
        assert_eq!(zero.normalized(), Orientation::default());

        let ori = Orientation::new(1.0, 1.0, 1.0, 1.0).normalized();
        assert!((ori.x - 0.5).abs() < 1e-12);
        assert!((ori.w - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_close_to() {
        let a = Orientation::new(0.0, 0.0, 0.0, 1.0);
        let b = Orientation::new(0.0, 0.0, 0.0, -1.0);
        assert!(a.close_to(&b));
        assert!(a.close_to(&Orientation::new(0.0, 0.0, 0.0, 2.0)));

        let c = Orientation::new(1.0, 0.0, 0.0, 0.0);
        assert!(!a.close_to(&c));
    }

    #[test]
    fn test_rotated() {
        // Quarter turn about z maps x onto y.
        let half = std::f64::consts::FRAC_PI_4;
        let rot = Orientation::new(0.0, 0.0, half.sin(), half.cos());
        let out = Position::new(1.0, 0.0, 0.0).rotated(&rot, false);

        assert!((out.x - 0.0).abs() < 1e-12);
        assert!((out.y - 1.0).abs() < 1e-12);
        assert!((out.z - 0.0).abs() < 1e-12);

        let back = out.rotated(&rot, true);
        assert!((back.x - 1.0).abs() < 1e-12);
        assert!((back.y - 0.0).abs() < 1e-12);
    }
}

//! Authoring-space math.
//!
//! Assemblage content is authored in TOML, so vectors serialize as plain
//! `[x, y, z]` arrays rather than objects.

use serde::{Deserialize, Serialize};

/// 3D Vector - position, euler angles, scale
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Vec3 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
}

impl Vec3 {
    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// All ones (identity scale)
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);

    /// Creates a new Vec3
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Converts to array
    #[must_use]
    pub const fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Creates from array
    #[must_use]
    pub const fn from_array(arr: [f32; 3]) -> Self {
        Self::new(arr[0], arr[1], arr[2])
    }

    /// Rotates the vector about the Y axis by `quarter_turns` * 90 degrees.
    ///
    /// Exact for the four cardinal rotations, no trig involved.
    #[must_use]
    pub const fn rotated_quarter_turns(self, quarter_turns: u8) -> Self {
        match quarter_turns % 4 {
            0 => self,
            1 => Self::new(self.z, self.y, -self.x),
            2 => Self::new(-self.x, self.y, -self.z),
            _ => Self::new(-self.z, self.y, self.x),
        }
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from(arr: [f32; 3]) -> Self {
        Self::from_array(arr)
    }
}

impl From<Vec3> for [f32; 3] {
    fn from(v: Vec3) -> Self {
        v.to_array()
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Local transform - position + euler rotation (degrees) + scale
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    /// Position relative to the parent node
    pub position: Vec3,
    /// Euler rotation in degrees (pitch, yaw, roll)
    pub rotation: Vec3,
    /// Per-axis scale
    pub scale: Vec3,
}

impl Transform {
    /// Identity transform
    pub const IDENTITY: Self = Self::new(Vec3::ZERO, Vec3::ZERO, Vec3::ONE);

    /// Creates a new transform
    #[must_use]
    pub const fn new(position: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Translation-only transform.
    #[must_use]
    pub const fn from_position(position: Vec3) -> Self {
        Self::new(position, Vec3::ZERO, Vec3::ONE)
    }

    /// Translation plus a yaw of `quarter_turns` * 90 degrees.
    #[must_use]
    pub fn from_position_yaw(position: Vec3, quarter_turns: u8) -> Self {
        let yaw = f32::from(quarter_turns % 4) * 90.0;
        Self::new(position, Vec3::new(0.0, yaw, 0.0), Vec3::ONE)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

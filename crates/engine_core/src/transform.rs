//! Placement transform for sky entities.
//!
//! Clouds only ever turn about the vertical axis and scale uniformly, so the
//! transform stores a yaw angle and a scalar instead of a full quaternion.

use glam::{Quat, Vec3};

/// Position, yaw (radians about +Y) and uniform scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub yaw: f32,
    pub scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            yaw: 0.0,
            scale: 1.0,
        }
    }
}

impl Transform {
    /// Create a new transform at the given position.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Rotation as a quaternion.
    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw)
    }

    /// Map a point from local space into world space.
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation() * (local * self.scale)
    }

    /// Get the forward direction (negative Z in right-handed coordinates).
    pub fn forward(&self) -> Vec3 {
        self.rotation() * -Vec3::Z
    }

    /// Translate the transform by a delta.
    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }

    /// Horizontal (XZ) distance to a point.
    pub fn horizontal_distance(&self, point: Vec3) -> f32 {
        let d = self.position - point;
        (d.x * d.x + d.z * d.z).sqrt()
    }
}

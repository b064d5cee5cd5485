//! World-space transform: position, rotation (quaternion), scale.
//!
//! `Transform` is `Copy` and `Default`, making it easy to embed in any
//! struct.  Positions are kept in double precision because culling compares
//! squared distances right at the keep/discard boundary; call `.matrix()`
//! to get the single-precision model matrix for upload to the GPU.

use glam::{DMat4, DQuat, DVec3, Mat4};

/// World-space transform component.
///
/// # Example
/// ```rust,ignore
/// use ferrous_core::Transform;
/// use glam::DVec3;
///
/// let t = Transform::from_position(DVec3::new(1.0, 0.0, 0.0));
/// let m = t.matrix(); // ready to upload as a model uniform
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// World-space position.
    pub position: DVec3,
    /// Orientation as a unit quaternion.
    pub rotation: DQuat,
    /// Non-uniform scale factor.
    pub scale: DVec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// Identity transform — no translation, no rotation, uniform scale 1.
    pub const IDENTITY: Self = Self {
        position: DVec3::ZERO,
        rotation: DQuat::IDENTITY,
        scale: DVec3::ONE,
    };

    /// Construct with a world-space position, identity rotation and scale.
    pub fn from_position(position: DVec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Construct with a position and a look-at rotation.
    ///
    /// `target` — the point to face; `up` — world-up hint (usually `DVec3::Y`).
    pub fn looking_at(position: DVec3, target: DVec3, up: DVec3) -> Self {
        let dir = (target - position).normalize_or_zero();
        // If dir is zero (position == target) keep identity rotation
        let rotation = if dir.length_squared() < 1e-20 {
            DQuat::IDENTITY
        } else {
            DMat4::look_at_rh(position, target, up)
                .to_scale_rotation_translation()
                .1
                .inverse()
        };
        Self {
            position,
            rotation,
            scale: DVec3::ONE,
        }
    }

    /// Build the TRS model matrix (`T * R * S`) in single precision.
    pub fn matrix(&self) -> Mat4 {
        DMat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
            .as_mat4()
    }

    /// Column-major model matrix flattened for a 16-value uniform payload.
    pub fn uniform_data(&self) -> [f32; 16] {
        self.matrix().to_cols_array()
    }

    /// Rotate by `angle` radians around the given world-space axis.
    pub fn rotate_axis(&mut self, axis: DVec3, angle: f64) {
        self.rotation = DQuat::from_axis_angle(axis, angle) * self.rotation;
    }

    /// Rotate around the world Y axis (yaw).
    pub fn rotate_y(&mut self, angle: f64) {
        self.rotate_axis(DVec3::Y, angle);
    }

    /// Applies only the rotation to `point` (no translation, no scale).
    #[inline]
    pub fn rotate_point(&self, point: DVec3) -> DVec3 {
        self.rotation * point
    }

    /// Squared distance from this transform's position to `point`.
    #[inline]
    pub fn distance_squared(&self, point: DVec3) -> f64 {
        self.position.distance_squared(point)
    }
}

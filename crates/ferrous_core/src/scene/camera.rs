use glam::DVec3;

use crate::transform::Transform;

/// The two geometric queries culling needs from a camera.
///
/// Anything that can rotate a point by its orientation and measure squared
/// distance from its position can act as a viewpoint; [`Camera`] is the
/// stock implementation but scene layers are free to supply their own.
pub trait Viewpoint {
    /// World-space position of the viewpoint.
    fn position(&self) -> DVec3;

    /// Applies the viewpoint orientation to `point`.
    fn rotate_point(&self, point: DVec3) -> DVec3;

    /// Squared distance from the viewpoint position to `point`.
    fn distance_squared(&self, point: DVec3) -> f64 {
        self.position().distance_squared(point)
    }
}

impl Viewpoint for Transform {
    fn position(&self) -> DVec3 {
        self.position
    }

    fn rotate_point(&self, point: DVec3) -> DVec3 {
        Transform::rotate_point(self, point)
    }

    fn distance_squared(&self, point: DVec3) -> f64 {
        Transform::distance_squared(self, point)
    }
}

/// Camera pose seen by culling.  Projection is owned by whoever builds the
/// view matrices; only position and orientation matter here.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Camera {
    pub transform: Transform,
}

impl Camera {
    /// Camera at `position` with identity orientation (looking down −Z).
    pub fn at(position: DVec3) -> Self {
        Self {
            transform: Transform::from_position(position),
        }
    }

    /// Camera at `position` facing `target`, with +Y as up.
    pub fn looking_at(position: DVec3, target: DVec3) -> Self {
        Self {
            transform: Transform::looking_at(position, target, DVec3::Y),
        }
    }
}

impl Viewpoint for Camera {
    fn position(&self) -> DVec3 {
        self.transform.position
    }

    fn rotate_point(&self, point: DVec3) -> DVec3 {
        self.transform.rotate_point(point)
    }
}

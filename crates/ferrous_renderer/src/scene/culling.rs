/// Visibility culling: a CPU-side keep/discard test for candidate positions.
///
/// ## Strategies
///
/// * [`RadiusCull`] keeps everything within `r` of the camera.
/// * [`FrontCull`] keeps a sphere of radius `r` whose centre is pushed
///   `0.8 r` ahead of the camera along its view direction, so most of the
///   kept region lies in front of the viewer while objects just behind the
///   camera still survive a quick turn.
///
/// Both compare squared distances; no square roots are taken per object.
/// A negative radius is treated as zero.
use ferrous_core::config::{CullKind, CullSettings};
use ferrous_core::Viewpoint;
use glam::DVec3;

/// Keep/discard predicate for one camera.
pub trait Culler {
    /// `true` when the point `(x, y, z)` should not be drawn this frame.
    fn culled(&self, camera: &dyn Viewpoint, x: f64, y: f64, z: f64) -> bool;
}

// ── FrontCull ────────────────────────────────────────────────────────────────

/// How far ahead of the camera, in radii, the kept sphere is centred.
pub const LOOK_AHEAD: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrontCull {
    radius: f64,
    radius_sq: f64,
}

impl FrontCull {
    pub fn new(radius: f64) -> Self {
        let mut cull = Self {
            radius: 0.0,
            radius_sq: 0.0,
        };
        cull.set_radius(radius);
        cull
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn set_radius(&mut self, radius: f64) {
        self.radius = radius.max(0.0);
        self.radius_sq = self.radius * self.radius;
    }
}

impl Culler for FrontCull {
    fn culled(&self, camera: &dyn Viewpoint, x: f64, y: f64, z: f64) -> bool {
        let ahead = camera.rotate_point(DVec3::new(0.0, 0.0, -self.radius * LOOK_AHEAD));
        let centre = camera.position() + ahead;
        centre.distance_squared(DVec3::new(x, y, z)) > self.radius_sq
    }
}

// ── RadiusCull ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusCull {
    radius: f64,
    radius_sq: f64,
}

impl RadiusCull {
    pub fn new(radius: f64) -> Self {
        let mut cull = Self {
            radius: 0.0,
            radius_sq: 0.0,
        };
        cull.set_radius(radius);
        cull
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn set_radius(&mut self, radius: f64) {
        self.radius = radius.max(0.0);
        self.radius_sq = self.radius * self.radius;
    }
}

impl Culler for RadiusCull {
    fn culled(&self, camera: &dyn Viewpoint, x: f64, y: f64, z: f64) -> bool {
        camera.distance_squared(DVec3::new(x, y, z)) > self.radius_sq
    }
}

/// Builds the culler `settings` asks for; `CullKind::None` yields `None`.
pub fn from_settings(settings: &CullSettings) -> Option<Box<dyn Culler>> {
    match settings.kind {
        CullKind::None => None,
        CullKind::Front => Some(Box::new(FrontCull::new(settings.radius))),
        CullKind::Radius => Some(Box::new(RadiusCull::new(settings.radius))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrous_core::{Camera, Transform};

    const EPS: f64 = 1e-6;

    fn origin() -> Camera {
        Camera::at(DVec3::ZERO)
    }

    #[test]
    fn front_boundary_ahead_and_behind() {
        let cam = origin();
        let c = FrontCull::new(10.0);
        // kept sphere is centred on (0, 0, -8)
        assert!(!c.culled(&cam, 0.0, 0.0, -18.0));
        assert!(c.culled(&cam, 0.0, 0.0, -18.0 - EPS));
        assert!(!c.culled(&cam, 0.0, 0.0, 2.0));
        assert!(c.culled(&cam, 0.0, 0.0, 2.0 + EPS));
        assert!(!c.culled(&cam, 0.0, 0.0, -8.0));
    }

    #[test]
    fn front_follows_camera_orientation() {
        let mut cam = origin();
        cam.transform.rotate_y(std::f64::consts::FRAC_PI_2);
        let c = FrontCull::new(10.0);
        // looking down -X now
        assert!(!c.culled(&cam, -17.0, 0.0, 0.0));
        assert!(c.culled(&cam, 0.0, 0.0, -17.0));
    }

    #[test]
    fn front_uses_camera_position() {
        let cam = Transform::from_position(DVec3::new(100.0, 0.0, 0.0));
        let c = FrontCull::new(1.0);
        assert!(!c.culled(&cam, 100.0, 0.0, -0.8));
        assert!(c.culled(&cam, 0.0, 0.0, -0.8));
    }

    #[test]
    fn radius_boundary() {
        let cam = origin();
        let c = RadiusCull::new(5.0);
        assert!(!c.culled(&cam, 3.0, 4.0, 0.0));
        assert!(!c.culled(&cam, 3.0, 3.0, 0.0));
        assert!(c.culled(&cam, 4.0, 4.0, 0.0));
    }

    #[test]
    fn negative_radius_keeps_only_centre() {
        let cam = origin();
        for c in [
            Box::new(RadiusCull::new(-2.0)) as Box<dyn Culler>,
            Box::new(FrontCull::new(-2.0)),
        ] {
            assert!(!c.culled(&cam, 0.0, 0.0, 0.0));
            assert!(c.culled(&cam, EPS, 0.0, 0.0));
            assert!(c.culled(&cam, 0.0, 0.0, -1.0));
        }
        assert_eq!(RadiusCull::new(-2.0).radius(), 0.0);
    }

    #[test]
    fn settings_factory() {
        let none = CullSettings::default();
        assert!(from_settings(&none).is_none());

        let radius = CullSettings {
            kind: CullKind::Radius,
            radius: 5.0,
        };
        let c = from_settings(&radius).unwrap();
        assert!(c.culled(&origin(), 4.0, 4.0, 0.0));
    }
}

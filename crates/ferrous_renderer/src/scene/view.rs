use ferrous_core::config::CullSettings;
use ferrous_core::Camera;
use glam::DVec3;

use super::culling::{self, Culler};

/// A camera together with the culling strategy applied to it.
pub struct View {
    pub camera: Camera,
    culler: Option<Box<dyn Culler>>,
}

impl View {
    /// A view that keeps everything.
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            culler: None,
        }
    }

    pub fn from_settings(camera: Camera, settings: &CullSettings) -> Self {
        Self {
            camera,
            culler: culling::from_settings(settings),
        }
    }

    pub fn with_culler(mut self, culler: impl Culler + 'static) -> Self {
        self.culler = Some(Box::new(culler));
        self
    }

    pub fn set_culler(&mut self, culler: Option<Box<dyn Culler>>) {
        self.culler = culler;
    }

    pub fn has_culler(&self) -> bool {
        self.culler.is_some()
    }

    /// `true` unless the culler rejects `position`.
    pub fn keeps(&self, position: DVec3) -> bool {
        match &self.culler {
            Some(c) => !c.culled(&self.camera, position.x, position.y, position.z),
            None => true,
        }
    }
}

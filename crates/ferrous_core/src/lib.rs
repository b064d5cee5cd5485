// ferrous_core: tipos básicos y utilidades

pub mod config;
pub mod logging;
pub mod scene;
pub mod transform;

pub use config::{ApiVersion, CullKind, CullSettings, EngineConfig, RenderSettings};
pub use scene::{Camera, Viewpoint};
pub use transform::Transform;

// callers get the exact math types the renderer speaks without a direct dependency
pub use glam;

/// `ferrous_renderer` binds meshes, shaders and textures to an immediate
/// mode graphics device and submits culled draws each frame.
///
/// # Module layout
///
/// | Module          | Responsibility                                          |
/// |-----------------|---------------------------------------------------------|
/// | `device`        | `Device` trait, typed handles, recording + GL devices   |
/// | `geometry`      | Vertex/face channels, `Mesh`, `MeshLibrary`, primitives |
/// | `shader`        | Shader sources and resolved uniform locations           |
/// | `binder`        | `Binder`: state cache, mesh/shader/texture binding      |
/// | `render_target` | Off-screen color layers and shadow maps                 |
/// | `draw`          | `Draw` descriptions, `Frame` submission and reporting   |
/// | `scene`         | Visibility culling against a camera                     |
/// | `error`         | `RenderError`, per-draw `BindingAnomaly`                |
pub mod binder;
pub mod device;
pub mod draw;
pub mod error;
pub mod geometry;
pub mod render_target;
pub mod scene;
pub mod shader;

// ── Public re-exports ─────────────────────────────────────────────────────────

pub use glam;

pub use binder::{Binder, PixelLayout, Pixels};
pub use device::{Device, RecordingDevice};
pub use draw::{Draw, Frame, FrameReport};
pub use error::{BindingAnomaly, FrameFailure, RenderError};
pub use geometry::{Mesh, MeshLibrary, Usage};
pub use render_target::{RenderTarget, ShadowTarget};
pub use scene::{Culler, FrontCull, RadiusCull, View};
pub use shader::{Shader, ShaderSource};

//! The graphics device seam.
//!
//! [`Device`] is a thin, typed layer over an OpenGL-style immediate-mode
//! API.  It holds no policy: which calls to make and when to skip them is
//! the binder's job.  Two implementations ship with the crate:
//!
//! | Type              | Use                                           |
//! |-------------------|-----------------------------------------------|
//! | `RecordingDevice` | In-memory log of calls; tests and headless   |
//! | `GlDevice`        | OpenGL 3.2+ via `glow` (feature `gl`)         |

pub mod handle;
pub mod recording;

#[cfg(feature = "gl")]
pub mod gl;

pub use handle::{
    BufferId, FramebufferId, ProgramId, RenderbufferId, TextureId, UniformLocation, VertexArrayId,
};
pub use recording::{DeviceCall, RecordedUniform, RecordingDevice};

#[cfg(feature = "gl")]
pub use gl::GlDevice;

use ferrous_core::ApiVersion;

use crate::error::RenderError;
use crate::geometry::{FaceChannel, VertexChannel};
use crate::shader::ShaderSource;

// ── Enumerations ─────────────────────────────────────────────────────────────

/// Toggleable fixed-function state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Blend,
    CullFace,
    DepthTest,
    ScissorTest,
    /// Lets the vertex shader write the point size.
    ProgramPointSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonMode {
    Fill,
    Line,
}

/// How indices (or vertices) are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Primitive {
    #[default]
    Triangles,
    Lines,
    Points,
}

/// Pixel rectangle in window coordinates, origin bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScissorRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Values a uniform slot accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue<'a> {
    /// Sampler unit or integer flag.
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    /// One column-major 4×4 matrix.
    Mat4(&'a [f32; 16]),
    /// `count` consecutive 3×4 matrices (bone poses).
    Mat3x4 { data: &'a [f32], count: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureWrap {
    Repeat,
    ClampToEdge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFilter {
    Nearest,
    Linear,
    NearestMipmapLinear,
}

/// Sampling state of one texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sampling {
    pub wrap: TextureWrap,
    pub mag: TextureFilter,
    pub min: TextureFilter,
    /// Highest mip level sampled, `None` leaves the device default.
    pub max_level: Option<i32>,
    /// Hardware depth comparison (`<=`) for shadow lookups.
    pub depth_compare: bool,
}

impl Sampling {
    /// Mipmapped color texture with the given wrap mode.
    pub fn mipmapped(wrap: TextureWrap) -> Self {
        Self {
            wrap,
            mag: TextureFilter::Linear,
            min: TextureFilter::NearestMipmapLinear,
            max_level: Some(7),
            depth_compare: false,
        }
    }

    /// Unfiltered lookups into an off-screen color layer.
    pub fn layer() -> Self {
        Self {
            wrap: TextureWrap::ClampToEdge,
            mag: TextureFilter::Nearest,
            min: TextureFilter::Nearest,
            max_level: None,
            depth_compare: false,
        }
    }

    /// Filtered depth comparisons for shadow maps.
    pub fn shadow() -> Self {
        Self {
            wrap: TextureWrap::ClampToEdge,
            mag: TextureFilter::Linear,
            min: TextureFilter::Linear,
            max_level: None,
            depth_compare: true,
        }
    }
}

/// Storage for a texture that is rendered into rather than uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureStorage {
    Rgba8,
    Depth16,
}

/// What gets attached to the bound framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    Color(TextureId),
    DepthTexture(TextureId),
    DepthRenderbuffer(RenderbufferId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferStatus {
    Complete,
    /// Device-specific status code.
    Incomplete(u32),
}

// ── Device trait ─────────────────────────────────────────────────────────────

/// Immediate-mode graphics device.
///
/// Creation calls return `RenderError::Allocation` when the device is out of
/// handles; every other call is fire-and-forget and failures surface through
/// [`Device::poll_error`].
pub trait Device {
    fn label(&self) -> &str;

    /// API version, `None` when no usable context exists.
    fn version(&self) -> Option<ApiVersion>;

    /// Pops the oldest pending error code.
    fn poll_error(&mut self) -> Option<u32>;

    // -- global state ---------------------------------------------------------

    fn set_clear_color(&mut self, rgba: [f32; 4]);
    fn clear(&mut self, color: bool, depth: bool);
    fn set_viewport(&mut self, width: i32, height: i32);
    fn set_capability(&mut self, capability: Capability, enabled: bool);
    /// Non-premultiplied alpha blending: `src_alpha, 1 - src_alpha`.
    fn set_alpha_blend_func(&mut self);
    fn set_scissor_rect(&mut self, rect: ScissorRect);
    fn set_polygon_mode(&mut self, mode: PolygonMode);

    // -- geometry -------------------------------------------------------------

    fn create_vertex_array(&mut self) -> Result<VertexArrayId, RenderError>;
    /// `UNALLOCATED` unbinds.
    fn bind_vertex_array(&mut self, vao: VertexArrayId);
    fn delete_vertex_array(&mut self, vao: VertexArrayId);
    fn create_buffer(&mut self) -> Result<BufferId, RenderError>;
    fn delete_buffer(&mut self, buffer: BufferId);
    /// Copies `channel` into its buffer and points the channel's attribute
    /// slot(s) of the bound vertex array at it.
    fn upload_vertex_channel(&mut self, channel: &VertexChannel);
    /// Copies `faces` into its buffer as the bound vertex array's indices.
    fn upload_face_channel(&mut self, faces: &FaceChannel);

    // -- programs -------------------------------------------------------------

    /// Compiles and links; `Err` carries the compiler or linker log.
    fn compile_program(&mut self, source: &ShaderSource) -> Result<ProgramId, String>;
    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    fn attribute_location(&mut self, program: ProgramId, name: &str) -> Option<u32>;
    fn use_program(&mut self, program: ProgramId);
    fn delete_program(&mut self, program: ProgramId);
    /// Writes to the program in use.
    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue<'_>);

    // -- textures -------------------------------------------------------------

    fn create_texture(&mut self) -> Result<TextureId, RenderError>;
    /// Binds `texture` to sampler `unit`.
    fn bind_texture(&mut self, unit: u32, texture: TextureId);
    /// Uploads 8-bit RGBA rows, bottom row first.
    fn upload_texture(&mut self, texture: TextureId, width: u32, height: u32, rgba: &[u8]);
    fn allocate_texture_storage(&mut self, texture: TextureId, storage: TextureStorage, size: u32);
    fn generate_mipmaps(&mut self, texture: TextureId);
    fn set_sampling(&mut self, texture: TextureId, sampling: Sampling);
    fn delete_texture(&mut self, texture: TextureId);

    // -- framebuffers ---------------------------------------------------------

    fn create_framebuffer(&mut self) -> Result<FramebufferId, RenderError>;
    /// `UNALLOCATED` selects the window framebuffer.
    fn bind_framebuffer(&mut self, framebuffer: FramebufferId);
    fn delete_framebuffer(&mut self, framebuffer: FramebufferId);
    fn create_renderbuffer(&mut self) -> Result<RenderbufferId, RenderError>;
    fn allocate_depth_renderbuffer(&mut self, renderbuffer: RenderbufferId, size: u32);
    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferId);
    /// Attaches to the bound framebuffer.
    fn attach(&mut self, attachment: Attachment);
    /// `true` routes fragment output to the color attachment, `false`
    /// disables color writes (depth-only targets).
    fn set_color_output(&mut self, enabled: bool);
    fn framebuffer_status(&mut self) -> FramebufferStatus;

    // -- drawing --------------------------------------------------------------

    /// Draws `count` 16-bit indices from the bound vertex array.
    fn draw_elements(&mut self, primitive: Primitive, count: u32);
    fn draw_elements_instanced(&mut self, primitive: Primitive, count: u32, instances: u32);
    fn draw_arrays(&mut self, primitive: Primitive, count: u32);
}

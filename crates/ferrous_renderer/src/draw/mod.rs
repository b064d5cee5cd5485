/// Draw submission.
///
/// A [`Draw`] is built per visible object per frame and handed to
/// [`Frame::submit`].  It borrows the shader and bone poses, so building one
/// costs only the uniform map.
pub mod frame;
mod submit;

pub use frame::{Frame, FrameReport};

use std::collections::HashMap;

use crate::device::{FramebufferId, Primitive, ScissorRect, TextureId, VertexArrayId};
use crate::geometry::Mesh;
use crate::render_target::RenderTarget;
use crate::shader::Shader;

/// Uniform receiving the bone pose array (3×4 matrices).
pub const BONE_POSE_UNIFORM: &str = "bpos";
/// Sampler uniform receiving the shadow map.
pub const SHADOW_MAP_UNIFORM: &str = "sm";
/// Prefix of sampler uniforms; `uv0`, `uv1`, … pick the texture by order.
pub const SAMPLER_PREFIX: &str = "uv";

/// Name carried by a `DeviceError` anomaly raised by state switches or the
/// draw call rather than by a uniform.
pub const DRAW_CALL: &str = "<draw>";

/// Floats per bone pose.
pub const POSE_FLOATS: usize = 12;

/// A texture and the sampler index it binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureRef {
    pub texture: TextureId,
    pub order: u32,
}

/// Everything needed to draw one object once.
#[derive(Debug, Clone)]
pub struct Draw<'a> {
    /// Model identifier used in diagnostics.
    pub tag: u32,
    pub shader: &'a Shader,
    pub vao: VertexArrayId,
    pub primitive: Primitive,
    /// Index count for `Triangles` and `Lines`.
    pub face_count: u32,
    /// Vertex count for `Points`.
    pub vertex_count: u32,
    /// 0 draws once without instancing.
    pub instances: u32,
    pub poses: Option<&'a [f32]>,
    pub textures: Vec<TextureRef>,
    pub shadow_map: TextureId,
    pub uniforms: HashMap<String, Vec<f32>>,
    pub scissor: Option<ScissorRect>,
    /// `UNALLOCATED` draws to the window.
    pub framebuffer: FramebufferId,
    pub depth_test: bool,
}

impl<'a> Draw<'a> {
    /// Triangles from `mesh` with depth testing, to the window.  Counts come
    /// from the mesh's current data.
    pub fn new(tag: u32, shader: &'a Shader, mesh: &Mesh) -> Self {
        let (faces, verts) = mesh.counts();
        Self {
            tag,
            shader,
            vao: mesh.vao(),
            primitive: Primitive::Triangles,
            face_count: faces as u32,
            vertex_count: verts as u32,
            instances: mesh.instance_count() as u32,
            poses: None,
            textures: Vec::new(),
            shadow_map: TextureId::UNALLOCATED,
            uniforms: HashMap::new(),
            scissor: None,
            framebuffer: FramebufferId::UNALLOCATED,
            depth_test: true,
        }
    }

    pub fn with_primitive(mut self, primitive: Primitive) -> Self {
        self.primitive = primitive;
        self
    }

    pub fn with_uniform(mut self, name: impl Into<String>, values: impl Into<Vec<f32>>) -> Self {
        self.uniforms.insert(name.into(), values.into());
        self
    }

    pub fn with_texture(mut self, texture: TextureId, order: u32) -> Self {
        self.textures.push(TextureRef { texture, order });
        self
    }

    pub fn with_shadow_map(mut self, texture: TextureId) -> Self {
        self.shadow_map = texture;
        self
    }

    pub fn with_poses(mut self, poses: &'a [f32]) -> Self {
        self.poses = Some(poses);
        self
    }

    pub fn with_instances(mut self, instances: u32) -> Self {
        self.instances = instances;
        self
    }

    pub fn with_scissor(mut self, rect: ScissorRect) -> Self {
        self.scissor = Some(rect);
        self
    }

    pub fn into_target(mut self, target: &RenderTarget) -> Self {
        self.framebuffer = target.framebuffer;
        self
    }

    pub fn with_framebuffer(mut self, framebuffer: FramebufferId) -> Self {
        self.framebuffer = framebuffer;
        self
    }

    pub fn with_depth_test(mut self, enabled: bool) -> Self {
        self.depth_test = enabled;
        self
    }
}

//! OpenGL 3.2+ device on top of `glow`.
//!
//! The caller owns the context (window, surface, make-current); this type
//! only issues calls on it.  All `unsafe` in the crate lives here: every
//! call is a plain GL entry point on a context the caller guarantees to be
//! current on this thread.

use std::num::NonZeroU32;

use ferrous_core::ApiVersion;
use glow::HasContext;

use crate::error::RenderError;
use crate::geometry::{FaceChannel, Usage, VertexChannel, VertexPayload};
use crate::shader::ShaderSource;

use super::{
    Attachment, BufferId, Capability, Device, FramebufferId, FramebufferStatus, PolygonMode,
    Primitive, ProgramId, RenderbufferId, Sampling, ScissorRect, TextureFilter, TextureId,
    TextureStorage, TextureWrap, UniformLocation, UniformValue, VertexArrayId,
};

/// Bytes per row of a per-instance 4×4 float matrix.
const MATRIX_ROW_BYTES: i32 = 4 * 4;
/// Bytes of a whole 4×4 float matrix.
const MATRIX_BYTES: i32 = 4 * MATRIX_ROW_BYTES;

pub struct GlDevice {
    gl: glow::Context,
    label: String,
}

// ── Handle conversion ─────────────────────────────────────────────────────────

fn native(id: u32) -> Option<NonZeroU32> {
    NonZeroU32::new(id)
}

fn allocation(kind: &str, err: String) -> RenderError {
    RenderError::Allocation(format!("{kind}: {err}"))
}

fn usage_hint(usage: Usage) -> u32 {
    match usage {
        Usage::Static => glow::STATIC_DRAW,
        Usage::Dynamic => glow::DYNAMIC_DRAW,
    }
}

fn capability(cap: Capability) -> u32 {
    match cap {
        Capability::Blend => glow::BLEND,
        Capability::CullFace => glow::CULL_FACE,
        Capability::DepthTest => glow::DEPTH_TEST,
        Capability::ScissorTest => glow::SCISSOR_TEST,
        Capability::ProgramPointSize => glow::PROGRAM_POINT_SIZE,
    }
}

fn primitive(p: Primitive) -> u32 {
    match p {
        Primitive::Triangles => glow::TRIANGLES,
        Primitive::Lines => glow::LINES,
        Primitive::Points => glow::POINTS,
    }
}

fn filter(f: TextureFilter) -> i32 {
    (match f {
        TextureFilter::Nearest => glow::NEAREST,
        TextureFilter::Linear => glow::LINEAR,
        TextureFilter::NearestMipmapLinear => glow::NEAREST_MIPMAP_LINEAR,
    }) as i32
}

impl GlDevice {
    /// Wraps a current context.
    pub fn new(gl: glow::Context) -> Self {
        let label = unsafe {
            format!(
                "{} ({})",
                gl.get_parameter_string(glow::RENDERER),
                gl.get_parameter_string(glow::VERSION)
            )
        };
        log::info!("GL device: {label}");
        Self { gl, label }
    }

    pub fn context(&self) -> &glow::Context {
        &self.gl
    }

    fn buffer(id: BufferId) -> Option<glow::NativeBuffer> {
        native(id.0).map(glow::NativeBuffer)
    }

    fn texture(id: TextureId) -> Option<glow::NativeTexture> {
        native(id.0).map(glow::NativeTexture)
    }

    fn program(id: ProgramId) -> Option<glow::NativeProgram> {
        native(id.0).map(glow::NativeProgram)
    }

    fn compile_stage(&self, stage: u32, text: &str) -> Result<glow::NativeShader, String> {
        unsafe {
            let shader = self.gl.create_shader(stage)?;
            self.gl.shader_source(shader, text);
            self.gl.compile_shader(shader);
            if !self.gl.get_shader_compile_status(shader) {
                let log = self.gl.get_shader_info_log(shader);
                self.gl.delete_shader(shader);
                return Err(log);
            }
            Ok(shader)
        }
    }

    /// Points `slot` at the bound array buffer.
    unsafe fn attribute(&self, channel: &VertexChannel) {
        let gl = &self.gl;
        match (&channel.data, channel.instanced) {
            (VertexPayload::Floats(_), true) => {
                for row in 0..4u32 {
                    let slot = channel.slot + row;
                    gl.enable_vertex_attrib_array(slot);
                    gl.vertex_attrib_pointer_f32(
                        slot,
                        4,
                        glow::FLOAT,
                        false,
                        MATRIX_BYTES,
                        row as i32 * MATRIX_ROW_BYTES,
                    );
                    // one matrix per instance, not per vertex
                    gl.vertex_attrib_divisor(slot, 1);
                }
            }
            (VertexPayload::Floats(_), false) => {
                gl.vertex_attrib_pointer_f32(
                    channel.slot,
                    channel.stride as i32,
                    glow::FLOAT,
                    false,
                    0,
                    0,
                );
                gl.enable_vertex_attrib_array(channel.slot);
            }
            (VertexPayload::Bytes(_), _) => {
                gl.vertex_attrib_pointer_f32(
                    channel.slot,
                    channel.stride as i32,
                    glow::UNSIGNED_BYTE,
                    channel.normalize,
                    0,
                    0,
                );
                gl.enable_vertex_attrib_array(channel.slot);
            }
        }
    }
}

impl Device for GlDevice {
    fn label(&self) -> &str {
        &self.label
    }

    fn version(&self) -> Option<ApiVersion> {
        let v = self.gl.version();
        // GLES reports its own numbering; treat it as unavailable.
        (!v.is_embedded).then(|| ApiVersion::new(v.major, v.minor))
    }

    fn poll_error(&mut self) -> Option<u32> {
        match unsafe { self.gl.get_error() } {
            glow::NO_ERROR => None,
            code => Some(code),
        }
    }

    fn set_clear_color(&mut self, [r, g, b, a]: [f32; 4]) {
        unsafe { self.gl.clear_color(r, g, b, a) }
    }

    fn clear(&mut self, color: bool, depth: bool) {
        let mut mask = 0;
        if color {
            mask |= glow::COLOR_BUFFER_BIT;
        }
        if depth {
            mask |= glow::DEPTH_BUFFER_BIT;
        }
        unsafe { self.gl.clear(mask) }
    }

    fn set_viewport(&mut self, width: i32, height: i32) {
        unsafe { self.gl.viewport(0, 0, width, height) }
    }

    fn set_capability(&mut self, cap: Capability, enabled: bool) {
        unsafe {
            if enabled {
                self.gl.enable(capability(cap));
            } else {
                self.gl.disable(capability(cap));
            }
        }
    }

    fn set_alpha_blend_func(&mut self) {
        unsafe { self.gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA) }
    }

    fn set_scissor_rect(&mut self, r: ScissorRect) {
        unsafe { self.gl.scissor(r.x, r.y, r.width, r.height) }
    }

    fn set_polygon_mode(&mut self, mode: PolygonMode) {
        let mode = match mode {
            PolygonMode::Fill => glow::FILL,
            PolygonMode::Line => glow::LINE,
        };
        unsafe { self.gl.polygon_mode(glow::FRONT_AND_BACK, mode) }
    }

    // ── geometry ──────────────────────────────────────────────────────────────

    fn create_vertex_array(&mut self) -> Result<VertexArrayId, RenderError> {
        let vao = unsafe { self.gl.create_vertex_array() }
            .map_err(|e| allocation("vertex array", e))?;
        Ok(VertexArrayId(vao.0.get()))
    }

    fn bind_vertex_array(&mut self, vao: VertexArrayId) {
        let vao = native(vao.0).map(glow::NativeVertexArray);
        unsafe { self.gl.bind_vertex_array(vao) }
    }

    fn delete_vertex_array(&mut self, vao: VertexArrayId) {
        if let Some(vao) = native(vao.0) {
            unsafe { self.gl.delete_vertex_array(glow::NativeVertexArray(vao)) }
        }
    }

    fn create_buffer(&mut self) -> Result<BufferId, RenderError> {
        let buffer = unsafe { self.gl.create_buffer() }.map_err(|e| allocation("buffer", e))?;
        Ok(BufferId(buffer.0.get()))
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if let Some(buffer) = Self::buffer(buffer) {
            unsafe { self.gl.delete_buffer(buffer) }
        }
    }

    fn upload_vertex_channel(&mut self, channel: &VertexChannel) {
        if channel.data.is_empty() {
            return;
        }
        let bytes = channel.data.as_bytes();
        unsafe {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Self::buffer(channel.buffer));
            match channel.usage {
                Usage::Static => {
                    self.gl
                        .buffer_data_u8_slice(glow::ARRAY_BUFFER, bytes, glow::STATIC_DRAW);
                }
                Usage::Dynamic => {
                    // orphan the old storage, then stream into the new one
                    self.gl
                        .buffer_data_size(glow::ARRAY_BUFFER, bytes.len() as i32, glow::DYNAMIC_DRAW);
                    self.gl.buffer_sub_data_u8_slice(glow::ARRAY_BUFFER, 0, bytes);
                }
            }
            self.attribute(channel);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }
    }

    fn upload_face_channel(&mut self, faces: &FaceChannel) {
        if faces.data.is_empty() {
            return;
        }
        unsafe {
            self.gl
                .bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Self::buffer(faces.buffer));
            self.gl.buffer_data_u8_slice(
                glow::ELEMENT_ARRAY_BUFFER,
                faces.as_bytes(),
                usage_hint(faces.usage),
            );
        }
    }

    // ── programs ──────────────────────────────────────────────────────────────

    fn compile_program(&mut self, source: &ShaderSource) -> Result<ProgramId, String> {
        let vertex = self.compile_stage(glow::VERTEX_SHADER, &source.vertex)?;
        let fragment = match self.compile_stage(glow::FRAGMENT_SHADER, &source.fragment) {
            Ok(shader) => shader,
            Err(log) => {
                unsafe { self.gl.delete_shader(vertex) };
                return Err(log);
            }
        };
        unsafe {
            let program = self.gl.create_program()?;
            self.gl.attach_shader(program, vertex);
            self.gl.attach_shader(program, fragment);
            self.gl.link_program(program);
            self.gl.detach_shader(program, vertex);
            self.gl.detach_shader(program, fragment);
            self.gl.delete_shader(vertex);
            self.gl.delete_shader(fragment);
            if !self.gl.get_program_link_status(program) {
                let log = self.gl.get_program_info_log(program);
                self.gl.delete_program(program);
                return Err(log);
            }
            Ok(ProgramId(program.0.get()))
        }
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let program = Self::program(program)?;
        unsafe { self.gl.get_uniform_location(program, name) }.map(|l| UniformLocation(l.0))
    }

    fn attribute_location(&mut self, program: ProgramId, name: &str) -> Option<u32> {
        let program = Self::program(program)?;
        unsafe { self.gl.get_attrib_location(program, name) }
    }

    fn use_program(&mut self, program: ProgramId) {
        unsafe { self.gl.use_program(Self::program(program)) }
    }

    fn delete_program(&mut self, program: ProgramId) {
        if let Some(program) = Self::program(program) {
            unsafe { self.gl.delete_program(program) }
        }
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue<'_>) {
        let loc = glow::NativeUniformLocation(location.0);
        let loc = Some(&loc);
        unsafe {
            match value {
                UniformValue::Int(v) => self.gl.uniform_1_i32(loc, v),
                UniformValue::Float(v) => self.gl.uniform_1_f32(loc, v),
                UniformValue::Vec2([x, y]) => self.gl.uniform_2_f32(loc, x, y),
                UniformValue::Vec3([x, y, z]) => self.gl.uniform_3_f32(loc, x, y, z),
                UniformValue::Vec4([x, y, z, w]) => self.gl.uniform_4_f32(loc, x, y, z, w),
                UniformValue::Mat4(m) => self.gl.uniform_matrix_4_f32_slice(loc, false, m),
                UniformValue::Mat3x4 { data, count } => {
                    let len = (count * 12).min(data.len());
                    self.gl
                        .uniform_matrix_3x4_f32_slice(loc, false, &data[..len]);
                }
            }
        }
    }

    // ── textures ──────────────────────────────────────────────────────────────

    fn create_texture(&mut self) -> Result<TextureId, RenderError> {
        let texture = unsafe { self.gl.create_texture() }.map_err(|e| allocation("texture", e))?;
        Ok(TextureId(texture.0.get()))
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(glow::TEXTURE_2D, Self::texture(texture));
        }
    }

    fn upload_texture(&mut self, texture: TextureId, width: u32, height: u32, rgba: &[u8]) {
        unsafe {
            self.gl.bind_texture(glow::TEXTURE_2D, Self::texture(texture));
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                Some(rgba),
            );
        }
    }

    fn allocate_texture_storage(&mut self, texture: TextureId, storage: TextureStorage, size: u32) {
        let (internal, format, ty) = match storage {
            TextureStorage::Rgba8 => (glow::RGBA, glow::RGBA, glow::UNSIGNED_BYTE),
            TextureStorage::Depth16 => (glow::DEPTH_COMPONENT16, glow::DEPTH_COMPONENT, glow::FLOAT),
        };
        unsafe {
            self.gl.bind_texture(glow::TEXTURE_2D, Self::texture(texture));
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal as i32,
                size as i32,
                size as i32,
                0,
                format,
                ty,
                None,
            );
        }
    }

    fn generate_mipmaps(&mut self, texture: TextureId) {
        unsafe {
            self.gl.bind_texture(glow::TEXTURE_2D, Self::texture(texture));
            self.gl.generate_mipmap(glow::TEXTURE_2D);
        }
    }

    fn set_sampling(&mut self, texture: TextureId, sampling: Sampling) {
        let wrap = (match sampling.wrap {
            TextureWrap::Repeat => glow::REPEAT,
            TextureWrap::ClampToEdge => glow::CLAMP_TO_EDGE,
        }) as i32;
        let gl = &self.gl;
        unsafe {
            gl.bind_texture(glow::TEXTURE_2D, Self::texture(texture));
            if let Some(level) = sampling.max_level {
                gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAX_LEVEL, level);
            }
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, wrap);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, wrap);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, filter(sampling.mag));
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, filter(sampling.min));
            if sampling.depth_compare {
                gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_COMPARE_FUNC, glow::LEQUAL as i32);
                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_COMPARE_MODE,
                    glow::COMPARE_REF_TO_TEXTURE as i32,
                );
            }
        }
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if let Some(texture) = Self::texture(texture) {
            unsafe { self.gl.delete_texture(texture) }
        }
    }

    // ── framebuffers ──────────────────────────────────────────────────────────

    fn create_framebuffer(&mut self) -> Result<FramebufferId, RenderError> {
        let fbo = unsafe { self.gl.create_framebuffer() }
            .map_err(|e| allocation("framebuffer", e))?;
        Ok(FramebufferId(fbo.0.get()))
    }

    fn bind_framebuffer(&mut self, framebuffer: FramebufferId) {
        let fbo = native(framebuffer.0).map(glow::NativeFramebuffer);
        unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, fbo) }
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        if let Some(fbo) = native(framebuffer.0) {
            unsafe { self.gl.delete_framebuffer(glow::NativeFramebuffer(fbo)) }
        }
    }

    fn create_renderbuffer(&mut self) -> Result<RenderbufferId, RenderError> {
        let rb = unsafe { self.gl.create_renderbuffer() }
            .map_err(|e| allocation("renderbuffer", e))?;
        Ok(RenderbufferId(rb.0.get()))
    }

    fn allocate_depth_renderbuffer(&mut self, renderbuffer: RenderbufferId, size: u32) {
        let rb = native(renderbuffer.0).map(glow::NativeRenderbuffer);
        unsafe {
            self.gl.bind_renderbuffer(glow::RENDERBUFFER, rb);
            self.gl.renderbuffer_storage(
                glow::RENDERBUFFER,
                glow::DEPTH_COMPONENT,
                size as i32,
                size as i32,
            );
        }
    }

    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferId) {
        if let Some(rb) = native(renderbuffer.0) {
            unsafe { self.gl.delete_renderbuffer(glow::NativeRenderbuffer(rb)) }
        }
    }

    fn attach(&mut self, attachment: Attachment) {
        unsafe {
            match attachment {
                Attachment::Color(texture) => self.gl.framebuffer_texture(
                    glow::FRAMEBUFFER,
                    glow::COLOR_ATTACHMENT0,
                    Self::texture(texture),
                    0,
                ),
                Attachment::DepthTexture(texture) => self.gl.framebuffer_texture(
                    glow::FRAMEBUFFER,
                    glow::DEPTH_ATTACHMENT,
                    Self::texture(texture),
                    0,
                ),
                Attachment::DepthRenderbuffer(rb) => self.gl.framebuffer_renderbuffer(
                    glow::FRAMEBUFFER,
                    glow::DEPTH_ATTACHMENT,
                    glow::RENDERBUFFER,
                    native(rb.0).map(glow::NativeRenderbuffer),
                ),
            }
        }
    }

    fn set_color_output(&mut self, enabled: bool) {
        unsafe {
            if enabled {
                self.gl.draw_buffers(&[glow::COLOR_ATTACHMENT0]);
            } else {
                self.gl.draw_buffer(glow::NONE);
            }
        }
    }

    fn framebuffer_status(&mut self) -> FramebufferStatus {
        match unsafe { self.gl.check_framebuffer_status(glow::FRAMEBUFFER) } {
            glow::FRAMEBUFFER_COMPLETE => FramebufferStatus::Complete,
            code => FramebufferStatus::Incomplete(code),
        }
    }

    // ── drawing ───────────────────────────────────────────────────────────────

    fn draw_elements(&mut self, p: Primitive, count: u32) {
        unsafe {
            self.gl
                .draw_elements(primitive(p), count as i32, glow::UNSIGNED_SHORT, 0)
        }
    }

    fn draw_elements_instanced(&mut self, p: Primitive, count: u32, instances: u32) {
        unsafe {
            self.gl.draw_elements_instanced(
                primitive(p),
                count as i32,
                glow::UNSIGNED_SHORT,
                0,
                instances as i32,
            )
        }
    }

    fn draw_arrays(&mut self, p: Primitive, count: u32) {
        unsafe { self.gl.draw_arrays(primitive(p), 0, count as i32) }
    }
}

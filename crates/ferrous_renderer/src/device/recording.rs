//! In-memory device that records every call.
//!
//! `RecordingDevice` performs no GPU work but hands out real-looking
//! handles, tracks bound state and live objects, and can be told to fail in
//! specific ways.  Tests assert on the call log; headless tools use it to
//! dry-run a frame.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use ferrous_core::ApiVersion;

use crate::error::RenderError;
use crate::geometry::{FaceChannel, Usage, VertexChannel};
use crate::shader::ShaderSource;

use super::{
    Attachment, BufferId, Capability, Device, FramebufferId, FramebufferStatus, PolygonMode,
    Primitive, ProgramId, RenderbufferId, Sampling, ScissorRect, TextureId, TextureStorage,
    UniformLocation, UniformValue, VertexArrayId,
};

/// Owned copy of a [`UniformValue`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedUniform {
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat4([f32; 16]),
    Mat3x4 { data: Vec<f32>, count: usize },
}

impl From<UniformValue<'_>> for RecordedUniform {
    fn from(value: UniformValue<'_>) -> Self {
        match value {
            UniformValue::Int(v) => RecordedUniform::Int(v),
            UniformValue::Float(v) => RecordedUniform::Float(v),
            UniformValue::Vec2(v) => RecordedUniform::Vec2(v),
            UniformValue::Vec3(v) => RecordedUniform::Vec3(v),
            UniformValue::Vec4(v) => RecordedUniform::Vec4(v),
            UniformValue::Mat4(m) => RecordedUniform::Mat4(*m),
            UniformValue::Mat3x4 { data, count } => RecordedUniform::Mat3x4 {
                data: data.to_vec(),
                count,
            },
        }
    }
}

/// One recorded device call.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    SetClearColor([f32; 4]),
    Clear { color: bool, depth: bool },
    SetViewport { width: i32, height: i32 },
    SetCapability { capability: Capability, enabled: bool },
    SetAlphaBlendFunc,
    SetScissorRect(ScissorRect),
    SetPolygonMode(PolygonMode),

    CreateVertexArray(VertexArrayId),
    BindVertexArray(VertexArrayId),
    DeleteVertexArray(VertexArrayId),
    CreateBuffer(BufferId),
    DeleteBuffer(BufferId),
    UploadVertexChannel {
        buffer: BufferId,
        slot: u32,
        stride: u32,
        usage: Usage,
        normalize: bool,
        instanced: bool,
        bytes: usize,
    },
    UploadFaceChannel { buffer: BufferId, usage: Usage, indices: usize },

    CompileProgram { name: String, program: ProgramId },
    UseProgram(ProgramId),
    DeleteProgram(ProgramId),
    SetUniform { location: UniformLocation, value: RecordedUniform },

    CreateTexture(TextureId),
    BindTexture { unit: u32, texture: TextureId },
    UploadTexture { texture: TextureId, width: u32, height: u32 },
    AllocateTextureStorage { texture: TextureId, storage: TextureStorage, size: u32 },
    GenerateMipmaps(TextureId),
    SetSampling { texture: TextureId, sampling: Sampling },
    DeleteTexture(TextureId),

    CreateFramebuffer(FramebufferId),
    BindFramebuffer(FramebufferId),
    DeleteFramebuffer(FramebufferId),
    CreateRenderbuffer(RenderbufferId),
    AllocateDepthRenderbuffer { renderbuffer: RenderbufferId, size: u32 },
    DeleteRenderbuffer(RenderbufferId),
    Attach(Attachment),
    SetColorOutput(bool),

    DrawElements { primitive: Primitive, count: u32 },
    DrawElementsInstanced { primitive: Primitive, count: u32, instances: u32 },
    DrawArrays { primitive: Primitive, count: u32 },
}

impl DeviceCall {
    pub fn is_upload(&self) -> bool {
        matches!(
            self,
            DeviceCall::UploadVertexChannel { .. } | DeviceCall::UploadFaceChannel { .. }
        )
    }

    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            DeviceCall::DrawElements { .. }
                | DeviceCall::DrawElementsInstanced { .. }
                | DeviceCall::DrawArrays { .. }
        )
    }
}

type ErrorTrigger = (Box<dyn Fn(&DeviceCall) -> bool>, u32);

pub struct RecordingDevice {
    version: Option<ApiVersion>,
    calls: Vec<DeviceCall>,
    errors: VecDeque<u32>,
    triggers: Vec<ErrorTrigger>,
    compile_failure: Option<String>,
    framebuffer_status: FramebufferStatus,
    handle_budget: Option<usize>,
    next_handle: u32,
    live: BTreeSet<(&'static str, u32)>,
    hidden_uniforms: HashSet<String>,
    uniform_locations: HashMap<(ProgramId, String), UniformLocation>,
    attribute_locations: HashMap<(ProgramId, String), u32>,
    // currently bound state
    program: ProgramId,
    framebuffer: FramebufferId,
    vertex_array: VertexArrayId,
    enabled: HashSet<Capability>,
    viewport: (i32, i32),
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RecordingDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingDevice")
            .field("version", &self.version)
            .field("calls", &self.calls.len())
            .field("live", &self.live.len())
            .finish_non_exhaustive()
    }
}

impl RecordingDevice {
    /// A device reporting API 3.3.
    pub fn new() -> Self {
        Self {
            version: Some(ApiVersion::new(3, 3)),
            calls: Vec::new(),
            errors: VecDeque::new(),
            triggers: Vec::new(),
            compile_failure: None,
            framebuffer_status: FramebufferStatus::Complete,
            handle_budget: None,
            next_handle: 1,
            live: BTreeSet::new(),
            hidden_uniforms: HashSet::new(),
            uniform_locations: HashMap::new(),
            attribute_locations: HashMap::new(),
            program: ProgramId::UNALLOCATED,
            framebuffer: FramebufferId::UNALLOCATED,
            vertex_array: VertexArrayId::UNALLOCATED,
            enabled: HashSet::new(),
            viewport: (0, 0),
        }
    }

    /// Reports `version` (`None` = no context at all).
    pub fn with_version(mut self, version: Option<ApiVersion>) -> Self {
        self.version = version;
        self
    }

    // ── Failure knobs ─────────────────────────────────────────────────────────

    /// Queues an error code for the next `poll_error`.
    pub fn inject_error(&mut self, code: u32) {
        self.errors.push_back(code);
    }

    /// Queues `code` the first time a call matching `when` is recorded.
    pub fn raise_error_when(&mut self, when: impl Fn(&DeviceCall) -> bool + 'static, code: u32) {
        self.triggers.push((Box::new(when), code));
    }

    /// Makes the next `compile_program` fail with `log`.
    pub fn fail_next_compile(&mut self, log: impl Into<String>) {
        self.compile_failure = Some(log.into());
    }

    pub fn set_framebuffer_status(&mut self, status: FramebufferStatus) {
        self.framebuffer_status = status;
    }

    /// Only `count` more handles can be created.
    pub fn limit_handles(&mut self, count: usize) {
        self.handle_budget = Some(count);
    }

    /// `uniform_location` reports `name` as optimised out.
    pub fn hide_uniform(&mut self, name: impl Into<String>) {
        self.hidden_uniforms.insert(name.into());
    }

    // ── Inspection ────────────────────────────────────────────────────────────

    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    pub fn count(&self, pred: impl Fn(&DeviceCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Handles created and not yet deleted.
    pub fn live_handles(&self) -> usize {
        self.live.len()
    }

    pub fn bound_program(&self) -> ProgramId {
        self.program
    }

    pub fn bound_framebuffer(&self) -> FramebufferId {
        self.framebuffer
    }

    pub fn bound_vertex_array(&self) -> VertexArrayId {
        self.vertex_array
    }

    pub fn is_enabled(&self, capability: Capability) -> bool {
        self.enabled.contains(&capability)
    }

    pub fn viewport(&self) -> (i32, i32) {
        self.viewport
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn record(&mut self, call: DeviceCall) {
        log::trace!("device: {call:?}");
        let mut fired = Vec::new();
        self.triggers.retain(|(when, code)| {
            if when(&call) {
                fired.push(*code);
                false
            } else {
                true
            }
        });
        self.errors.extend(fired);
        self.calls.push(call);
    }

    fn allocate(&mut self, kind: &'static str) -> Result<u32, RenderError> {
        if let Some(budget) = self.handle_budget.as_mut() {
            if *budget == 0 {
                return Err(RenderError::Allocation(format!("out of {kind} handles")));
            }
            *budget -= 1;
        }
        let id = self.next_handle;
        self.next_handle += 1;
        self.live.insert((kind, id));
        Ok(id)
    }

    fn free(&mut self, kind: &'static str, id: u32) {
        if id != 0 && !self.live.remove(&(kind, id)) {
            log::warn!("device: deleting unknown {kind} {id}");
        }
    }
}

impl Device for RecordingDevice {
    fn label(&self) -> &str {
        "recording"
    }

    fn version(&self) -> Option<ApiVersion> {
        self.version
    }

    fn poll_error(&mut self) -> Option<u32> {
        self.errors.pop_front()
    }

    fn set_clear_color(&mut self, rgba: [f32; 4]) {
        self.record(DeviceCall::SetClearColor(rgba));
    }

    fn clear(&mut self, color: bool, depth: bool) {
        self.record(DeviceCall::Clear { color, depth });
    }

    fn set_viewport(&mut self, width: i32, height: i32) {
        self.viewport = (width, height);
        self.record(DeviceCall::SetViewport { width, height });
    }

    fn set_capability(&mut self, capability: Capability, enabled: bool) {
        if enabled {
            self.enabled.insert(capability);
        } else {
            self.enabled.remove(&capability);
        }
        self.record(DeviceCall::SetCapability { capability, enabled });
    }

    fn set_alpha_blend_func(&mut self) {
        self.record(DeviceCall::SetAlphaBlendFunc);
    }

    fn set_scissor_rect(&mut self, rect: ScissorRect) {
        self.record(DeviceCall::SetScissorRect(rect));
    }

    fn set_polygon_mode(&mut self, mode: PolygonMode) {
        self.record(DeviceCall::SetPolygonMode(mode));
    }

    fn create_vertex_array(&mut self) -> Result<VertexArrayId, RenderError> {
        let vao = VertexArrayId(self.allocate("vertex array")?);
        self.record(DeviceCall::CreateVertexArray(vao));
        Ok(vao)
    }

    fn bind_vertex_array(&mut self, vao: VertexArrayId) {
        self.vertex_array = vao;
        self.record(DeviceCall::BindVertexArray(vao));
    }

    fn delete_vertex_array(&mut self, vao: VertexArrayId) {
        self.free("vertex array", vao.0);
        self.record(DeviceCall::DeleteVertexArray(vao));
    }

    fn create_buffer(&mut self) -> Result<BufferId, RenderError> {
        let buffer = BufferId(self.allocate("buffer")?);
        self.record(DeviceCall::CreateBuffer(buffer));
        Ok(buffer)
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.free("buffer", buffer.0);
        self.record(DeviceCall::DeleteBuffer(buffer));
    }

    fn upload_vertex_channel(&mut self, channel: &VertexChannel) {
        self.record(DeviceCall::UploadVertexChannel {
            buffer: channel.buffer,
            slot: channel.slot,
            stride: channel.stride,
            usage: channel.usage,
            normalize: channel.normalize,
            instanced: channel.instanced,
            bytes: channel.data.as_bytes().len(),
        });
    }

    fn upload_face_channel(&mut self, faces: &FaceChannel) {
        self.record(DeviceCall::UploadFaceChannel {
            buffer: faces.buffer,
            usage: faces.usage,
            indices: faces.data.len(),
        });
    }

    fn compile_program(&mut self, source: &ShaderSource) -> Result<ProgramId, String> {
        if let Some(log) = self.compile_failure.take() {
            return Err(log);
        }
        let program = ProgramId(self.allocate("program").map_err(|e| e.to_string())?);
        self.record(DeviceCall::CompileProgram {
            name: source.name.clone(),
            program,
        });
        Ok(program)
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        if self.hidden_uniforms.contains(name) {
            return None;
        }
        let next = UniformLocation(self.uniform_locations.len() as u32);
        Some(
            *self
                .uniform_locations
                .entry((program, name.to_owned()))
                .or_insert(next),
        )
    }

    fn attribute_location(&mut self, program: ProgramId, name: &str) -> Option<u32> {
        let next = self
            .attribute_locations
            .keys()
            .filter(|(p, _)| *p == program)
            .count() as u32;
        Some(
            *self
                .attribute_locations
                .entry((program, name.to_owned()))
                .or_insert(next),
        )
    }

    fn use_program(&mut self, program: ProgramId) {
        self.program = program;
        self.record(DeviceCall::UseProgram(program));
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.free("program", program.0);
        self.record(DeviceCall::DeleteProgram(program));
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue<'_>) {
        self.record(DeviceCall::SetUniform {
            location,
            value: value.into(),
        });
    }

    fn create_texture(&mut self) -> Result<TextureId, RenderError> {
        let texture = TextureId(self.allocate("texture")?);
        self.record(DeviceCall::CreateTexture(texture));
        Ok(texture)
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        self.record(DeviceCall::BindTexture { unit, texture });
    }

    fn upload_texture(&mut self, texture: TextureId, width: u32, height: u32, _rgba: &[u8]) {
        self.record(DeviceCall::UploadTexture {
            texture,
            width,
            height,
        });
    }

    fn allocate_texture_storage(&mut self, texture: TextureId, storage: TextureStorage, size: u32) {
        self.record(DeviceCall::AllocateTextureStorage {
            texture,
            storage,
            size,
        });
    }

    fn generate_mipmaps(&mut self, texture: TextureId) {
        self.record(DeviceCall::GenerateMipmaps(texture));
    }

    fn set_sampling(&mut self, texture: TextureId, sampling: Sampling) {
        self.record(DeviceCall::SetSampling { texture, sampling });
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.free("texture", texture.0);
        self.record(DeviceCall::DeleteTexture(texture));
    }

    fn create_framebuffer(&mut self) -> Result<FramebufferId, RenderError> {
        let framebuffer = FramebufferId(self.allocate("framebuffer")?);
        self.record(DeviceCall::CreateFramebuffer(framebuffer));
        Ok(framebuffer)
    }

    fn bind_framebuffer(&mut self, framebuffer: FramebufferId) {
        self.framebuffer = framebuffer;
        self.record(DeviceCall::BindFramebuffer(framebuffer));
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferId) {
        self.free("framebuffer", framebuffer.0);
        self.record(DeviceCall::DeleteFramebuffer(framebuffer));
    }

    fn create_renderbuffer(&mut self) -> Result<RenderbufferId, RenderError> {
        let renderbuffer = RenderbufferId(self.allocate("renderbuffer")?);
        self.record(DeviceCall::CreateRenderbuffer(renderbuffer));
        Ok(renderbuffer)
    }

    fn allocate_depth_renderbuffer(&mut self, renderbuffer: RenderbufferId, size: u32) {
        self.record(DeviceCall::AllocateDepthRenderbuffer { renderbuffer, size });
    }

    fn delete_renderbuffer(&mut self, renderbuffer: RenderbufferId) {
        self.free("renderbuffer", renderbuffer.0);
        self.record(DeviceCall::DeleteRenderbuffer(renderbuffer));
    }

    fn attach(&mut self, attachment: Attachment) {
        self.record(DeviceCall::Attach(attachment));
    }

    fn set_color_output(&mut self, enabled: bool) {
        self.record(DeviceCall::SetColorOutput(enabled));
    }

    fn framebuffer_status(&mut self) -> FramebufferStatus {
        self.framebuffer_status
    }

    fn draw_elements(&mut self, primitive: Primitive, count: u32) {
        self.record(DeviceCall::DrawElements { primitive, count });
    }

    fn draw_elements_instanced(&mut self, primitive: Primitive, count: u32, instances: u32) {
        self.record(DeviceCall::DrawElementsInstanced {
            primitive,
            count,
            instances,
        });
    }

    fn draw_arrays(&mut self, primitive: Primitive, count: u32) {
        self.record(DeviceCall::DrawArrays { primitive, count });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_sequential_and_tracked() {
        let mut dev = RecordingDevice::new();
        let a = dev.create_buffer().unwrap();
        let b = dev.create_texture().unwrap();
        assert_eq!(a, BufferId(1));
        assert_eq!(b, TextureId(2));
        assert_eq!(dev.live_handles(), 2);
        dev.delete_buffer(a);
        assert_eq!(dev.live_handles(), 1);
    }

    #[test]
    fn trigger_fires_once() {
        let mut dev = RecordingDevice::new();
        dev.raise_error_when(|c| matches!(c, DeviceCall::Clear { .. }), 0x502);
        assert_eq!(dev.poll_error(), None);
        dev.clear(true, true);
        dev.clear(true, true);
        assert_eq!(dev.poll_error(), Some(0x502));
        assert_eq!(dev.poll_error(), None);
    }

    #[test]
    fn handle_budget() {
        let mut dev = RecordingDevice::new();
        dev.limit_handles(1);
        assert!(dev.create_framebuffer().is_ok());
        assert!(matches!(
            dev.create_renderbuffer(),
            Err(RenderError::Allocation(_))
        ));
    }

    #[test]
    fn uniform_locations_are_stable() {
        let mut dev = RecordingDevice::new();
        dev.hide_uniform("unused");
        let p = ProgramId(1);
        let a = dev.uniform_location(p, "mvp");
        let b = dev.uniform_location(p, "alpha");
        assert_ne!(a, b);
        assert_eq!(dev.uniform_location(p, "mvp"), a);
        assert_eq!(dev.uniform_location(p, "unused"), None);
    }

    #[test]
    fn bound_state_follows_calls() {
        let mut dev = RecordingDevice::new();
        dev.use_program(ProgramId(4));
        dev.bind_framebuffer(FramebufferId(2));
        dev.set_capability(Capability::DepthTest, true);
        dev.set_viewport(640, 480);
        assert_eq!(dev.bound_program(), ProgramId(4));
        assert_eq!(dev.bound_framebuffer(), FramebufferId(2));
        assert!(dev.is_enabled(Capability::DepthTest));
        assert_eq!(dev.viewport(), (640, 480));
    }
}

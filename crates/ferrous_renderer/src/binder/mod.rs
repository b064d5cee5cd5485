/// `Binder` is the single owner of a graphics [`Device`].
///
/// The binder turns CPU-side descriptions (meshes, shader sources, pixels,
/// render targets) into device handles and keeps a small cache of the bound
/// program, framebuffer and depth-test flag so repeated draws with the same
/// state cost no device calls.
///
/// # Module layout
///
/// | Module    | Responsibility                                     |
/// |-----------|----------------------------------------------------|
/// | `state`   | `DeviceState`, the cached bindings                 |
/// | `texture` | `Pixels` plus texture upload / wrap / release      |
///
/// Render targets live in [`crate::render_target`] and draw submission in
/// [`crate::draw`]; both extend `Binder` with further `impl` blocks.
pub mod state;
pub mod texture;

pub use state::DeviceState;
pub use texture::{PixelLayout, Pixels};

use ferrous_core::RenderSettings;

use crate::device::{Capability, Device, FramebufferId, ProgramId, VertexArrayId};
use crate::draw::Frame;
use crate::error::RenderError;
use crate::geometry::Mesh;
use crate::shader::{Shader, ShaderSource};

pub struct Binder<D: Device> {
    pub(crate) device: D,
    pub(crate) state: DeviceState,
    pub(crate) settings: RenderSettings,
}

impl<D: Device> Binder<D> {
    /// Takes ownership of `device` after checking its version against
    /// `settings.min_version`.
    pub fn new(mut device: D, settings: RenderSettings) -> Result<Self, RenderError> {
        let version = device
            .version()
            .ok_or_else(|| RenderError::DeviceUnavailable(format!("{} has no context", device.label())))?;
        if version < settings.min_version {
            return Err(RenderError::DeviceUnavailable(format!(
                "{} reports {version}, need {} or higher",
                device.label(),
                settings.min_version
            )));
        }
        log::info!("binder ready on {} ({version})", device.label());

        device.set_clear_color(settings.clear_color);
        Ok(Self {
            device,
            state: DeviceState::default(),
            settings,
        })
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Direct device access.  Changing the program, framebuffer or depth
    /// test through it leaves [`Binder::state`] out of date.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Starts collecting draws for one frame.
    pub fn begin_frame(&mut self) -> Frame<'_, D> {
        Frame::new(self)
    }

    /// Fails with `StaleDevice` when an error is already pending.
    pub fn check_device(&mut self, operation: &'static str) -> Result<(), RenderError> {
        match self.device.poll_error() {
            Some(code) => Err(RenderError::StaleDevice { operation, code }),
            None => Ok(()),
        }
    }

    fn check_call(&mut self, operation: &'static str) -> Result<(), RenderError> {
        match self.device.poll_error() {
            Some(code) => Err(RenderError::DeviceCall { operation, code }),
            None => Ok(()),
        }
    }

    // ── Window state ──────────────────────────────────────────────────────────

    /// Records the window size and applies it.
    pub fn set_viewport(&mut self, width: i32, height: i32) {
        self.state.viewport = (width, height);
        self.device.set_viewport(width, height);
    }

    pub fn set_clear_color(&mut self, rgba: [f32; 4]) {
        self.settings.clear_color = rgba;
        self.device.set_clear_color(rgba);
    }

    /// Clears color and depth of the bound framebuffer.
    pub fn clear(&mut self) {
        self.device.clear(true, true);
    }

    /// Toggles fixed-function state.  Blending uses straight
    /// (non-premultiplied) alpha.
    pub fn enable(&mut self, capability: Capability, enabled: bool) {
        match capability {
            Capability::DepthTest => self.set_depth_test(enabled),
            Capability::Blend => {
                self.device.set_capability(Capability::Blend, enabled);
                if enabled {
                    self.device.set_alpha_blend_func();
                }
            }
            other => self.device.set_capability(other, enabled),
        }
    }

    // ── Cached switches ───────────────────────────────────────────────────────

    pub fn set_depth_test(&mut self, enabled: bool) {
        if self.state.depth_test != enabled {
            self.device.set_capability(Capability::DepthTest, enabled);
            self.state.depth_test = enabled;
        }
    }

    /// Binds `framebuffer`.  The window framebuffer gets the window viewport
    /// back; an off-screen target gets a cleared depth buffer and a
    /// `layer_size` square viewport.
    pub fn use_framebuffer(&mut self, framebuffer: FramebufferId) {
        if self.state.framebuffer == framebuffer {
            return;
        }
        self.device.bind_framebuffer(framebuffer);
        if framebuffer.is_allocated() {
            let size = self.settings.layer_size as i32;
            self.device.clear(false, true);
            self.device.set_viewport(size, size);
        } else {
            let (w, h) = self.state.viewport;
            self.device.set_viewport(w, h);
        }
        self.state.framebuffer = framebuffer;
    }

    pub fn use_program(&mut self, program: ProgramId) {
        if self.state.program != program {
            self.device.use_program(program);
            self.state.program = program;
        }
    }

    // ── Meshes ────────────────────────────────────────────────────────────────

    /// Makes the device copy of `mesh` current.
    ///
    /// Allocates the vertex array and buffers on first use and uploads only
    /// channels whose data changed.  Binding a clean mesh issues no uploads.
    pub fn bind_mesh(&mut self, mesh: &mut Mesh) -> Result<(), RenderError> {
        self.check_device("bind_mesh")?;
        mesh.validate()?;

        if !mesh.vao.is_allocated() {
            mesh.vao = self.device.create_vertex_array()?;
            log::debug!("mesh `{}` -> {}", mesh.name(), mesh.vao);
        }
        self.device.bind_vertex_array(mesh.vao);
        let uploaded = self.upload_mesh(mesh);
        self.device.bind_vertex_array(VertexArrayId::UNALLOCATED);
        uploaded?;

        mesh.needs_rebind = false;
        Ok(())
    }

    fn upload_mesh(&mut self, mesh: &mut Mesh) -> Result<(), RenderError> {
        // dirty flags survive a failed upload so the next bind retries it
        for channel in mesh.channels.values_mut().filter(|c| c.dirty) {
            if !channel.data.is_empty() {
                if !channel.buffer.is_allocated() {
                    channel.buffer = self.device.create_buffer()?;
                }
                self.device.upload_vertex_channel(channel);
            }
        }
        self.check_call("bind_mesh vertex upload")?;
        for channel in mesh.channels.values_mut() {
            channel.dirty = false;
        }

        if let Some(faces) = mesh.faces.as_mut().filter(|f| f.dirty) {
            if !faces.data.is_empty() {
                if !faces.buffer.is_allocated() {
                    faces.buffer = self.device.create_buffer()?;
                }
                self.device.upload_face_channel(faces);
            }
            self.check_call("bind_mesh face upload")?;
            faces.dirty = false;
        }
        Ok(())
    }

    /// Frees the device copy of `mesh`.  The CPU data stays, so the mesh can
    /// be bound again later.
    pub fn release_mesh(&mut self, mesh: &mut Mesh) {
        for channel in mesh.channels.values() {
            if channel.buffer.is_allocated() {
                self.device.delete_buffer(channel.buffer);
            }
        }
        if let Some(faces) = mesh.faces.as_ref().filter(|f| f.buffer.is_allocated()) {
            self.device.delete_buffer(faces.buffer);
        }
        if mesh.vao.is_allocated() {
            self.device.delete_vertex_array(mesh.vao);
        }
        mesh.reset_device_handles();
    }

    // ── Shaders ───────────────────────────────────────────────────────────────

    /// Compiles and links `source`, then resolves its uniform and layout
    /// names.  Names the linker dropped are left out of the result.  Fails
    /// with `StaleDevice` if an error is already pending.
    pub fn bind_shader(&mut self, source: &ShaderSource) -> Result<Shader, RenderError> {
        self.check_device("bind_shader")?;
        let program = self
            .device
            .compile_program(source)
            .map_err(|log| RenderError::ShaderCompile {
                name: source.name.clone(),
                log,
            })?;

        let mut shader = Shader {
            name: source.name.clone(),
            program,
            uniforms: Default::default(),
            layouts: Default::default(),
        };
        for name in &source.uniforms {
            match self.device.uniform_location(program, name) {
                Some(location) => {
                    shader.uniforms.insert(name.clone(), location);
                }
                None => log::debug!("shader `{}`: uniform `{name}` is inactive", source.name),
            }
        }
        for name in &source.layouts {
            match self.device.attribute_location(program, name) {
                Some(slot) => {
                    shader.layouts.insert(name.clone(), slot);
                }
                None => log::debug!("shader `{}`: layout `{name}` is inactive", source.name),
            }
        }
        if let Some(code) = self.device.poll_error() {
            log::warn!("shader `{}` bound with device error {code:#X}", source.name);
        }
        log::debug!("shader `{}` -> {}", shader.name, shader.program);
        Ok(shader)
    }

    /// Deletes the program.  If it is the bound one the device falls back
    /// to no program so a recycled id is never mistaken for it.
    pub fn release_shader(&mut self, shader: Shader) {
        if self.state.program == shader.program {
            self.use_program(ProgramId::UNALLOCATED);
        }
        self.device.delete_program(shader.program);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceCall, RecordingDevice};
    use crate::geometry::primitives::cube;
    use crate::geometry::Usage;
    use ferrous_core::ApiVersion;

    fn binder() -> Binder<RecordingDevice> {
        let mut b = Binder::new(RecordingDevice::new(), RenderSettings::default()).unwrap();
        b.device_mut().clear_calls();
        b
    }

    fn uploads(b: &Binder<RecordingDevice>) -> usize {
        b.device().count(DeviceCall::is_upload)
    }

    #[test]
    fn old_device_is_rejected() {
        let dev = RecordingDevice::new().with_version(Some(ApiVersion::new(3, 1)));
        assert!(matches!(
            Binder::new(dev, RenderSettings::default()),
            Err(RenderError::DeviceUnavailable(_))
        ));
        let dev = RecordingDevice::new().with_version(None);
        assert!(Binder::new(dev, RenderSettings::default()).is_err());
    }

    #[test]
    fn clean_mesh_is_not_uploaded_twice() {
        let mut b = binder();
        let mut mesh = cube();
        b.bind_mesh(&mut mesh).unwrap();
        assert_eq!(uploads(&b), 3);
        assert!(!mesh.needs_rebind());
        assert!(mesh.vao().is_allocated());

        b.device_mut().clear_calls();
        b.bind_mesh(&mut mesh).unwrap();
        assert_eq!(uploads(&b), 0);
        assert_eq!(b.device().count(|c| matches!(c, DeviceCall::CreateVertexArray(_))), 0);
    }

    #[test]
    fn only_changed_channel_is_uploaded() {
        let mut b = binder();
        let mut mesh = cube();
        b.bind_mesh(&mut mesh).unwrap();
        b.device_mut().clear_calls();

        mesh.set_data(1, vec![0.5f32; 72]);
        assert!(mesh.needs_rebind());
        b.bind_mesh(&mut mesh).unwrap();
        assert_eq!(uploads(&b), 1);
        assert!(b.device().calls().iter().any(|c| matches!(
            c,
            DeviceCall::UploadVertexChannel { slot: 1, bytes: 288, .. }
        )));
        assert_eq!(b.device().bound_vertex_array(), VertexArrayId::UNALLOCATED);
    }

    #[test]
    fn pending_error_fails_fast() {
        let mut b = binder();
        let mut mesh = cube();
        b.device_mut().inject_error(0x502);
        let err = b.bind_mesh(&mut mesh).unwrap_err();
        assert_eq!(
            err,
            RenderError::StaleDevice {
                operation: "bind_mesh",
                code: 0x502
            }
        );
        assert!(b.device().calls().is_empty());
        assert!(mesh.needs_rebind());
    }

    #[test]
    fn upload_error_is_reported() {
        let mut b = binder();
        let mut mesh = cube();
        b.device_mut().raise_error_when(|c| matches!(c, DeviceCall::UploadFaceChannel { .. }), 0x505);
        let err = b.bind_mesh(&mut mesh).unwrap_err();
        assert!(matches!(err, RenderError::DeviceCall { code: 0x505, .. }));
        assert_eq!(b.device().bound_vertex_array(), VertexArrayId::UNALLOCATED);
        assert!(mesh.needs_rebind());

        // vertices went through, only the faces are sent again
        b.device_mut().clear_calls();
        b.bind_mesh(&mut mesh).unwrap();
        assert_eq!(uploads(&b), 1);
        assert_eq!(
            b.device().count(|c| matches!(c, DeviceCall::UploadFaceChannel { .. })),
            1
        );
        assert!(!mesh.needs_rebind());
    }

    #[test]
    fn failed_vertex_upload_is_retried() {
        let mut b = binder();
        let mut mesh = cube();
        b.device_mut().raise_error_when(|c| matches!(c, DeviceCall::UploadVertexChannel { .. }), 0x505);
        assert_eq!(
            b.bind_mesh(&mut mesh),
            Err(RenderError::DeviceCall {
                operation: "bind_mesh vertex upload",
                code: 0x505
            })
        );
        assert!(mesh.needs_rebind());
        assert!(mesh.channels().all(|c| c.dirty));

        b.device_mut().clear_calls();
        b.bind_mesh(&mut mesh).unwrap();
        assert_eq!(uploads(&b), 3);
        assert!(!mesh.needs_rebind());
        assert!(mesh.channels().all(|c| !c.dirty));
        // buffers from the failed attempt are reused
        assert_eq!(b.device().count(|c| matches!(c, DeviceCall::CreateBuffer(_))), 1);
    }

    #[test]
    fn invalid_mesh_makes_no_device_calls() {
        let mut b = binder();
        let mut mesh = Mesh::new("bad");
        mesh.init_data(0, 3, Usage::Static, false)
            .set_data(0, vec![0.0f32; 9])
            .init_data(1, 2, Usage::Static, false)
            .set_data(1, vec![0.0f32; 4]);
        assert!(matches!(
            b.bind_mesh(&mut mesh),
            Err(RenderError::VertexCountMismatch { .. })
        ));
        assert!(b.device().calls().is_empty());
    }

    #[test]
    fn release_mesh_frees_everything() {
        let mut b = binder();
        let mut mesh = cube();
        b.bind_mesh(&mut mesh).unwrap();
        assert_eq!(b.device().live_handles(), 4);
        b.release_mesh(&mut mesh);
        assert_eq!(b.device().live_handles(), 0);
        assert!(mesh.needs_rebind());

        b.device_mut().clear_calls();
        b.bind_mesh(&mut mesh).unwrap();
        assert_eq!(uploads(&b), 3);
    }

    #[test]
    fn shader_bind_fails_fast_on_pending_error() {
        let mut b = binder();
        b.device_mut().inject_error(0x502);
        let err = b.bind_shader(&ShaderSource::new("s", "", "")).unwrap_err();
        assert_eq!(
            err,
            RenderError::StaleDevice {
                operation: "bind_shader",
                code: 0x502
            }
        );
        assert!(b.device().calls().is_empty());
        assert_eq!(b.device().live_handles(), 0);
    }

    #[test]
    fn shader_failure_caches_nothing() {
        let mut b = binder();
        b.device_mut().fail_next_compile("0:1 syntax error");
        let src = ShaderSource::new("broken", "", "").with_uniforms(["mvp"]);
        let err = b.bind_shader(&src).unwrap_err();
        assert_eq!(
            err,
            RenderError::ShaderCompile {
                name: "broken".into(),
                log: "0:1 syntax error".into()
            }
        );
        assert_eq!(b.device().live_handles(), 0);
    }

    #[test]
    fn shader_resolves_active_names() {
        let mut b = binder();
        b.device_mut().hide_uniform("unused");
        let src = ShaderSource::new("flat", "void main(){}", "void main(){}")
            .with_uniforms(["mvp", "unused", "alpha"])
            .with_layouts(["in_v", "in_c"]);
        let shader = b.bind_shader(&src).unwrap();
        assert!(shader.uniform("mvp").is_some());
        assert!(shader.uniform("alpha").is_some());
        assert!(shader.uniform("unused").is_none());
        assert_eq!(shader.layout("in_v"), Some(0));
        assert_eq!(shader.layout("in_c"), Some(1));
    }

    #[test]
    fn switches_are_elided() {
        let mut b = binder();
        b.use_program(ProgramId(3));
        b.use_program(ProgramId(3));
        b.set_depth_test(true);
        b.set_depth_test(true);
        b.use_framebuffer(FramebufferId::UNALLOCATED);
        let calls = b.device().calls();
        assert_eq!(calls.iter().filter(|c| matches!(c, DeviceCall::UseProgram(_))).count(), 1);
        assert_eq!(
            calls
                .iter()
                .filter(|c| matches!(c, DeviceCall::SetCapability { .. }))
                .count(),
            1
        );
        assert!(!calls.iter().any(|c| matches!(c, DeviceCall::BindFramebuffer(_))));
    }

    #[test]
    fn framebuffer_switch_sets_viewport() {
        let mut b = binder();
        b.set_viewport(800, 600);
        b.use_framebuffer(FramebufferId(5));
        assert_eq!(b.device().viewport(), (1024, 1024));
        assert!(b
            .device()
            .calls()
            .contains(&DeviceCall::Clear { color: false, depth: true }));
        b.use_framebuffer(FramebufferId::UNALLOCATED);
        assert_eq!(b.device().viewport(), (800, 600));
    }

    #[test]
    fn releasing_bound_program_resets_cache() {
        let mut b = binder();
        let shader = b.bind_shader(&ShaderSource::new("s", "", "")).unwrap();
        let program = shader.program;
        b.use_program(program);
        b.release_shader(shader);
        assert_eq!(b.state().program, ProgramId::UNALLOCATED);
        assert_eq!(b.device().bound_program(), ProgramId::UNALLOCATED);

        // a new program reusing the id must still be bound
        b.use_program(program);
        assert_eq!(b.device().bound_program(), program);
    }

    #[test]
    fn blend_sets_alpha_function() {
        let mut b = binder();
        b.enable(Capability::Blend, true);
        b.enable(Capability::CullFace, true);
        assert!(b.device().is_enabled(Capability::Blend));
        assert!(b.device().is_enabled(Capability::CullFace));
        assert!(b.device().calls().contains(&DeviceCall::SetAlphaBlendFunc));

        b.enable(Capability::DepthTest, true);
        assert!(b.state().depth_test);
    }
}

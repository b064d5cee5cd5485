// destinos de render fuera de pantalla

//! Off-screen render targets.
//!
//! Both kinds are square, `layer_size` pixels wide:
//!
//! * [`RenderTarget`]: color texture plus a depth renderbuffer, for
//!   rendering a scene into a texture.
//! * [`ShadowTarget`]: a depth-only texture with hardware comparison,
//!   sampled by lit shaders as the shadow map.
//!
//! Creation either returns a complete target or releases every handle it
//! allocated.

use crate::binder::Binder;
use crate::device::{
    Attachment, Device, FramebufferId, FramebufferStatus, RenderbufferId, Sampling, TextureId,
    TextureStorage,
};
use crate::error::RenderError;

// ── Targets ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    pub framebuffer: FramebufferId,
    /// Color attachment; bind it like any other texture once rendered.
    pub color: TextureId,
    pub depth: RenderbufferId,
    pub size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowTarget {
    pub framebuffer: FramebufferId,
    pub depth: TextureId,
    pub size: u32,
}

// ── Partial allocation guard ─────────────────────────────────────────────────

/// Deletes whatever was allocated unless [`Allocations::keep`] is reached.
struct Allocations<'d, D: Device> {
    device: &'d mut D,
    framebuffer: FramebufferId,
    texture: TextureId,
    renderbuffer: RenderbufferId,
}

impl<'d, D: Device> Allocations<'d, D> {
    fn new(device: &'d mut D) -> Self {
        Self {
            device,
            framebuffer: FramebufferId::UNALLOCATED,
            texture: TextureId::UNALLOCATED,
            renderbuffer: RenderbufferId::UNALLOCATED,
        }
    }

    /// Checks completeness of the bound framebuffer and any device error.
    fn verify(&mut self, operation: &'static str) -> Result<(), RenderError> {
        if let FramebufferStatus::Incomplete(status) = self.device.framebuffer_status() {
            return Err(RenderError::IncompleteRenderTarget { status });
        }
        match self.device.poll_error() {
            Some(code) => Err(RenderError::DeviceCall { operation, code }),
            None => Ok(()),
        }
    }

    fn keep(mut self) -> (FramebufferId, TextureId, RenderbufferId) {
        let kept = (self.framebuffer, self.texture, self.renderbuffer);
        self.framebuffer = FramebufferId::UNALLOCATED;
        self.texture = TextureId::UNALLOCATED;
        self.renderbuffer = RenderbufferId::UNALLOCATED;
        kept
    }
}

impl<D: Device> Drop for Allocations<'_, D> {
    fn drop(&mut self) {
        if self.renderbuffer.is_allocated() {
            self.device.delete_renderbuffer(self.renderbuffer);
        }
        if self.texture.is_allocated() {
            self.device.delete_texture(self.texture);
        }
        if self.framebuffer.is_allocated() {
            log::debug!("releasing partial target {}", self.framebuffer);
            self.device.delete_framebuffer(self.framebuffer);
        }
    }
}

fn build_color_target<D: Device>(device: &mut D, size: u32) -> Result<RenderTarget, RenderError> {
    let mut a = Allocations::new(device);
    a.framebuffer = a.device.create_framebuffer()?;
    a.device.bind_framebuffer(a.framebuffer);

    a.texture = a.device.create_texture()?;
    a.device
        .allocate_texture_storage(a.texture, TextureStorage::Rgba8, size);
    a.device.set_sampling(a.texture, Sampling::layer());

    // depth buffer so 3D content sorts like on screen
    a.renderbuffer = a.device.create_renderbuffer()?;
    a.device.allocate_depth_renderbuffer(a.renderbuffer, size);
    a.device.attach(Attachment::DepthRenderbuffer(a.renderbuffer));

    a.device.attach(Attachment::Color(a.texture));
    a.device.set_color_output(true);
    a.verify("bind_render_target")?;

    let (framebuffer, color, depth) = a.keep();
    Ok(RenderTarget {
        framebuffer,
        color,
        depth,
        size,
    })
}

fn build_shadow_target<D: Device>(device: &mut D, size: u32) -> Result<ShadowTarget, RenderError> {
    let mut a = Allocations::new(device);
    a.framebuffer = a.device.create_framebuffer()?;
    a.device.bind_framebuffer(a.framebuffer);

    a.texture = a.device.create_texture()?;
    a.device
        .allocate_texture_storage(a.texture, TextureStorage::Depth16, size);
    a.device.set_sampling(a.texture, Sampling::shadow());

    a.device.attach(Attachment::DepthTexture(a.texture));
    a.device.set_color_output(false);
    a.verify("bind_shadow_target")?;

    let (framebuffer, depth, _) = a.keep();
    Ok(ShadowTarget {
        framebuffer,
        depth,
        size,
    })
}

// ── Binder API ───────────────────────────────────────────────────────────────

impl<D: Device> Binder<D> {
    /// Creates a color + depth target.  The previously bound framebuffer is
    /// bound again afterwards.
    pub fn bind_render_target(&mut self) -> Result<RenderTarget, RenderError> {
        self.check_device("bind_render_target")?;
        let size = self.settings.layer_size;
        let target = build_color_target(&mut self.device, size);
        self.device.bind_framebuffer(self.state.framebuffer);
        if let Ok(t) = &target {
            log::debug!("render target {} ({size}px)", t.framebuffer);
        }
        target
    }

    /// Creates a depth-only shadow map target.
    pub fn bind_shadow_target(&mut self) -> Result<ShadowTarget, RenderError> {
        self.check_device("bind_shadow_target")?;
        let size = self.settings.layer_size;
        let target = build_shadow_target(&mut self.device, size);
        self.device.bind_framebuffer(self.state.framebuffer);
        if let Ok(t) = &target {
            log::debug!("shadow target {} ({size}px)", t.framebuffer);
        }
        target
    }

    /// Runs `f` with a transient render target that is released whether
    /// `f` succeeds or not.
    pub fn with_render_target<R>(
        &mut self,
        f: impl FnOnce(&mut Self, &RenderTarget) -> Result<R, RenderError>,
    ) -> Result<R, RenderError> {
        let target = self.bind_render_target()?;
        let result = f(self, &target);
        self.release_target(target);
        result
    }

    pub fn release_target(&mut self, target: RenderTarget) {
        self.unbind_if_current(target.framebuffer);
        self.device.delete_framebuffer(target.framebuffer);
        self.device.delete_texture(target.color);
        self.device.delete_renderbuffer(target.depth);
    }

    pub fn release_shadow_target(&mut self, target: ShadowTarget) {
        self.unbind_if_current(target.framebuffer);
        self.device.delete_framebuffer(target.framebuffer);
        self.device.delete_texture(target.depth);
    }

    fn unbind_if_current(&mut self, framebuffer: FramebufferId) {
        if self.state.framebuffer == framebuffer {
            self.use_framebuffer(FramebufferId::UNALLOCATED);
        }
    }
}

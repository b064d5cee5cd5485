use glam::DVec3;

use crate::binder::{Binder, Pixels};
use crate::device::{Device, TextureId};
use crate::error::{BindingAnomaly, FrameFailure, RenderError};
use crate::geometry::Mesh;
use crate::render_target::{RenderTarget, ShadowTarget};
use crate::scene::View;
use crate::shader::{Shader, ShaderSource};

use super::Draw;

/// What happened during one frame.
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    /// Draws submitted.
    pub draws: usize,
    /// Candidates rejected by [`Frame::visible`].
    pub culled: usize,
    pub anomalies: Vec<BindingAnomaly>,
    /// Set when the device went stale; later binds were refused.
    pub halted: Option<RenderError>,
}

/// One frame's worth of binds and draws.
///
/// Binds made through the frame fail fast on a stale device and, once one
/// has failed, every later bind returns `FrameHalted`.  Draws are still
/// submitted so the frame ends in a defined state.
pub struct Frame<'b, D: Device> {
    binder: &'b mut Binder<D>,
    report: FrameReport,
}

impl<'b, D: Device> Frame<'b, D> {
    pub(crate) fn new(binder: &'b mut Binder<D>) -> Self {
        Self {
            binder,
            report: FrameReport::default(),
        }
    }

    /// The binder, for clears and viewport changes mid-frame.  Binds made
    /// through it bypass the halt check; use the frame's own `bind_*`.
    pub fn binder(&mut self) -> &mut Binder<D> {
        &mut *self.binder
    }

    pub fn report(&self) -> &FrameReport {
        &self.report
    }

    fn guard<T>(&mut self, result: Result<T, RenderError>) -> Result<T, RenderError> {
        if let Err(err @ RenderError::StaleDevice { .. }) = &result {
            log::error!("halting frame: {err}");
            self.report.halted = Some(err.clone());
        }
        result
    }

    fn ensure_running(&self) -> Result<(), RenderError> {
        match self.report.halted {
            Some(_) => Err(RenderError::FrameHalted),
            None => Ok(()),
        }
    }

    pub fn bind_mesh(&mut self, mesh: &mut Mesh) -> Result<(), RenderError> {
        self.ensure_running()?;
        let result = self.binder.bind_mesh(mesh);
        self.guard(result)
    }

    pub fn bind_texture(&mut self, pixels: &Pixels<'_>) -> Result<TextureId, RenderError> {
        self.ensure_running()?;
        let result = self.binder.bind_texture(pixels);
        self.guard(result)
    }

    pub fn bind_shader(&mut self, source: &ShaderSource) -> Result<Shader, RenderError> {
        self.ensure_running()?;
        let result = self.binder.bind_shader(source);
        self.guard(result)
    }

    pub fn bind_render_target(&mut self) -> Result<RenderTarget, RenderError> {
        self.ensure_running()?;
        let result = self.binder.bind_render_target();
        self.guard(result)
    }

    pub fn bind_shadow_target(&mut self) -> Result<ShadowTarget, RenderError> {
        self.ensure_running()?;
        let result = self.binder.bind_shadow_target();
        self.guard(result)
    }

    /// Asks the view's culler about `position`.  Rejections are counted.
    pub fn visible(&mut self, view: &View, position: DVec3) -> bool {
        let keep = view.keeps(position);
        if !keep {
            self.report.culled += 1;
        }
        keep
    }

    pub fn submit(&mut self, draw: &Draw<'_>) {
        self.binder.submit(draw, &mut self.report.anomalies);
        self.report.draws += 1;
    }

    pub fn finish(self) -> Result<FrameReport, FrameFailure> {
        let report = self.report;
        if let Some(error) = report.halted.clone() {
            return Err(FrameFailure { error, report });
        }
        log::trace!(
            "frame done: {} draws, {} culled, {} anomalies",
            report.draws,
            report.culled,
            report.anomalies.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::PixelLayout;
    use crate::device::{DeviceCall, RecordingDevice};
    use crate::geometry::primitives::cube;
    use ferrous_core::RenderSettings;

    fn binder() -> Binder<RecordingDevice> {
        Binder::new(RecordingDevice::new(), RenderSettings::default()).unwrap()
    }

    #[test]
    fn stale_device_halts_later_binds() {
        let mut b = binder();
        let mut a = cube();
        let mut c = cube();
        let shader = b.bind_shader(&ShaderSource::new("s", "", "")).unwrap();

        let mut frame = b.begin_frame();
        frame.binder().device_mut().inject_error(0x506);
        assert!(matches!(
            frame.bind_mesh(&mut a),
            Err(RenderError::StaleDevice { code: 0x506, .. })
        ));
        assert_eq!(frame.bind_mesh(&mut c), Err(RenderError::FrameHalted));
        let data = [0u8; 4];
        let px = Pixels::new(PixelLayout::Rgba, 1, 1, &data).unwrap();
        assert_eq!(frame.bind_texture(&px), Err(RenderError::FrameHalted));
        assert_eq!(
            frame.bind_shader(&ShaderSource::new("late", "", "")).unwrap_err(),
            RenderError::FrameHalted
        );
        assert_eq!(frame.bind_render_target(), Err(RenderError::FrameHalted));
        assert_eq!(frame.bind_shadow_target(), Err(RenderError::FrameHalted));
        // only the shader bound before the frame is alive
        assert_eq!(frame.binder().device().live_handles(), 1);

        // draws still go out
        frame.submit(&Draw::new(1, &shader, &a));
        let failure = frame.finish().unwrap_err();
        assert!(matches!(failure.error, RenderError::StaleDevice { .. }));
        assert_eq!(failure.report.draws, 1);
        assert_eq!(
            b.device().count(|c| matches!(c, DeviceCall::DrawElements { .. })),
            1
        );
    }

    #[test]
    fn stale_target_bind_halts_frame() {
        let mut b = binder();
        let mut mesh = cube();

        let mut frame = b.begin_frame();
        frame.binder().device_mut().inject_error(0x505);
        assert_eq!(
            frame.bind_shadow_target(),
            Err(RenderError::StaleDevice {
                operation: "bind_shadow_target",
                code: 0x505
            })
        );
        assert_eq!(frame.bind_mesh(&mut mesh), Err(RenderError::FrameHalted));
        let failure = frame.finish().unwrap_err();
        assert_eq!(
            failure.report.halted,
            Some(RenderError::StaleDevice {
                operation: "bind_shadow_target",
                code: 0x505
            })
        );
    }

    #[test]
    fn non_stale_errors_do_not_halt() {
        let mut b = binder();
        let mut bad = Mesh::new("bad");
        bad.init_data(0, 1, crate::geometry::Usage::Static, false)
            .set_data(0, vec![0.0f32; 70_000]);
        let mut good = cube();

        let mut frame = b.begin_frame();
        assert!(frame.bind_mesh(&mut bad).is_err());
        assert!(frame.bind_mesh(&mut good).is_ok());
        let report = frame.finish().unwrap();
        assert!(report.halted.is_none());
    }
}

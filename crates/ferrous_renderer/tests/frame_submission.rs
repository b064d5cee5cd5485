// Integration tests for frame submission against the recording device.

use ferrous_core::{Camera, RenderSettings};
use ferrous_renderer::device::{Capability, DeviceCall, Primitive, RecordedUniform, ScissorRect};
use ferrous_renderer::draw::DRAW_CALL;
use ferrous_renderer::geometry::primitives::cube;
use ferrous_renderer::{
    BindingAnomaly, Binder, Draw, FrontCull, RecordingDevice, RenderError, ShaderSource, View,
};
use glam::DVec3;

fn binder() -> Binder<RecordingDevice> {
    Binder::new(RecordingDevice::new(), RenderSettings::default()).unwrap()
}

fn uniforms_set(b: &Binder<RecordingDevice>) -> Vec<RecordedUniform> {
    b.device()
        .calls()
        .iter()
        .filter_map(|c| match c {
            DeviceCall::SetUniform { value, .. } => Some(value.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn shared_program_and_target_switch_once() {
    let mut b = binder();
    let mut mesh = cube();
    b.bind_mesh(&mut mesh).unwrap();
    let shader = b
        .bind_shader(&ShaderSource::new("flat", "", "").with_uniforms(["mvp"]))
        .unwrap();
    let target = b.bind_render_target().unwrap();
    b.device_mut().clear_calls();

    let mvp = ferrous_core::Transform::IDENTITY.uniform_data();
    let mut frame = b.begin_frame();
    for tag in 0..30 {
        let draw = Draw::new(tag, &shader, &mesh)
            .with_uniform("mvp", mvp.to_vec())
            .into_target(&target);
        frame.submit(&draw);
    }
    let report = frame.finish().unwrap();
    assert_eq!(report.draws, 30);
    assert!(report.anomalies.is_empty());

    let dev = b.device();
    assert_eq!(dev.count(|c| matches!(c, DeviceCall::UseProgram(_))), 1);
    assert_eq!(dev.count(|c| matches!(c, DeviceCall::BindFramebuffer(_))), 1);
    assert_eq!(
        dev.count(|c| matches!(
            c,
            DeviceCall::DrawElements {
                primitive: Primitive::Triangles,
                count: 36
            }
        )),
        30
    );
    assert_eq!(dev.bound_framebuffer(), target.framebuffer);
}

#[test]
fn two_programs_bind_twice() {
    let mut b = binder();
    let mesh = cube();
    let a = b.bind_shader(&ShaderSource::new("a", "", "")).unwrap();
    let c = b.bind_shader(&ShaderSource::new("c", "", "")).unwrap();
    b.device_mut().clear_calls();

    let mut frame = b.begin_frame();
    frame.submit(&Draw::new(1, &a, &mesh));
    frame.submit(&Draw::new(2, &a, &mesh));
    frame.submit(&Draw::new(3, &c, &mesh));
    frame.finish().unwrap();

    assert_eq!(
        b.device().count(|d| matches!(d, DeviceCall::UseProgram(_))),
        2
    );
    assert_eq!(b.device().bound_program(), c.program);
}

#[test]
fn scissor_does_not_leak() {
    let mut b = binder();
    let mesh = cube();
    let shader = b.bind_shader(&ShaderSource::new("s", "", "")).unwrap();
    let rect = ScissorRect {
        x: 10,
        y: 10,
        width: 100,
        height: 50,
    };

    let mut frame = b.begin_frame();
    frame.submit(&Draw::new(1, &shader, &mesh).with_scissor(rect));
    let dev = frame.binder().device();
    assert_eq!(dev.count(|c| *c == DeviceCall::SetScissorRect(rect)), 1);
    assert!(!dev.is_enabled(Capability::ScissorTest));

    // the next, unclipped draw never touches scissor state
    frame.binder().device_mut().clear_calls();
    frame.submit(&Draw::new(2, &shader, &mesh));
    frame.finish().unwrap();

    let dev = b.device();
    assert_eq!(dev.count(DeviceCall::is_draw), 1);
    assert_eq!(dev.count(|c| matches!(c, DeviceCall::SetScissorRect(_))), 0);
    assert_eq!(
        dev.count(|c| matches!(
            c,
            DeviceCall::SetCapability {
                capability: Capability::ScissorTest,
                ..
            }
        )),
        0
    );
    assert!(!dev.is_enabled(Capability::ScissorTest));
}

#[test]
fn draw_call_error_is_recorded() {
    let mut b = binder();
    let mesh = cube();
    let shader = b.bind_shader(&ShaderSource::new("bare", "", "")).unwrap();
    b.device_mut()
        .raise_error_when(|c| matches!(c, DeviceCall::DrawElements { .. }), 0x506);

    let mut frame = b.begin_frame();
    frame.submit(&Draw::new(5, &shader, &mesh));
    frame.submit(&Draw::new(6, &shader, &mesh));
    let report = frame.finish().unwrap();

    assert_eq!(
        report.anomalies,
        vec![BindingAnomaly::DeviceError {
            tag: 5,
            name: DRAW_CALL.into(),
            code: 0x506
        }]
    );
    assert_eq!(report.draws, 2);
}

#[test]
fn clean_mesh_rebind_uploads_nothing() {
    let mut b = binder();
    let mut mesh = cube();
    b.bind_mesh(&mut mesh).unwrap();
    assert_eq!(b.device().count(DeviceCall::is_upload), 3);

    b.device_mut().clear_calls();
    b.bind_mesh(&mut mesh).unwrap();
    assert_eq!(b.device().count(DeviceCall::is_upload), 0);
    assert!(!mesh.needs_rebind());
}

#[test]
fn uniform_arity_and_missing_data() {
    let mut b = binder();
    let mesh = cube();
    let shader = b
        .bind_shader(
            &ShaderSource::new("lit", "", "").with_uniforms(["alpha", "bad", "mvp", "tint"]),
        )
        .unwrap();
    b.device_mut().clear_calls();

    let m = [1.0f32; 16];
    let draw = Draw::new(7, &shader, &mesh)
        .with_uniform("mvp", m.to_vec())
        .with_uniform("tint", vec![1.0, 0.5, 0.25])
        .with_uniform("bad", vec![0.0; 5]);

    let mut frame = b.begin_frame();
    frame.submit(&draw);
    let report = frame.finish().unwrap();

    // the draw still goes out
    assert_eq!(b.device().count(DeviceCall::is_draw), 1);
    assert_eq!(
        report.anomalies,
        vec![
            BindingAnomaly::MissingUniformData {
                tag: 7,
                name: "alpha".into()
            },
            BindingAnomaly::UnsupportedUniformArity {
                tag: 7,
                name: "bad".into(),
                len: 5
            },
        ]
    );
    let set = uniforms_set(&b);
    assert!(set.contains(&RecordedUniform::Mat4(m)));
    assert!(set.contains(&RecordedUniform::Vec3([1.0, 0.5, 0.25])));
}

#[test]
fn bone_poses_and_shadow_map() {
    let mut b = binder();
    let mesh = cube();
    let shadow = b.bind_shadow_target().unwrap();
    let shader = b
        .bind_shader(&ShaderSource::new("skinned", "", "").with_uniforms(["bpos", "sm"]))
        .unwrap();
    b.device_mut().clear_calls();

    let poses = [0.0f32; 24];
    let mut frame = b.begin_frame();
    frame.submit(
        &Draw::new(3, &shader, &mesh)
            .with_poses(&poses)
            .with_shadow_map(shadow.depth),
    );
    frame.submit(&Draw::new(4, &shader, &mesh).with_shadow_map(shadow.depth));
    let report = frame.finish().unwrap();

    assert_eq!(
        report.anomalies,
        vec![BindingAnomaly::MissingAnimationData { tag: 4 }]
    );
    let set = uniforms_set(&b);
    assert!(set.contains(&RecordedUniform::Mat3x4 {
        data: poses.to_vec(),
        count: 2
    }));
    let unit = RenderSettings::default().shadow_map_unit;
    assert!(set.contains(&RecordedUniform::Int(unit as i32)));
    assert_eq!(
        b.device().count(|c| *c
            == DeviceCall::BindTexture {
                unit,
                texture: shadow.depth
            }),
        2
    );
}

#[test]
fn sampler_without_texture_is_an_anomaly() {
    let mut b = binder();
    let mesh = cube();
    let shader = b
        .bind_shader(&ShaderSource::new("t", "", "").with_uniforms(["uv0", "uv1"]))
        .unwrap();
    let data = [255u8; 4];
    let px = ferrous_renderer::Pixels::new(ferrous_renderer::PixelLayout::Rgba, 1, 1, &data)
        .unwrap();
    let tex = b.bind_texture(&px).unwrap();
    b.device_mut().clear_calls();

    let mut frame = b.begin_frame();
    frame.submit(&Draw::new(9, &shader, &mesh).with_texture(tex, 0));
    let report = frame.finish().unwrap();

    assert_eq!(
        b.device()
            .count(|c| *c == DeviceCall::BindTexture { unit: 0, texture: tex }),
        1
    );
    assert!(matches!(
        report.anomalies.as_slice(),
        [BindingAnomaly::MissingTexture { order: 1, .. }]
    ));
}

#[test]
fn lines_points_and_instances() {
    let mut b = binder();
    let mesh = cube();
    let shader = b.bind_shader(&ShaderSource::new("s", "", "")).unwrap();
    b.device_mut().clear_calls();

    let mut frame = b.begin_frame();
    frame.submit(&Draw::new(1, &shader, &mesh).with_primitive(Primitive::Lines));
    frame.submit(&Draw::new(2, &shader, &mesh).with_primitive(Primitive::Points));
    frame.submit(&Draw::new(3, &shader, &mesh).with_instances(3));
    frame.finish().unwrap();

    let draws: Vec<DeviceCall> = b
        .device()
        .calls()
        .iter()
        .filter(|c| c.is_draw())
        .cloned()
        .collect();
    assert_eq!(
        draws,
        vec![
            DeviceCall::DrawElements {
                primitive: Primitive::Lines,
                count: 36
            },
            DeviceCall::DrawArrays {
                primitive: Primitive::Points,
                count: 24
            },
            DeviceCall::DrawElementsInstanced {
                primitive: Primitive::Triangles,
                count: 36,
                instances: 3
            },
        ]
    );
    assert!(!b.device().is_enabled(Capability::ProgramPointSize));
}

#[test]
fn culled_candidates_are_counted() {
    let mut b = binder();
    let mesh = cube();
    let shader = b.bind_shader(&ShaderSource::new("s", "", "")).unwrap();
    let view = View::new(Camera::at(DVec3::ZERO)).with_culler(FrontCull::new(10.0));

    let positions = [
        DVec3::new(0.0, 0.0, -5.0),
        DVec3::new(0.0, 0.0, 50.0),
        DVec3::new(0.0, 0.0, 1.0),
        DVec3::new(30.0, 0.0, 0.0),
    ];
    let mut frame = b.begin_frame();
    for (tag, p) in positions.iter().enumerate() {
        if frame.visible(&view, *p) {
            frame.submit(&Draw::new(tag as u32, &shader, &mesh));
        }
    }
    let report = frame.finish().unwrap();
    assert_eq!(report.draws, 2);
    assert_eq!(report.culled, 2);
}

#[test]
fn stale_device_fails_the_frame() {
    let mut b = binder();
    let mut mesh = cube();
    let mut frame = b.begin_frame();
    frame.binder().device_mut().inject_error(0x505);
    let err = frame.bind_mesh(&mut mesh).unwrap_err();
    assert!(matches!(err, RenderError::StaleDevice { code: 0x505, .. }));
    let failure = frame.finish().unwrap_err();
    assert_eq!(failure.error, err);
}

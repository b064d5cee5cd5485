// Dry-runs one frame of a scattered cube field through the recording
// device and prints what the frame did.
//
//   cargo run -p ferrous_renderer --example culled_scene [config.toml]

use anyhow::Context;
use ferrous_core::config::{load_config, EngineConfig};
use ferrous_core::Camera;
use ferrous_renderer::geometry::primitives::cube;
use ferrous_renderer::{Binder, Draw, RecordingDevice, ShaderSource, View};
use glam::DVec3;
use rand::Rng;

const DEFAULT_CONFIG: &str = r#"
[logging]
level = "info,ferrous_renderer=debug"

[render]
layer_size = 512

[render.culling]
kind = "front"
radius = 40.0
"#;

fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => load_config(&path)?,
        None => EngineConfig::from_toml_str(DEFAULT_CONFIG)?,
    };
    ferrous_core::logging::init(&config.logging);

    let mut binder = Binder::new(RecordingDevice::new(), config.render)
        .context("creating binder")?;
    binder.set_viewport(800, 600);

    let mut mesh = cube();
    binder.bind_mesh(&mut mesh)?;
    let shader = binder.bind_shader(
        &ShaderSource::new("flat", "", "").with_uniforms(["mvp", "tint"]),
    )?;
    let camera = Camera::looking_at(DVec3::new(0.0, 2.0, 10.0), DVec3::ZERO);
    let view = View::from_settings(camera, &config.render.culling);

    let mut rng = rand::thread_rng();
    let positions: Vec<DVec3> = (0..500)
        .map(|_| {
            DVec3::new(
                rng.gen_range(-100.0..100.0),
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-100.0..100.0),
            )
        })
        .collect();

    let mut frame = binder.begin_frame();
    frame.binder().clear();
    for (tag, &position) in positions.iter().enumerate() {
        if !frame.visible(&view, position) {
            continue;
        }
        let model = ferrous_core::Transform::from_position(position).uniform_data();
        let draw = Draw::new(tag as u32, &shader, &mesh)
            .with_uniform("mvp", model.to_vec())
            .with_uniform("tint", vec![1.0, 1.0, 1.0, 1.0]);
        frame.submit(&draw);
    }
    let report = frame.finish()?;

    println!(
        "{} candidates: {} drawn, {} culled, {} anomalies, {} device calls",
        positions.len(),
        report.draws,
        report.culled,
        report.anomalies.len(),
        binder.device().calls().len()
    );
    Ok(())
}

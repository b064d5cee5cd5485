use crate::binder::Binder;
use crate::device::{
    Capability, Device, PolygonMode, Primitive, UniformLocation, UniformValue, VertexArrayId,
};
use crate::error::BindingAnomaly;

use super::{Draw, BONE_POSE_UNIFORM, DRAW_CALL, POSE_FLOATS, SAMPLER_PREFIX, SHADOW_MAP_UNIFORM};

/// Texture order encoded in a sampler name, `uv3` → 3.
fn sampler_order(name: &str) -> Option<u32> {
    name.strip_prefix(SAMPLER_PREFIX)?.parse().ok()
}

fn uniform_value(values: &[f32]) -> Option<UniformValue<'_>> {
    Some(match values {
        [x] => UniformValue::Float(*x),
        [x, y] => UniformValue::Vec2([*x, *y]),
        [x, y, z] => UniformValue::Vec3([*x, *y, *z]),
        [x, y, z, w] => UniformValue::Vec4([*x, *y, *z, *w]),
        m => UniformValue::Mat4(<&[f32; 16]>::try_from(m).ok()?),
    })
}

impl<D: Device> Binder<D> {
    /// Issues one draw with the fewest state changes the cache allows.
    pub(crate) fn submit(&mut self, draw: &Draw<'_>, anomalies: &mut Vec<BindingAnomaly>) {
        if let Some(rect) = draw.scissor {
            self.device.set_capability(Capability::ScissorTest, true);
            self.device.set_scissor_rect(rect);
        }

        self.set_depth_test(draw.depth_test);
        self.use_framebuffer(draw.framebuffer);
        self.use_program(draw.shader.program);

        self.bind_uniforms(draw, anomalies);

        self.device.bind_vertex_array(draw.vao);
        match draw.primitive {
            Primitive::Lines => {
                self.device.set_polygon_mode(PolygonMode::Line);
                self.device.draw_elements(Primitive::Lines, draw.face_count);
                self.device.set_polygon_mode(PolygonMode::Fill);
            }
            Primitive::Points => {
                self.device.set_capability(Capability::ProgramPointSize, true);
                self.device.draw_arrays(Primitive::Points, draw.vertex_count);
                self.device.set_capability(Capability::ProgramPointSize, false);
            }
            Primitive::Triangles if draw.instances > 0 => {
                self.device
                    .draw_elements_instanced(Primitive::Triangles, draw.face_count, draw.instances);
            }
            Primitive::Triangles => {
                self.device.draw_elements(Primitive::Triangles, draw.face_count);
            }
        }
        self.device.bind_vertex_array(VertexArrayId::UNALLOCATED);

        if draw.scissor.is_some() {
            self.device.set_capability(Capability::ScissorTest, false);
        }
        self.poll_draw_error(draw.tag, DRAW_CALL, anomalies);
    }

    fn poll_draw_error(&mut self, tag: u32, name: &str, anomalies: &mut Vec<BindingAnomaly>) {
        if let Some(code) = self.device.poll_error() {
            let anomaly = BindingAnomaly::DeviceError {
                tag,
                name: name.to_owned(),
                code,
            };
            log::warn!("{anomaly}");
            anomalies.push(anomaly);
        }
    }

    /// Feeds every uniform the shader resolved.  Problems are collected and
    /// the uniform is skipped.
    fn bind_uniforms(&mut self, draw: &Draw<'_>, anomalies: &mut Vec<BindingAnomaly>) {
        for (name, &location) in &draw.shader.uniforms {
            if let Err(anomaly) = self.bind_uniform(draw, name, location) {
                log::warn!("{anomaly}");
                anomalies.push(anomaly);
            }
            self.poll_draw_error(draw.tag, name, anomalies);
        }
    }

    fn bind_uniform(
        &mut self,
        draw: &Draw<'_>,
        name: &str,
        location: UniformLocation,
    ) -> Result<(), BindingAnomaly> {
        if name == BONE_POSE_UNIFORM {
            let poses = draw
                .poses
                .filter(|p| p.len() >= POSE_FLOATS)
                .ok_or(BindingAnomaly::MissingAnimationData { tag: draw.tag })?;
            let count = poses.len() / POSE_FLOATS;
            self.device
                .set_uniform(location, UniformValue::Mat3x4 { data: poses, count });
            return Ok(());
        }

        if name == SHADOW_MAP_UNIFORM {
            let unit = self.settings.shadow_map_unit;
            self.device.set_uniform(location, UniformValue::Int(unit as i32));
            self.device.bind_texture(unit, draw.shadow_map);
            return Ok(());
        }

        if let Some(order) = sampler_order(name) {
            let texture = draw
                .textures
                .iter()
                .find(|t| t.order == order)
                .ok_or_else(|| BindingAnomaly::MissingTexture {
                    tag: draw.tag,
                    name: name.to_owned(),
                    order,
                })?;
            self.device
                .set_uniform(location, UniformValue::Int(order as i32));
            self.device.bind_texture(order, texture.texture);
            return Ok(());
        }

        let values = draw
            .uniforms
            .get(name)
            .ok_or_else(|| BindingAnomaly::MissingUniformData {
                tag: draw.tag,
                name: name.to_owned(),
            })?;
        let value = uniform_value(values).ok_or_else(|| BindingAnomaly::UnsupportedUniformArity {
            tag: draw.tag,
            name: name.to_owned(),
            len: values.len(),
        })?;
        self.device.set_uniform(location, value);
        Ok(())
    }
}

//! Shader descriptions before and after linking.

use std::collections::BTreeMap;

use crate::device::{ProgramId, UniformLocation};

/// GLSL text plus the names the engine will look up once linked.
#[derive(Debug, Clone, Default)]
pub struct ShaderSource {
    pub name: String,
    pub vertex: String,
    pub fragment: String,
    /// Uniform names the draw path binds, e.g. `"mvp"`, `"uv0"`, `"sm"`.
    pub uniforms: Vec<String>,
    /// Vertex attribute names, e.g. `"in_v"`, `"in_n"`.
    pub layouts: Vec<String>,
}

impl ShaderSource {
    pub fn new(name: impl Into<String>, vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vertex: vertex.into(),
            fragment: fragment.into(),
            ..Default::default()
        }
    }

    pub fn with_uniforms<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.uniforms.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_layouts<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.layouts.extend(names.into_iter().map(Into::into));
        self
    }
}

/// A linked program and the locations it resolved.
///
/// Names the linker optimised away are absent from `uniforms`/`layouts`.
#[derive(Debug, Clone, PartialEq)]
pub struct Shader {
    pub name: String,
    pub program: ProgramId,
    pub uniforms: BTreeMap<String, UniformLocation>,
    pub layouts: BTreeMap<String, u32>,
}

impl Shader {
    pub fn uniform(&self, name: &str) -> Option<UniformLocation> {
        self.uniforms.get(name).copied()
    }

    pub fn layout(&self, name: &str) -> Option<u32> {
        self.layouts.get(name).copied()
    }
}

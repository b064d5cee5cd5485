//! Error types for the binding layer.
//!
//! [`RenderError`] is fatal for the operation that produced it.
//! [`BindingAnomaly`] is the non-fatal kind: a draw went out with some
//! uniform left unset, and the frame keeps going.

use thiserror::Error;

use crate::draw::FrameReport;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("graphics device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("shader `{name}` failed to build: {log}")]
    ShaderCompile { name: String, log: String },

    #[error("unsupported image format {0}")]
    UnsupportedImageFormat(String),

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("render target incomplete, status {status:#X}")]
    IncompleteRenderTarget { status: u32 },

    /// An error was already pending when the operation started.
    #[error("{operation}: fix prior device error {code:#X}")]
    StaleDevice { operation: &'static str, code: u32 },

    /// The device reported an error while the operation ran.
    #[error("{operation} failed with device error {code:#X}")]
    DeviceCall { operation: &'static str, code: u32 },

    #[error("mesh `{mesh}` has {count} vertices, limit is {limit}")]
    VertexLimitExceeded {
        mesh: String,
        count: usize,
        limit: usize,
    },

    #[error("mesh `{mesh}` slot {slot} holds {found} vertices, expected {expected}")]
    VertexCountMismatch {
        mesh: String,
        slot: u32,
        expected: usize,
        found: usize,
    },

    #[error("device allocation failed: {0}")]
    Allocation(String),

    #[error("frame halted by an earlier device error")]
    FrameHalted,
}

/// A uniform the shader expects that could not be bound for one draw.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindingAnomaly {
    #[error("no uniform data for model {tag} `{name}`")]
    MissingUniformData { tag: u32, name: String },

    #[error("animation data expected for model {tag}")]
    MissingAnimationData { tag: u32 },

    #[error("model {tag} has no texture with order {order} for `{name}`")]
    MissingTexture { tag: u32, name: String, order: u32 },

    #[error("cannot bind {len} values to `{name}` for model {tag}")]
    UnsupportedUniformArity { tag: u32, name: String, len: usize },

    /// `name` is the uniform being bound, or [`DRAW_CALL`](crate::draw::DRAW_CALL).
    #[error("binding `{name}` for model {tag} raised device error {code:#X}")]
    DeviceError { tag: u32, name: String, code: u32 },
}

/// A frame that stopped binding because the device went stale.  The report
/// still carries every draw and anomaly collected up to the end.
#[derive(Debug, Clone, Error)]
#[error("frame failed: {error}")]
pub struct FrameFailure {
    #[source]
    pub error: RenderError,
    pub report: FrameReport,
}

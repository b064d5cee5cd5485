/// CPU-side vertex attribute and index channels.
///
/// A channel owns its payload plus the device buffer it was last uploaded
/// to.  `dirty` is raised by every data change and cleared by the binder
/// once the payload has been copied to the device.
use crate::device::BufferId;

// ── Usage ─────────────────────────────────────────────────────────────────────

/// Upload hint for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Usage {
    /// Written once, drawn many times.
    #[default]
    Static,
    /// Rewritten often; uploads orphan the old storage first.
    Dynamic,
}

// ── Payload ───────────────────────────────────────────────────────────────────

/// Attribute values for one channel.
#[derive(Debug, Clone, PartialEq)]
pub enum VertexPayload {
    Floats(Vec<f32>),
    /// 8-bit components, e.g. packed colors or bone indices.
    Bytes(Vec<u8>),
}

impl VertexPayload {
    /// Number of scalar components.
    pub fn len(&self) -> usize {
        match self {
            VertexPayload::Floats(v) => v.len(),
            VertexPayload::Bytes(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw bytes as they are copied to the device.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            VertexPayload::Floats(v) => bytemuck::cast_slice(v),
            VertexPayload::Bytes(v) => v,
        }
    }
}

impl Default for VertexPayload {
    fn default() -> Self {
        VertexPayload::Floats(Vec::new())
    }
}

impl From<Vec<f32>> for VertexPayload {
    fn from(v: Vec<f32>) -> Self {
        VertexPayload::Floats(v)
    }
}

impl From<&[f32]> for VertexPayload {
    fn from(v: &[f32]) -> Self {
        VertexPayload::Floats(v.to_vec())
    }
}

impl From<Vec<u8>> for VertexPayload {
    fn from(v: Vec<u8>) -> Self {
        VertexPayload::Bytes(v)
    }
}

impl From<&[u8]> for VertexPayload {
    fn from(v: &[u8]) -> Self {
        VertexPayload::Bytes(v.to_vec())
    }
}

// ── Channels ──────────────────────────────────────────────────────────────────

/// Per-vertex (or per-instance) attribute data bound to one layout slot.
#[derive(Debug, Clone)]
pub struct VertexChannel {
    /// Shader attribute location.
    pub slot: u32,
    /// Components per vertex (1..=4), or 16 for an instance transform.
    pub stride: u32,
    pub usage: Usage,
    /// Map byte components to `[0, 1]` when read as floats.
    pub normalize: bool,
    /// Per-instance 4×4 transforms spread over `slot..slot + 4`.
    pub instanced: bool,
    pub data: VertexPayload,
    pub buffer: BufferId,
    pub dirty: bool,
}

impl VertexChannel {
    pub(crate) fn new(slot: u32, stride: u32, usage: Usage, normalize: bool) -> Self {
        Self {
            slot,
            stride,
            usage,
            normalize,
            instanced: false,
            data: VertexPayload::default(),
            buffer: BufferId::UNALLOCATED,
            dirty: false,
        }
    }

    /// Whole vertices (or instances) in the payload.
    pub fn element_count(&self) -> usize {
        match self.stride {
            0 => 0,
            s => self.data.len() / s as usize,
        }
    }
}

/// 16-bit triangle indices.
#[derive(Debug, Clone)]
pub struct FaceChannel {
    pub usage: Usage,
    pub data: Vec<u16>,
    pub buffer: BufferId,
    pub dirty: bool,
}

impl FaceChannel {
    pub(crate) fn new(usage: Usage) -> Self {
        Self {
            usage,
            data: Vec::new(),
            buffer: BufferId::UNALLOCATED,
            dirty: false,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}

/// A drawable mesh as the CPU sees it: attribute channels keyed by layout
/// slot, an optional index channel, and the vertex array the binder
/// allocated for it.
///
/// Nothing here talks to the device.  Data changes only raise dirty flags;
/// [`Binder::bind_mesh`](crate::binder::Binder::bind_mesh) does the upload.
use std::collections::BTreeMap;

use crate::device::VertexArrayId;
use crate::error::RenderError;

use super::channel::{FaceChannel, Usage, VertexChannel, VertexPayload};

/// Largest vertex count addressable with 16-bit indices (with headroom).
pub const MAX_VERTICES: usize = 65_000;

/// Floats in one per-instance 4×4 transform.
const INSTANCE_STRIDE: u32 = 16;

/// Face and vertex totals of a validated mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeshCounts {
    /// Index count (three per triangle).
    pub faces: usize,
    pub vertices: usize,
}

#[derive(Debug, Clone)]
pub struct Mesh {
    name: String,
    pub(crate) vao: VertexArrayId,
    pub(crate) needs_rebind: bool,
    pub(crate) faces: Option<FaceChannel>,
    pub(crate) channels: BTreeMap<u32, VertexChannel>,
}

impl Mesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vao: VertexArrayId::UNALLOCATED,
            needs_rebind: false,
            faces: None,
            channels: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Vertex array handle, `UNALLOCATED` until the first bind.
    pub fn vao(&self) -> VertexArrayId {
        self.vao
    }

    /// True when some channel changed since the last bind.
    pub fn needs_rebind(&self) -> bool {
        self.needs_rebind
    }

    // ── Vertex channels ───────────────────────────────────────────────────────

    /// Declares an attribute channel at `slot`.  A second call for the same
    /// slot keeps the existing channel untouched.
    pub fn init_data(&mut self, slot: u32, stride: u32, usage: Usage, normalize: bool) -> &mut Self {
        self.channels
            .entry(slot)
            .or_insert_with(|| VertexChannel::new(slot, stride, usage, normalize));
        self
    }

    /// Declares a per-instance transform channel.  Each instance carries a
    /// column-major 4×4 matrix read through slots `slot..slot + 4`.
    pub fn init_instanced(&mut self, slot: u32, usage: Usage) -> &mut Self {
        self.channels.entry(slot).or_insert_with(|| {
            let mut channel = VertexChannel::new(slot, INSTANCE_STRIDE, usage, false);
            channel.instanced = true;
            channel
        });
        self
    }

    /// Replaces the payload of an initialized channel.  Unknown slots are
    /// ignored.
    pub fn set_data(&mut self, slot: u32, data: impl Into<VertexPayload>) -> &mut Self {
        if let Some(channel) = self.channels.get_mut(&slot) {
            channel.data = data.into();
            channel.dirty = true;
            self.needs_rebind = true;
        }
        self
    }

    pub fn channel(&self, slot: u32) -> Option<&VertexChannel> {
        self.channels.get(&slot)
    }

    /// Channels in ascending slot order.
    pub fn channels(&self) -> impl Iterator<Item = &VertexChannel> {
        self.channels.values()
    }

    // ── Faces ─────────────────────────────────────────────────────────────────

    pub fn init_faces(&mut self, usage: Usage) -> &mut Self {
        self.faces.get_or_insert_with(|| FaceChannel::new(usage));
        self
    }

    /// Replaces the index payload.  Ignored until `init_faces` was called.
    pub fn set_faces(&mut self, indices: impl Into<Vec<u16>>) -> &mut Self {
        if let Some(faces) = self.faces.as_mut() {
            faces.data = indices.into();
            faces.dirty = true;
            self.needs_rebind = true;
        }
        self
    }

    pub fn faces(&self) -> Option<&FaceChannel> {
        self.faces.as_ref()
    }

    // ── Counts ────────────────────────────────────────────────────────────────

    /// `(index count, vertex count)`.  The vertex count is read from the
    /// lowest-slot per-vertex channel.
    pub fn counts(&self) -> (usize, usize) {
        let faces = self.faces.as_ref().map_or(0, |f| f.data.len());
        let verts = self
            .channels
            .values()
            .find(|c| !c.instanced)
            .map_or(0, VertexChannel::element_count);
        (faces, verts)
    }

    /// Number of instance transforms, 0 for a plain mesh.
    pub fn instance_count(&self) -> usize {
        self.channels
            .values()
            .filter(|c| c.instanced)
            .map(VertexChannel::element_count)
            .max()
            .unwrap_or(0)
    }

    /// Checks the vertex limit and that every per-vertex channel agrees on
    /// the vertex count.
    pub fn validate(&self) -> Result<MeshCounts, RenderError> {
        let (faces, vertices) = self.counts();
        if vertices > MAX_VERTICES {
            return Err(RenderError::VertexLimitExceeded {
                mesh: self.name.clone(),
                count: vertices,
                limit: MAX_VERTICES,
            });
        }
        for channel in self.channels.values().filter(|c| !c.instanced) {
            let found = channel.element_count();
            if found != vertices {
                return Err(RenderError::VertexCountMismatch {
                    mesh: self.name.clone(),
                    slot: channel.slot,
                    expected: vertices,
                    found,
                });
            }
        }
        Ok(MeshCounts { faces, vertices })
    }

    /// Forgets every device handle so the next bind reallocates and
    /// re-uploads everything.
    pub(crate) fn reset_device_handles(&mut self) {
        self.vao = VertexArrayId::UNALLOCATED;
        for channel in self.channels.values_mut() {
            channel.buffer = Default::default();
            channel.dirty = true;
        }
        if let Some(faces) = self.faces.as_mut() {
            faces.buffer = Default::default();
            faces.dirty = true;
        }
        self.needs_rebind = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Mesh {
        let mut m = Mesh::new("tri");
        m.init_data(0, 3, Usage::Static, false)
            .set_data(0, vec![0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0])
            .init_faces(Usage::Static)
            .set_faces(vec![0u16, 1, 2]);
        m
    }

    #[test]
    fn set_data_marks_dirty() {
        let m = triangle();
        assert!(m.needs_rebind());
        assert!(m.channel(0).map_or(false, |c| c.dirty));
        assert!(m.faces().map_or(false, |f| f.dirty));
    }

    #[test]
    fn set_data_on_unknown_slot_is_ignored() {
        let mut m = Mesh::new("empty");
        m.set_data(4, vec![1.0f32]);
        assert!(!m.needs_rebind());
        assert!(m.channel(4).is_none());
    }

    #[test]
    fn set_faces_before_init_is_ignored() {
        let mut m = Mesh::new("empty");
        m.set_faces(vec![0u16, 1, 2]);
        assert!(m.faces().is_none());
        assert!(!m.needs_rebind());
    }

    #[test]
    fn init_data_is_idempotent() {
        let mut m = triangle();
        m.init_data(0, 2, Usage::Dynamic, true);
        let c = m.channel(0).unwrap();
        assert_eq!(c.stride, 3);
        assert_eq!(c.usage, Usage::Static);
        assert_eq!(c.data.len(), 9);
    }

    #[test]
    fn counts_use_lowest_slot() {
        let mut m = triangle();
        m.init_data(2, 2, Usage::Static, false)
            .set_data(2, vec![0.0f32; 6]);
        assert_eq!(m.counts(), (3, 3));
        assert_eq!(m.validate().unwrap(), MeshCounts { faces: 3, vertices: 3 });
    }

    #[test]
    fn mismatched_channel_is_rejected() {
        let mut m = triangle();
        m.init_data(1, 4, Usage::Static, true)
            .set_data(1, vec![255u8; 8]);
        let err = m.validate().unwrap_err();
        assert!(matches!(
            err,
            RenderError::VertexCountMismatch { slot: 1, expected: 3, found: 2, .. }
        ));
    }

    #[test]
    fn vertex_limit() {
        let mut m = Mesh::new("big");
        m.init_data(0, 1, Usage::Static, false)
            .set_data(0, vec![0.0f32; MAX_VERTICES]);
        assert_eq!(m.validate().unwrap().vertices, MAX_VERTICES);

        m.set_data(0, vec![0.0f32; MAX_VERTICES + 1]);
        assert!(matches!(
            m.validate(),
            Err(RenderError::VertexLimitExceeded { count: 65_001, .. })
        ));
    }

    #[test]
    fn instance_channel_is_excluded_from_agreement() {
        let mut m = triangle();
        m.init_instanced(4, Usage::Dynamic)
            .set_data(4, vec![0.0f32; 16 * 5]);
        assert_eq!(m.instance_count(), 5);
        assert!(m.validate().is_ok());
        assert_eq!(m.counts(), (3, 3));
    }

    #[test]
    fn reset_handles_forces_full_upload() {
        let mut m = triangle();
        m.vao = VertexArrayId(9);
        m.needs_rebind = false;
        m.channels.get_mut(&0).unwrap().dirty = false;
        m.reset_device_handles();
        assert!(!m.vao().is_allocated());
        assert!(m.needs_rebind());
        assert!(m.channel(0).unwrap().dirty);
    }
}

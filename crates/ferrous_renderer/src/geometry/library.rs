//! Shared mesh registry.
//!
//! Many scene instances draw the same mesh.  `MeshLibrary` keeps one copy per
//! handle together with a reference count; the last `release` hands the mesh
//! back so its device handles can be freed through the binder.

use std::collections::HashMap;

use super::mesh::Mesh;

// ─── Handle ────────────────────────────────────────────────────────────────

/// Stable key of a mesh inside a [`MeshLibrary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

struct Entry {
    mesh: Mesh,
    refs: usize,
}

// ─── Library ───────────────────────────────────────────────────────────────

pub struct MeshLibrary {
    entries: HashMap<MeshHandle, Entry>,
    by_name: HashMap<String, MeshHandle>,
    next_id: u64,
}

impl Default for MeshLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshLibrary {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            by_name: HashMap::new(),
            next_id: 1,
        }
    }

    /// Stores `mesh` with one reference.  A mesh with the same name already
    /// in the library is shared instead and `mesh` is dropped.
    pub fn insert(&mut self, mesh: Mesh) -> MeshHandle {
        if let Some(&handle) = self.by_name.get(mesh.name()) {
            self.acquire(handle);
            return handle;
        }
        let handle = MeshHandle(self.next_id);
        self.next_id += 1;
        self.by_name.insert(mesh.name().to_owned(), handle);
        self.entries.insert(handle, Entry { mesh, refs: 1 });
        handle
    }

    /// Adds a reference.  Returns `false` for an unknown handle.
    pub fn acquire(&mut self, handle: MeshHandle) -> bool {
        match self.entries.get_mut(&handle) {
            Some(entry) => {
                entry.refs += 1;
                true
            }
            None => false,
        }
    }

    /// Drops a reference.  The mesh is removed and returned once nothing
    /// references it.
    pub fn release(&mut self, handle: MeshHandle) -> Option<Mesh> {
        let entry = self.entries.get_mut(&handle)?;
        entry.refs = entry.refs.saturating_sub(1);
        if entry.refs > 0 {
            return None;
        }
        let entry = self.entries.remove(&handle)?;
        self.by_name.remove(entry.mesh.name());
        log::debug!("mesh `{}` no longer referenced", entry.mesh.name());
        Some(entry.mesh)
    }

    pub fn find(&self, name: &str) -> Option<MeshHandle> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, handle: MeshHandle) -> Option<&Mesh> {
        self.entries.get(&handle).map(|e| &e.mesh)
    }

    pub fn get_mut(&mut self, handle: MeshHandle) -> Option<&mut Mesh> {
        self.entries.get_mut(&handle).map(|e| &mut e.mesh)
    }

    pub fn ref_count(&self, handle: MeshHandle) -> usize {
        self.entries.get(&handle).map_or(0, |e| e.refs)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Meshes that changed since their last bind.
    pub fn dirty_mut(&mut self) -> impl Iterator<Item = (MeshHandle, &mut Mesh)> {
        self.entries
            .iter_mut()
            .filter(|(_, e)| e.mesh.needs_rebind())
            .map(|(h, e)| (*h, &mut e.mesh))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_is_shared() {
        let mut lib = MeshLibrary::new();
        let a = lib.insert(Mesh::new("cube"));
        let b = lib.insert(Mesh::new("cube"));
        assert_eq!(a, b);
        assert_eq!(lib.len(), 1);
        assert_eq!(lib.ref_count(a), 2);
    }

    #[test]
    fn last_release_returns_mesh() {
        let mut lib = MeshLibrary::new();
        let h = lib.insert(Mesh::new("cube"));
        assert!(lib.acquire(h));
        assert!(lib.release(h).is_none());
        let mesh = lib.release(h).expect("last reference");
        assert_eq!(mesh.name(), "cube");
        assert!(lib.is_empty());
        assert!(lib.find("cube").is_none());
        assert!(lib.release(h).is_none());
    }

    #[test]
    fn unknown_handle() {
        let mut lib = MeshLibrary::new();
        assert!(!lib.acquire(MeshHandle(42)));
        assert!(lib.get(MeshHandle(42)).is_none());
        assert_eq!(lib.ref_count(MeshHandle(42)), 0);
    }
}

//! Typed device handles.
//!
//! Every handle is a `u32` newtype where `0` means "not allocated", matching
//! the name space of GL object ids.  Keeping them distinct stops a texture id
//! from being bound as a framebuffer.

macro_rules! device_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub u32);

        impl $name {
            pub const UNALLOCATED: Self = Self(0);

            #[inline]
            pub fn is_allocated(self) -> bool {
                self.0 != 0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

device_handle!(
    /// Vertex array object; groups a mesh's buffer bindings.
    VertexArrayId
);
device_handle!(BufferId);
device_handle!(ProgramId);
device_handle!(TextureId);
device_handle!(
    /// `UNALLOCATED` doubles as the default (window) framebuffer.
    FramebufferId
);
device_handle!(RenderbufferId);

/// Resolved uniform slot inside one linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_unallocated() {
        assert!(!TextureId::UNALLOCATED.is_allocated());
        assert!(!TextureId::default().is_allocated());
        assert!(TextureId(3).is_allocated());
    }

    #[test]
    fn display_names_the_kind() {
        assert_eq!(ProgramId(7).to_string(), "ProgramId#7");
    }
}

pub mod channel;
pub mod library;
pub mod mesh;
pub mod primitives;

pub use channel::{FaceChannel, Usage, VertexChannel, VertexPayload};
pub use library::{MeshHandle, MeshLibrary};
pub use mesh::{Mesh, MeshCounts, MAX_VERTICES};

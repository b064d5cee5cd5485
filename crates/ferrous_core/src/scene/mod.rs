//! Scene-side types the renderer consumes: camera pose and the
//! [`Viewpoint`] queries used by culling.

pub mod camera;

pub use camera::{Camera, Viewpoint};

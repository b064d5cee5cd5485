pub mod culling;
pub mod view;

pub use culling::{Culler, FrontCull, RadiusCull};
pub use view::View;

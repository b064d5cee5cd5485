mod cube;

pub use cube::{cube, COLOR_SLOT, POSITION_SLOT};

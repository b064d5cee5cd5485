/// Unit cube primitive centred at the origin.
///
/// Each of the six faces has a distinct vertex color so that camera movement
/// is clearly visible during development.  The cube uses 24 unique vertices
/// (4 per face) and 36 indices (2 triangles per face × 6 faces).
use crate::geometry::{Mesh, Usage};

/// Attribute slot of the positions (3 floats).
pub const POSITION_SLOT: u32 = 0;
/// Attribute slot of the colors (3 floats).
pub const COLOR_SLOT: u32 = 1;

pub fn cube() -> Mesh {
    // one constant per face color for readability
    const RED:     [f32; 3] = [1.0, 0.0, 0.0];
    const GREEN:   [f32; 3] = [0.0, 1.0, 0.0];
    const BLUE:    [f32; 3] = [0.0, 0.0, 1.0];
    const YELLOW:  [f32; 3] = [1.0, 1.0, 0.0];
    const MAGENTA: [f32; 3] = [1.0, 0.0, 1.0];
    const CYAN:    [f32; 3] = [0.0, 1.0, 1.0];

    #[rustfmt::skip]
    let corners: [([f32; 3], [f32; 3]); 24] = [
        // front  (z+)
        ([-1.0, -1.0,  1.0], RED),     ([ 1.0, -1.0,  1.0], RED),
        ([ 1.0,  1.0,  1.0], RED),     ([-1.0,  1.0,  1.0], RED),
        // back   (z-)
        ([-1.0, -1.0, -1.0], GREEN),   ([ 1.0, -1.0, -1.0], GREEN),
        ([ 1.0,  1.0, -1.0], GREEN),   ([-1.0,  1.0, -1.0], GREEN),
        // left   (x-)
        ([-1.0, -1.0, -1.0], BLUE),    ([-1.0, -1.0,  1.0], BLUE),
        ([-1.0,  1.0,  1.0], BLUE),    ([-1.0,  1.0, -1.0], BLUE),
        // right  (x+)
        ([ 1.0, -1.0, -1.0], YELLOW),  ([ 1.0, -1.0,  1.0], YELLOW),
        ([ 1.0,  1.0,  1.0], YELLOW),  ([ 1.0,  1.0, -1.0], YELLOW),
        // top    (y+)
        ([-1.0,  1.0, -1.0], MAGENTA), ([-1.0,  1.0,  1.0], MAGENTA),
        ([ 1.0,  1.0,  1.0], MAGENTA), ([ 1.0,  1.0, -1.0], MAGENTA),
        // bottom (y-)
        ([-1.0, -1.0, -1.0], CYAN),    ([-1.0, -1.0,  1.0], CYAN),
        ([ 1.0, -1.0,  1.0], CYAN),    ([ 1.0, -1.0, -1.0], CYAN),
    ];

    #[rustfmt::skip]
    let indices: Vec<u16> = vec![
        0,  1,  2,  2,  3,  0,  // front
        4,  6,  5,  4,  7,  6,  // back  (CCW flip)
        8,  9,  10, 8,  10, 11, // left
        12, 14, 13, 12, 15, 14, // right (CCW flip)
        16, 17, 18, 16, 18, 19, // top
        20, 22, 21, 20, 23, 22, // bottom (CCW flip)
    ];

    let positions: Vec<f32> = corners.iter().flat_map(|(p, _)| *p).collect();
    let colors: Vec<f32> = corners.iter().flat_map(|(_, c)| *c).collect();

    let mut mesh = Mesh::new("cube");
    mesh.init_data(POSITION_SLOT, 3, Usage::Static, false)
        .set_data(POSITION_SLOT, positions)
        .init_data(COLOR_SLOT, 3, Usage::Static, false)
        .set_data(COLOR_SLOT, colors)
        .init_faces(Usage::Static)
        .set_faces(indices);
    mesh
}

use crate::device::{FramebufferId, ProgramId};

/// What the binder believes is bound on the device.
///
/// Only the state that draw submission switches often is cached.  It must
/// match the device at all times, which holds as long as every call that
/// touches these bindings goes through the binder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceState {
    pub program: ProgramId,
    /// `UNALLOCATED` is the window framebuffer.
    pub framebuffer: FramebufferId,
    pub depth_test: bool,
    /// Window size restored when switching back to the window framebuffer.
    pub viewport: (i32, i32),
}

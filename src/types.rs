use crate::protocol::{LayoutDescriptor, MATRIX_CELLS};
use crate::transport::SharedPoseCells;
use crate::WebArError;
use std::ffi::c_int;

/// Lifecycle stage of an AR tracking session, as numbered by the provider.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// The environment has no AR capability. Terminal.
    Unsupported = -1,
    /// No session requested.
    Idle = 0,
    /// Start request sent, tracking not granted yet.
    Requested = 1,
    /// Session live, pose not necessarily stable.
    Tracking = 2,
    /// Session live and the pose should be consumed every frame.
    PoseValid = 3,
}

impl SessionState {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<SessionState> {
        match code {
            -1 => Some(SessionState::Unsupported),
            0 => Some(SessionState::Idle),
            1 => Some(SessionState::Requested),
            2 => Some(SessionState::Tracking),
            3 => Some(SessionState::PoseValid),
            _ => None,
        }
    }

    /// True while a session is live (`Tracking` or `PoseValid`).
    pub fn is_active(self) -> bool {
        matches!(self, SessionState::Tracking | SessionState::PoseValid)
    }
}

impl TryFrom<i32> for SessionState {
    type Error = WebArError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        SessionState::from_code(code).ok_or(WebArError::UnknownState(code))
    }
}

bitflags::bitflags! {
    /// Fields carried by a pose layout, in wire order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[repr(C)]
    pub struct PoseFields: u32 {
        const VIEW       = 1 << 0;
        const PROJECTION = 1 << 1;
        const POSITION   = 1 << 2;
    }
}

/// How pose cells travel from the provider to the consumer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Provider writes into consumer-owned cells before each tick.
    Shared = 0,
    /// Provider hands out a pointer to its own cells on request.
    Handle = 1,
}

/// Session command issued in response to the toggle affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Start,
    End,
}

/// Statically addressable state-change callback handed to the provider.
pub type StateChangeCallback = extern "C" fn(state: c_int);

/// The external AR runtime as seen from the consumer side.
///
/// All methods are called from the consumer's tick thread. `request_session`
/// and `end_session` are fire-and-forget: their outcome arrives later through
/// the callback registered in `initialize`.
pub trait Provider {
    /// Register the state callback and, for the shared transport, the cells
    /// the provider writes every frame. Returns the layout the provider speaks.
    fn initialize(
        &mut self,
        shared: Option<SharedPoseCells>,
        callback: StateChangeCallback,
    ) -> LayoutDescriptor;

    /// Synchronous poll of the provider's state code.
    fn state(&self) -> c_int;

    fn request_session(&mut self);

    fn end_session(&mut self);

    /// Latest view matrix, or `None` when no pose is available this frame.
    /// The borrow must end before the next provider call.
    fn view_matrix(&mut self) -> Option<&[f32; MATRIX_CELLS]>;

    /// Latest projection matrix, or `None` when unavailable.
    fn projection_matrix(&mut self) -> Option<&[f32; MATRIX_CELLS]>;
}

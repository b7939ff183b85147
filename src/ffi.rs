//! C FFI layer for webar.
//!
//! The host engine supplies the provider as a table of C function pointers
//! and drives the session through opaque handles.
//! The generated C header is written to `include/webar.h` by cbindgen.

use crate::config::BridgeConfig;
use crate::error::LastError;
use crate::protocol::{LayoutDescriptor, MATRIX_CELLS};
use crate::session::{SessionController, TickOutcome, STATE_ROUTE};
use crate::transform::HostPose;
use crate::transport::SharedPoseCells;
use crate::types::{PoseFields, Provider, SessionState, StateChangeCallback, Transport};
use crate::WebArError;
use std::ffi::{c_char, c_int};

/// Last error message for C consumers.
static LAST_ERROR: LastError = LastError::new();

/// Provider entry points and declared pose layout, filled in by the host.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct WebArProviderVTable {
    /// Layout magic the provider speaks (`POSE_MAGIC`).
    pub magic: u32,
    /// Layout version the provider speaks (`LAYOUT_VERSION`).
    pub version: u32,
    /// `PoseFields` bits the provider writes.
    pub fields: u32,
    /// Register the callback and, if non-null, the consumer-owned cells.
    pub initialize:
        Option<extern "C" fn(cells: *mut f32, cell_count: c_int, callback: StateChangeCallback)>,
    pub get_state: Option<extern "C" fn() -> c_int>,
    pub request_session: Option<extern "C" fn()>,
    pub end_session: Option<extern "C" fn()>,
    /// Pointer to 16 provider-owned cells, or null.
    pub get_view_matrix_ptr: Option<extern "C" fn() -> *const f32>,
    /// Pointer to 16 provider-owned cells, or null.
    pub get_projection_matrix_ptr: Option<extern "C" fn() -> *const f32>,
}

/// Host pose in C-compatible layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct WebArCameraPose {
    /// Position [x, y, z] in host convention.
    pub position: [f32; 3],
    /// Rotation quaternion [x, y, z, w] in host convention.
    pub rotation: [f32; 4],
}

impl From<&HostPose> for WebArCameraPose {
    fn from(pose: &HostPose) -> Self {
        Self {
            position: pose.position.to_array(),
            rotation: pose.rotation.to_array(),
        }
    }
}

struct Entries {
    initialize: extern "C" fn(*mut f32, c_int, StateChangeCallback),
    get_state: extern "C" fn() -> c_int,
    request_session: extern "C" fn(),
    end_session: extern "C" fn(),
    get_view_matrix_ptr: extern "C" fn() -> *const f32,
    get_projection_matrix_ptr: Option<extern "C" fn() -> *const f32>,
}

/// [`Provider`] backed by a host-supplied function table.
pub struct ForeignProvider {
    layout: LayoutDescriptor,
    entries: Entries,
    /// Kept alive while the provider may write through the raw pointer.
    _shared: Option<SharedPoseCells>,
}

impl ForeignProvider {
    /// Wrap a table. Every entry except the projection getter is required.
    pub fn new(table: &WebArProviderVTable) -> crate::Result<Self> {
        let entries = Entries {
            initialize: table.initialize.ok_or(WebArError::NullProvider)?,
            get_state: table.get_state.ok_or(WebArError::NullProvider)?,
            request_session: table.request_session.ok_or(WebArError::NullProvider)?,
            end_session: table.end_session.ok_or(WebArError::NullProvider)?,
            get_view_matrix_ptr: table.get_view_matrix_ptr.ok_or(WebArError::NullProvider)?,
            get_projection_matrix_ptr: table.get_projection_matrix_ptr,
        };
        Ok(Self {
            layout: LayoutDescriptor {
                magic: table.magic,
                version: table.version,
                fields: PoseFields::from_bits_retain(table.fields),
            },
            entries,
            _shared: None,
        })
    }
}

/// Borrow 16 cells behind a provider pointer.
///
/// # Safety
/// `ptr` must be null or point to 16 readable f32 values that stay valid and
/// unmodified until the next call into the provider.
unsafe fn matrix_from_ptr<'a>(ptr: *const f32) -> Option<&'a [f32; MATRIX_CELLS]> {
    ptr.cast::<[f32; MATRIX_CELLS]>().as_ref()
}

impl Provider for ForeignProvider {
    fn initialize(
        &mut self,
        shared: Option<SharedPoseCells>,
        callback: StateChangeCallback,
    ) -> LayoutDescriptor {
        let (cells, count) = match &shared {
            Some(cells) => (cells.as_mut_ptr(), cells.len() as c_int),
            None => (std::ptr::null_mut(), 0),
        };
        (self.entries.initialize)(cells, count, callback);
        self._shared = shared;
        self.layout
    }

    fn state(&self) -> c_int {
        (self.entries.get_state)()
    }

    fn request_session(&mut self) {
        (self.entries.request_session)()
    }

    fn end_session(&mut self) {
        (self.entries.end_session)()
    }

    fn view_matrix(&mut self) -> Option<&[f32; MATRIX_CELLS]> {
        // SAFETY: provider contract on `get_view_matrix_ptr`; the borrow is
        // tied to `&mut self`, so it ends before the next provider call.
        unsafe { matrix_from_ptr((self.entries.get_view_matrix_ptr)()) }
    }

    fn projection_matrix(&mut self) -> Option<&[f32; MATRIX_CELLS]> {
        let getter = self.entries.get_projection_matrix_ptr?;
        // SAFETY: as for `view_matrix`.
        unsafe { matrix_from_ptr(getter()) }
    }
}

/// Opaque session handle for C consumers.
pub struct WebArSession(SessionController<ForeignProvider>);

/// The statically addressable state callback. It is also the pointer every
/// provider receives in `initialize`. Codes arriving while no session is live
/// are discarded.
#[no_mangle]
pub extern "C" fn webar_on_state_change(state: c_int) {
    STATE_ROUTE.deliver(state);
}

/// Create the session, initialize the provider and validate its layout.
/// `transport`: 0 = shared cells, 1 = handle. `fields`: `PoseFields` bits.
/// Returns NULL on error (check webar_last_error()), including when a session
/// already exists.
///
/// # Safety
/// `vtable` must point to a valid `WebArProviderVTable`, or be null.
#[no_mangle]
pub unsafe extern "C" fn webar_session_new(
    vtable: *const WebArProviderVTable,
    transport: c_int,
    fields: u32,
) -> *mut WebArSession {
    LAST_ERROR.clear();
    let Some(table) = vtable.as_ref() else {
        LAST_ERROR.set(&WebArError::NullProvider);
        return std::ptr::null_mut();
    };

    let transport = match transport {
        0 => Transport::Shared,
        1 => Transport::Handle,
        other => {
            LAST_ERROR.set(&WebArError::InvalidConfig(format!(
                "unknown transport {}",
                other
            )));
            return std::ptr::null_mut();
        }
    };
    let config = BridgeConfig::new(transport, PoseFields::from_bits_retain(fields));

    let result = ForeignProvider::new(table)
        .and_then(|provider| SessionController::initialize(provider, &config));

    match result {
        Ok(controller) => Box::into_raw(Box::new(WebArSession(controller))),
        Err(e) => {
            LAST_ERROR.set(&e);
            std::ptr::null_mut()
        }
    }
}

/// Destroy a session and release the state route.
///
/// # Safety
/// `session` must be a pointer returned by `webar_session_new`, or null.
#[no_mangle]
pub unsafe extern "C" fn webar_session_free(session: *mut WebArSession) {
    if !session.is_null() {
        drop(Box::from_raw(session));
    }
}

/// Current session state code. Returns -1 (Unsupported) for a null session.
///
/// # Safety
/// `session` must be a valid session pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn webar_session_state(session: *const WebArSession) -> c_int {
    match session.as_ref() {
        Some(session) => session.0.current_state().code(),
        None => SessionState::Unsupported.code(),
    }
}

/// Session toggle. Returns 1 if a start was requested, 2 if an end was
/// requested, 0 otherwise.
///
/// # Safety
/// `session` must be a valid session pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn webar_session_button_pressed(session: *mut WebArSession) -> c_int {
    let Some(session) = session.as_mut() else {
        return 0;
    };
    match session.0.on_button_pressed() {
        Some(crate::types::Request::Start) => 1,
        Some(crate::types::Request::End) => 2,
        None => 0,
    }
}

/// Run one frame. Writes the new camera pose into `out` and returns 1 when a
/// pose was applied; returns 0 and leaves `out` untouched otherwise.
///
/// # Safety
/// `session` and `out` must be valid pointers, or null.
#[no_mangle]
pub unsafe extern "C" fn webar_session_tick(
    session: *mut WebArSession,
    out: *mut WebArCameraPose,
) -> c_int {
    if session.is_null() || out.is_null() {
        return 0;
    }
    let session = &mut *session;

    let mut applied = None;
    let outcome = session
        .0
        .tick(&mut |pose: &HostPose| applied = Some(WebArCameraPose::from(pose)));

    match (outcome, applied) {
        (TickOutcome::Applied(_), Some(pose)) => {
            out.write(pose);
            1
        }
        _ => 0,
    }
}

/// Get the last error message. Returns NULL if no error.
/// The returned pointer is valid until the next webar API call.
#[no_mangle]
pub extern "C" fn webar_last_error() -> *const c_char {
    LAST_ERROR.as_ptr()
}

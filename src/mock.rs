//! In-process provider for tests and demos.
//!
//! Nothing happens on its own: requests are only counted, and state changes
//! and poses are injected by the caller with [`MockProvider::notify`] and
//! [`MockProvider::publish`].

use crate::protocol::{LayoutDescriptor, PoseBuffer, MATRIX_CELLS, MAX_CELLS};
use crate::transport::SharedPoseCells;
use crate::types::{PoseFields, Provider, SessionState, StateChangeCallback};
use std::ffi::c_int;

pub struct MockProvider {
    layout: LayoutDescriptor,
    state: c_int,
    callback: Option<StateChangeCallback>,
    shared: Option<SharedPoseCells>,
    view: Option<[f32; MATRIX_CELLS]>,
    projection: Option<[f32; MATRIX_CELLS]>,
    start_requests: usize,
    end_requests: usize,
}

impl MockProvider {
    /// A provider speaking the current layout for `fields`.
    pub fn new(fields: PoseFields) -> Self {
        Self::with_layout(LayoutDescriptor::current(fields))
    }

    /// A provider declaring an arbitrary layout.
    pub fn with_layout(layout: LayoutDescriptor) -> Self {
        Self {
            layout,
            state: SessionState::Idle.code(),
            callback: None,
            shared: None,
            view: None,
            projection: None,
            start_requests: 0,
            end_requests: 0,
        }
    }

    /// A provider in an environment without AR support.
    pub fn unsupported(fields: PoseFields) -> Self {
        let mut provider = Self::new(fields);
        provider.state = SessionState::Unsupported.code();
        provider
    }

    pub fn is_initialized(&self) -> bool {
        self.callback.is_some()
    }

    pub fn start_requests(&self) -> usize {
        self.start_requests
    }

    pub fn end_requests(&self) -> usize {
        self.end_requests
    }

    /// Change state and call back into the consumer.
    pub fn notify(&mut self, state: SessionState) {
        self.notify_code(state.code());
    }

    /// Same as `notify` with a raw code, which may be out of range.
    pub fn notify_code(&mut self, code: c_int) {
        self.state = code;
        match self.callback {
            Some(callback) => callback(code),
            None => log::warn!("Mock state {} raised before initialize", code),
        }
    }

    /// Make `buffer` the current frame for both transports.
    pub fn publish(&mut self, buffer: &PoseBuffer) {
        self.view = Some(buffer.view);
        self.projection = buffer.projection;

        if let Some(shared) = &self.shared {
            let mut cells = [0.0f32; MAX_CELLS];
            match buffer.store(self.layout.fields, &mut cells) {
                Ok(written) => shared.write(&cells[..written]),
                Err(e) => log::warn!("Mock could not lay out pose: {}", e),
            }
        }
    }

    /// Set what the view handle points at; `None` is a null handle.
    pub fn set_view_matrix(&mut self, view: Option<[f32; MATRIX_CELLS]>) {
        self.view = view;
    }

    pub fn set_projection_matrix(&mut self, projection: Option<[f32; MATRIX_CELLS]>) {
        self.projection = projection;
    }
}

impl Provider for MockProvider {
    fn initialize(
        &mut self,
        shared: Option<SharedPoseCells>,
        callback: StateChangeCallback,
    ) -> LayoutDescriptor {
        self.shared = shared;
        self.callback = Some(callback);
        self.layout
    }

    fn state(&self) -> c_int {
        self.state
    }

    fn request_session(&mut self) {
        self.start_requests += 1;
    }

    fn end_session(&mut self) {
        self.end_requests += 1;
    }

    fn view_matrix(&mut self) -> Option<&[f32; MATRIX_CELLS]> {
        self.view.as_ref()
    }

    fn projection_matrix(&mut self) -> Option<&[f32; MATRIX_CELLS]> {
        self.projection.as_ref()
    }
}

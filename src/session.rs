//! Session lifecycle driven by provider notifications.
//!
//! The provider can only call a statically addressable function, with no
//! per-instance context. That function forwards into a process-wide route
//! holding the state cell of the single live controller.
//! Delivery only writes that cell; everything that reacts to state runs on
//! the next [`SessionController::tick`].

use crate::config::BridgeConfig;
use crate::transform::{self, HostPose, PoseSink};
use crate::transport::PoseReader;
use crate::types::{Provider, Request, SessionState, StateChangeCallback};
use crate::{Result, WebArError};
use std::ffi::c_int;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// The process-wide route, paired with the exported C callback.
pub(crate) static STATE_ROUTE: StateRoute = StateRoute::new(crate::ffi::webar_on_state_change);

/// Code held until the first notification or the startup poll lands.
const UNSET: i32 = i32::MIN;

/// Cached session state, written by notifications and read by the tick.
#[derive(Debug)]
pub(crate) struct StateCell {
    code: AtomicI32,
}

impl StateCell {
    pub(crate) fn new() -> Self {
        Self {
            code: AtomicI32::new(UNSET),
        }
    }

    pub(crate) fn get(&self) -> SessionState {
        SessionState::from_code(self.code.load(Ordering::Acquire)).unwrap_or(SessionState::Idle)
    }

    /// Store a notified state if the transition is permitted. Returns whether
    /// it was stored.
    pub(crate) fn apply(&self, next: SessionState) -> bool {
        self.code
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                let current = SessionState::from_code(current).unwrap_or(SessionState::Idle);
                transition_permitted(current, next).then_some(next.code())
            })
            .is_ok()
    }

    /// Adopt a polled startup state. Loses to any notification that already
    /// arrived.
    pub(crate) fn seed(&self, initial: SessionState) -> bool {
        self.code
            .compare_exchange(UNSET, initial.code(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// `Unsupported` is entered only from `Idle` and never left.
fn transition_permitted(from: SessionState, to: SessionState) -> bool {
    match (from, to) {
        (SessionState::Unsupported, _) => false,
        (SessionState::Idle, SessionState::Unsupported) => true,
        (_, SessionState::Unsupported) => false,
        _ => true,
    }
}

/// Slot routing provider callbacks to the live controller.
///
/// A route owns the one `extern "C"` function that delivers into it, and at
/// most one controller may hold it at a time.
pub(crate) struct StateRoute {
    callback: StateChangeCallback,
    slot: Mutex<Option<Arc<StateCell>>>,
}

impl StateRoute {
    pub(crate) const fn new(callback: StateChangeCallback) -> Self {
        Self {
            callback,
            slot: Mutex::new(None),
        }
    }

    /// The function providers must call to reach this route.
    pub(crate) fn callback(&self) -> StateChangeCallback {
        self.callback
    }

    #[cfg(test)]
    fn is_claimed(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Write a notified state code into the live controller's cell.
    ///
    /// Unknown codes, and any code arriving while no controller holds the
    /// route, are discarded.
    pub(crate) fn deliver(&self, code: c_int) {
        let Some(state) = SessionState::from_code(code) else {
            log::trace!("Dropping unknown state code {}", code);
            return;
        };
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(cell) => {
                if !cell.apply(state) {
                    log::trace!("Ignoring transition {:?} -> {:?}", cell.get(), state);
                }
            }
            None => log::warn!("State {:?} delivered with no live controller", state),
        }
    }

    fn claim(&self, cell: Arc<StateCell>) -> Result<()> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Err(WebArError::AlreadyInitialized);
        }
        *slot = Some(cell);
        Ok(())
    }

    fn release(&self, cell: &Arc<StateCell>) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|held| Arc::ptr_eq(held, cell)) {
            *slot = None;
        }
    }
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// A fresh pose was applied to the sink.
    Applied(HostPose),
    /// Pose valid but none available this frame; the sink kept its last pose.
    Held,
    /// State is not `PoseValid`; nothing was pulled.
    Inactive,
}

/// Owner of one AR session against one provider.
pub struct SessionController<P: Provider> {
    provider: P,
    route: &'static StateRoute,
    state: Arc<StateCell>,
    reader: PoseReader,
    last_pose: Option<HostPose>,
}

impl<P: Provider> SessionController<P> {
    /// Register with the provider and become the process's live controller.
    ///
    /// Fails with `AlreadyInitialized` while another controller is live, and
    /// with a layout error if the provider speaks a different pose layout.
    /// Nothing stays claimed on failure.
    pub fn initialize(provider: P, config: &BridgeConfig) -> Result<Self> {
        Self::initialize_on(&STATE_ROUTE, provider, config)
    }

    fn initialize_on(
        route: &'static StateRoute,
        mut provider: P,
        config: &BridgeConfig,
    ) -> Result<Self> {
        config.validate()?;

        let state = Arc::new(StateCell::new());
        route.claim(state.clone())?;

        let reader = PoseReader::new(config.transport, config.fields);
        let declared = provider.initialize(reader.shared_cells(), route.callback());
        if let Err(e) = declared.validate(config.fields) {
            log::warn!("Refusing to start AR session: {}", e);
            route.release(&state);
            return Err(e);
        }

        match SessionState::from_code(provider.state()) {
            Some(initial) => {
                if !state.seed(initial) {
                    log::debug!("Keeping notified state over polled {:?}", initial);
                }
            }
            None => log::debug!("Provider reported unknown initial state"),
        }

        log::info!(
            "AR bridge initialized: transport={:?} fields={:?} state={:?}",
            config.transport,
            config.fields,
            state.get()
        );

        Ok(Self {
            provider,
            route,
            state,
            reader,
            last_pose: None,
        })
    }

    /// Last state notified by the provider.
    pub fn current_state(&self) -> SessionState {
        self.state.get()
    }

    /// Ask the provider to start a session. Only valid from `Idle`.
    ///
    /// Returns whether the request was issued. State does not change until
    /// the provider calls back.
    pub fn request_start(&mut self) -> bool {
        let state = self.current_state();
        if state != SessionState::Idle {
            log::debug!("Ignoring start request in {:?}", state);
            return false;
        }
        log::debug!("Requesting AR session");
        self.provider.request_session();
        true
    }

    /// Ask the provider to end the session. Only valid while active.
    pub fn request_end(&mut self) -> bool {
        let state = self.current_state();
        if !state.is_active() {
            log::debug!("Ignoring end request in {:?}", state);
            return false;
        }
        log::debug!("Ending AR session");
        self.provider.end_session();
        true
    }

    /// Toggle: start from `Idle`, end while active, otherwise nothing.
    pub fn on_button_pressed(&mut self) -> Option<Request> {
        if self.request_start() {
            Some(Request::Start)
        } else if self.request_end() {
            Some(Request::End)
        } else {
            None
        }
    }

    /// Per-frame step. Pulls and applies a pose only in `PoseValid`.
    pub fn tick<S: PoseSink + ?Sized>(&mut self, sink: &mut S) -> TickOutcome {
        if self.current_state() != SessionState::PoseValid {
            return TickOutcome::Inactive;
        }
        let Some(buffer) = self.reader.pull_pose(&mut self.provider) else {
            return TickOutcome::Held;
        };
        let pose = transform::to_host_pose(buffer);
        sink.apply_pose(&pose);
        self.last_pose = Some(pose);
        TickOutcome::Applied(pose)
    }

    /// Most recently applied pose.
    pub fn last_pose(&self) -> Option<HostPose> {
        self.last_pose
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }
}

impl<P: Provider> Drop for SessionController<P> {
    fn drop(&mut self) {
        self.route.release(&self.state);
    }
}

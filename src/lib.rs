//! # webar - AR session and pose bridge for WebXR providers
//!
//! Links a host engine to an AR runtime living across a foreign-function
//! boundary that only passes flat f32 cells, pointers and integer codes.
//! Provides:
//! - A session state machine fed by asynchronous provider callbacks
//! - A versioned pose layout, pulled from shared cells or provider handles
//! - Conversion of WebXR view matrices into host position and rotation
//! - C FFI for integration with engines that load the crate as a library
//!
//! ## Quick Start
//! ```
//! use webar::mock::MockProvider;
//! use webar::{BridgeConfig, HostPose, PoseFields, SessionController, SessionState};
//!
//! let provider = MockProvider::new(PoseFields::VIEW);
//! let mut session = SessionController::initialize(provider, &BridgeConfig::default()).unwrap();
//!
//! session.on_button_pressed();
//! session.provider_mut().notify(SessionState::PoseValid);
//!
//! let mut camera = HostPose::default();
//! session.tick(&mut camera);
//! ```

pub mod error;
pub mod types;
pub mod protocol;
pub mod config;
pub mod transport;
pub mod transform;
pub mod session;
pub mod mock;
pub mod ffi;

pub use config::BridgeConfig;
pub use error::WebArError;
pub use protocol::{LayoutDescriptor, PoseBuffer};
pub use session::{SessionController, TickOutcome};
pub use transform::{HostPose, PoseSink};
pub use types::*;

/// Result type alias for webar operations.
pub type Result<T> = std::result::Result<T, WebArError>;

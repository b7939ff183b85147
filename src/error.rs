use crate::types::PoseFields;
use std::fmt;

/// Errors raised while bringing up or driving an AR session bridge.
#[derive(Debug, thiserror::Error)]
pub enum WebArError {
    #[error("A session controller is already live on this route")]
    AlreadyInitialized,

    #[error(
        "Pose layout mismatch: expected magic 0x{expected_magic:08x} v{expected_version}, \
         provider declared 0x{magic:08x} v{version}"
    )]
    LayoutMismatch {
        expected_magic: u32,
        expected_version: u32,
        magic: u32,
        version: u32,
    },

    #[error("Pose field mismatch: expected {expected:?}, provider declared {declared:?}")]
    FieldMismatch {
        expected: PoseFields,
        declared: PoseFields,
    },

    #[error("Unknown session state code: {0}")]
    UnknownState(i32),

    #[error("Pose buffer too short: need {needed} cells, got {got}")]
    ShortBuffer { needed: usize, got: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Provider table is null or incomplete")]
    NullProvider,
}

/// Last-error storage for the C FFI layer.
pub(crate) struct LastError {
    message: std::sync::Mutex<String>,
}

impl LastError {
    pub const fn new() -> Self {
        Self {
            message: std::sync::Mutex::new(String::new()),
        }
    }

    pub fn set(&self, err: &WebArError) {
        if let Ok(mut msg) = self.message.lock() {
            *msg = fmt::format(format_args!("{}\0", err));
        }
    }

    pub fn clear(&self) {
        if let Ok(mut msg) = self.message.lock() {
            msg.clear();
        }
    }

    pub fn as_ptr(&self) -> *const std::ffi::c_char {
        match self.message.lock() {
            Ok(msg) if !msg.is_empty() => msg.as_ptr() as *const std::ffi::c_char,
            _ => std::ptr::null(),
        }
    }
}

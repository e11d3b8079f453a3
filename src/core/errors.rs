//! Core error types

use std::fmt;

use thiserror::Error;

use crate::core::handle::Handle;

/// What kind of object a lookup was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Object,
    Output,
    View,
    InputDevice,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ObjectKind::Object => "object",
            ObjectKind::Output => "output",
            ObjectKind::View => "view",
            ObjectKind::InputDevice => "input device",
        })
    }
}

/// Core compositor errors.
///
/// Every error is a local outcome handed back to the backend that issued the
/// call; nothing here is fatal to the core itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("{kind} {id:#x} not found")]
    NotFound { kind: ObjectKind, id: u64 },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Compositor is not ready")]
    NotReady,

    #[error("Compositor is shutting down")]
    ShuttingDown,

    #[error("Output {output} still owns {views} view(s)")]
    DanglingReference { output: Handle, views: usize },
}

impl CoreError {
    pub fn not_found(kind: ObjectKind, handle: Handle) -> Self {
        Self::NotFound {
            kind,
            id: handle.raw(),
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Stable numeric code for reporting across a native boundary.
    pub fn code(&self) -> u32 {
        match self {
            CoreError::NotFound { .. } => 1,
            CoreError::InvalidState(_) => 2,
            CoreError::NotReady => 3,
            CoreError::ShuttingDown => 4,
            CoreError::DanglingReference { .. } => 5,
        }
    }

    /// Errors caused by a stale or wrong handle; the caller can carry on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CoreError::NotFound { .. }
                | CoreError::InvalidState(_)
                | CoreError::DanglingReference { .. }
        )
    }
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

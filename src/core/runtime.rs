//! Deferred commands.
//!
//! Handlers run while the compositor state is borrowed read-only, so they
//! cannot mutate it directly. Instead they queue [`Command`]s, which the
//! compositor applies through its authoritative mutation paths once the
//! handler has returned.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::core::handle::Handle;
use crate::core::view::{GrabKind, ViewState};
use crate::util::geometry::{Geometry, Point};

// ============================================================================
// Commands
// ============================================================================

/// A state change requested from inside a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Focus an output, or clear output focus with `None`
    FocusOutput(Option<Handle>),
    /// Focus a view, or clear view focus with `None`
    FocusView(Option<Handle>),
    SetGeometry { view: Handle, geometry: Geometry },
    SetState { view: Handle, state: ViewState, toggle: bool },
    SetOutput { view: Handle, output: Handle },
    SetMask { view: Handle, mask: u32 },
    BringToFront(Handle),
    SendToBack(Handle),
    /// Place `view` directly above `other`; both must share an output
    BringAbove { view: Handle, other: Handle },
    /// Place `view` directly below `other`; both must share an output
    SendBelow { view: Handle, other: Handle },
    /// Replace the stacking order of `output`, back to front
    SetViews { output: Handle, views: Vec<Handle> },
    /// Destroy a view as if the client had closed it
    CloseView(Handle),
    BeginGrab { view: Handle, kind: GrabKind, point: Point },
    ScheduleRender(Handle),
    Terminate,
}

// ============================================================================
// Command Queue
// ============================================================================

/// FIFO of commands waiting to be applied.
#[derive(Debug, Default)]
pub struct CommandQueue {
    commands: Mutex<VecDeque<Command>>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a command for execution
    pub fn push(&self, command: Command) {
        self.lock().push_back(command);
    }

    /// Take all pending commands, oldest first
    pub fn take_all(&self) -> Vec<Command> {
        self.lock().drain(..).collect()
    }

    pub fn has_commands(&self) -> bool {
        !self.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_commands()
    }

    /// Drop everything still queued, returning how many were dropped.
    pub fn clear(&self) -> usize {
        let mut commands = self.lock();
        let dropped = commands.len();
        commands.clear();
        dropped
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Command>> {
        self.commands
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

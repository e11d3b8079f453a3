//! Input event routing.
//!
//! The router resolves the target view for an event (explicit target, else
//! the focused view) and hands the event to a sink exactly once. It applies
//! no policy of its own: the sink's verdict is returned unchanged.

pub mod device;
pub mod keyboard;
pub mod pointer;
pub mod touch;

pub use device::{InputDevice, InputDevices};
pub use keyboard::{KeyState, LedBits, ModifierBits, Modifiers};
pub use pointer::{ButtonState, PointerState, ScrollAxis};
pub use touch::TouchType;

use crate::core::errors::Result;
use crate::core::handle::Handle;
use crate::core::interface::Capabilities;
use crate::core::state::CompositorState;
use crate::util::geometry::Point;
use crate::util::logging::INPUT;

/// Whether a handler consumed an input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Propagation {
    Consumed,
    #[default]
    Propagate,
}

impl Propagation {
    pub fn is_consumed(self) -> bool {
        self == Propagation::Consumed
    }
}

impl From<bool> for Propagation {
    fn from(consumed: bool) -> Self {
        if consumed {
            Propagation::Consumed
        } else {
            Propagation::Propagate
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Key {
        time: u32,
        modifiers: Modifiers,
        key: u32,
        state: KeyState,
    },
    Button {
        time: u32,
        modifiers: Modifiers,
        button: u32,
        state: ButtonState,
        point: Point,
    },
    Scroll {
        time: u32,
        modifiers: Modifiers,
        axis: ScrollAxis,
        /// Both axes travel together
        amount: [f64; 2],
    },
    Motion {
        time: u32,
        point: Point,
    },
    Touch {
        time: u32,
        modifiers: Modifiers,
        kind: TouchType,
        slot: i32,
        point: Point,
    },
}

impl InputEvent {
    pub fn time(&self) -> u32 {
        match *self {
            InputEvent::Key { time, .. }
            | InputEvent::Button { time, .. }
            | InputEvent::Scroll { time, .. }
            | InputEvent::Motion { time, .. }
            | InputEvent::Touch { time, .. } => time,
        }
    }

    /// The handler capability this event is delivered through.
    pub fn capability(&self) -> Capabilities {
        match self {
            InputEvent::Key { .. } => Capabilities::KEYBOARD_KEY,
            InputEvent::Button { .. } => Capabilities::POINTER_BUTTON,
            InputEvent::Scroll { .. } => Capabilities::POINTER_SCROLL,
            InputEvent::Motion { .. } => Capabilities::POINTER_MOTION,
            InputEvent::Touch { .. } => Capabilities::TOUCH,
        }
    }
}

/// Receiver of routed input.
pub trait InputSink {
    /// Deliver `event` to `view`; the result goes back to the backend as is.
    fn deliver(&mut self, state: &CompositorState, view: Handle, event: &InputEvent) -> Propagation;

    /// Called for events that have no target view.
    fn unrouted(&mut self, state: &CompositorState, event: &InputEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct InputRouter;

impl InputRouter {
    pub fn new() -> Self {
        Self
    }

    /// Route one event.
    ///
    /// `target` of `None` (or the null handle) resolves to the focused view.
    /// An explicit target must be a live view. With no target at all the
    /// event goes to [`InputSink::unrouted`] and reports `Propagate`.
    pub fn route(
        &self,
        state: &CompositorState,
        target: Option<Handle>,
        event: &InputEvent,
        sink: &mut dyn InputSink,
    ) -> Result<Propagation> {
        let target = match target.and_then(Handle::non_null) {
            Some(view) => {
                state.view(view)?;
                Some(view)
            }
            None => state.focused_view(),
        };

        match target {
            Some(view) => {
                let verdict = sink.deliver(state, view, event);
                tracing::trace!("[{}] Routed {:?} to view {} -> {:?}", INPUT, event, view, verdict);
                Ok(verdict)
            }
            None => {
                sink.unrouted(state, event);
                tracing::trace!("[{}] No target for {:?}", INPUT, event);
                Ok(Propagation::Propagate)
            }
        }
    }
}

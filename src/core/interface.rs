//! Embedder handler interface.
//!
//! An embedder implements [`Interface`] to receive every inbound event the
//! core processes. Which handlers are live is decided once, when the
//! compositor is built, from [`Interface::capabilities`] intersected with the
//! configured upper bound. A disabled handler behaves like the default
//! implementation: requests are accepted, input is not consumed and
//! notifications are dropped.
//!
//! A handler that panics is treated as having answered with its fallback:
//! requests and creations are rejected, input propagates and notifications
//! are dropped. The panic does not cross the compositor.

use std::panic::{self, AssertUnwindSafe};

use crate::core::handle::Handle;
use crate::core::input::{
    ButtonState, InputDevice, InputEvent, InputSink, KeyState, Modifiers, Propagation, ScrollAxis,
    TouchType,
};
use crate::core::request::{Decision, RequestPolicy};
use crate::core::runtime::{Command, CommandQueue};
use crate::core::state::CompositorState;
use crate::core::view::{ResizeEdges, ViewState};
use crate::util::geometry::{Geometry, Point, Size};
use crate::util::logging::CORE;

bitflags::bitflags! {
    /// One flag per inbound handler.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        const OUTPUT_CREATED        = 1 << 0;
        const OUTPUT_DESTROYED      = 1 << 1;
        const OUTPUT_FOCUS          = 1 << 2;
        const OUTPUT_RESOLUTION     = 1 << 3;
        const OUTPUT_PRE_RENDER     = 1 << 4;
        const OUTPUT_POST_RENDER    = 1 << 5;
        const VIEW_CREATED          = 1 << 6;
        const VIEW_DESTROYED        = 1 << 7;
        const VIEW_FOCUS            = 1 << 8;
        const VIEW_MOVE_TO_OUTPUT   = 1 << 9;
        const VIEW_GEOMETRY_REQUEST = 1 << 10;
        const VIEW_STATE_REQUEST    = 1 << 11;
        const VIEW_MOVE_REQUEST     = 1 << 12;
        const VIEW_RESIZE_REQUEST   = 1 << 13;
        const VIEW_PRE_RENDER       = 1 << 14;
        const VIEW_POST_RENDER      = 1 << 15;
        const KEYBOARD_KEY          = 1 << 16;
        const POINTER_BUTTON        = 1 << 17;
        const POINTER_SCROLL        = 1 << 18;
        const POINTER_MOTION        = 1 << 19;
        const TOUCH                 = 1 << 20;
        const COMPOSITOR_READY      = 1 << 21;
        const COMPOSITOR_TERMINATE  = 1 << 22;
        const INPUT_CREATED         = 1 << 23;
        const INPUT_DESTROYED       = 1 << 24;

        const OUTPUT = Self::OUTPUT_CREATED.bits()
            | Self::OUTPUT_DESTROYED.bits()
            | Self::OUTPUT_FOCUS.bits()
            | Self::OUTPUT_RESOLUTION.bits()
            | Self::OUTPUT_PRE_RENDER.bits()
            | Self::OUTPUT_POST_RENDER.bits();
        const VIEW = Self::VIEW_CREATED.bits()
            | Self::VIEW_DESTROYED.bits()
            | Self::VIEW_FOCUS.bits()
            | Self::VIEW_MOVE_TO_OUTPUT.bits()
            | Self::VIEW_GEOMETRY_REQUEST.bits()
            | Self::VIEW_STATE_REQUEST.bits()
            | Self::VIEW_MOVE_REQUEST.bits()
            | Self::VIEW_RESIZE_REQUEST.bits()
            | Self::VIEW_PRE_RENDER.bits()
            | Self::VIEW_POST_RENDER.bits();
        const INPUT = Self::KEYBOARD_KEY.bits()
            | Self::POINTER_BUTTON.bits()
            | Self::POINTER_SCROLL.bits()
            | Self::POINTER_MOTION.bits()
            | Self::TOUCH.bits();
        const COMPOSITOR = Self::COMPOSITOR_READY.bits() | Self::COMPOSITOR_TERMINATE.bits();
        const DEVICE = Self::INPUT_CREATED.bits() | Self::INPUT_DESTROYED.bits();
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

// ============================================================================
// Handler Context
// ============================================================================

/// What a handler gets to see: the current state, read-only, and a way to
/// queue changes.
pub struct Context<'a> {
    state: &'a CompositorState,
    commands: &'a CommandQueue,
}

impl<'a> Context<'a> {
    pub(crate) fn new(state: &'a CompositorState, commands: &'a CommandQueue) -> Self {
        Self { state, commands }
    }

    pub fn state(&self) -> &'a CompositorState {
        self.state
    }

    /// Queue a command; it is applied after the handler returns.
    pub fn defer(&self, command: Command) {
        self.commands.push(command);
    }
}

// ============================================================================
// Interface
// ============================================================================

/// Handlers for every inbound event.
///
/// All methods have accept/no-op defaults so an implementation only spells
/// out what it cares about.
#[allow(unused_variables)]
pub trait Interface: Send {
    /// Handlers this implementation wants to receive.
    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    // ===== Outputs =====

    fn output_created(&mut self, ctx: &Context<'_>, output: Handle) -> Decision {
        Decision::Accept(())
    }

    fn output_destroyed(&mut self, ctx: &Context<'_>, output: Handle) {}

    fn output_focus(&mut self, ctx: &Context<'_>, output: Handle, focus: bool) {}

    fn output_resolution(&mut self, ctx: &Context<'_>, output: Handle, from: Size, to: Size) {}

    fn output_pre_render(&mut self, ctx: &Context<'_>, output: Handle) {}

    fn output_post_render(&mut self, ctx: &Context<'_>, output: Handle) {}

    // ===== Views =====

    fn view_created(&mut self, ctx: &Context<'_>, view: Handle) -> Decision {
        Decision::Accept(())
    }

    fn view_destroyed(&mut self, ctx: &Context<'_>, view: Handle) {}

    fn view_focus(&mut self, ctx: &Context<'_>, view: Handle, focus: bool) {}

    fn view_move_to_output(&mut self, ctx: &Context<'_>, view: Handle, from: Handle, to: Handle) {}

    /// May answer with an adjusted geometry.
    fn view_geometry_request(&mut self, ctx: &Context<'_>, view: Handle, geometry: Geometry) -> Decision<Geometry> {
        Decision::Accept(geometry)
    }

    fn view_state_request(&mut self, ctx: &Context<'_>, view: Handle, bit: ViewState, toggle: bool) -> Decision {
        Decision::Accept(())
    }

    fn view_move_request(&mut self, ctx: &Context<'_>, view: Handle, point: Point) -> Decision {
        Decision::Accept(())
    }

    fn view_resize_request(&mut self, ctx: &Context<'_>, view: Handle, edges: ResizeEdges, point: Point) -> Decision {
        Decision::Accept(())
    }

    fn view_pre_render(&mut self, ctx: &Context<'_>, view: Handle) {}

    fn view_post_render(&mut self, ctx: &Context<'_>, view: Handle) {}

    // ===== Input =====

    fn keyboard_key(
        &mut self,
        ctx: &Context<'_>,
        view: Handle,
        time: u32,
        modifiers: &Modifiers,
        key: u32,
        state: KeyState,
    ) -> Propagation {
        Propagation::Propagate
    }

    #[allow(clippy::too_many_arguments)]
    fn pointer_button(
        &mut self,
        ctx: &Context<'_>,
        view: Handle,
        time: u32,
        modifiers: &Modifiers,
        button: u32,
        state: ButtonState,
        point: Point,
    ) -> Propagation {
        Propagation::Propagate
    }

    fn pointer_scroll(
        &mut self,
        ctx: &Context<'_>,
        view: Handle,
        time: u32,
        modifiers: &Modifiers,
        axis: ScrollAxis,
        amount: [f64; 2],
    ) -> Propagation {
        Propagation::Propagate
    }

    fn pointer_motion(&mut self, ctx: &Context<'_>, view: Handle, time: u32, point: Point) -> Propagation {
        Propagation::Propagate
    }

    #[allow(clippy::too_many_arguments)]
    fn touch(
        &mut self,
        ctx: &Context<'_>,
        view: Handle,
        time: u32,
        modifiers: &Modifiers,
        kind: TouchType,
        slot: i32,
        point: Point,
    ) -> Propagation {
        Propagation::Propagate
    }

    /// Input that had no target view (nothing focused). Gated by the
    /// capability of the event itself.
    fn unrouted_input(&mut self, ctx: &Context<'_>, event: &InputEvent) {}

    // ===== Compositor =====

    fn compositor_ready(&mut self, ctx: &Context<'_>) {}

    fn compositor_terminate(&mut self, ctx: &Context<'_>) {}

    // ===== Devices =====

    fn input_device_created(&mut self, ctx: &Context<'_>, device: InputDevice) -> Decision {
        Decision::Accept(())
    }

    fn input_device_destroyed(&mut self, ctx: &Context<'_>, device: InputDevice) {}
}

/// Interface that keeps every default.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubInterface;

impl Interface for StubInterface {}

// ============================================================================
// Dispatch
// ============================================================================

/// The answer recorded when a handler panics.
pub(crate) trait Fallback {
    fn on_panic() -> Self;
}

impl Fallback for () {
    fn on_panic() -> Self {}
}

impl<T> Fallback for Decision<T> {
    fn on_panic() -> Self {
        Decision::Reject
    }
}

impl Fallback for Propagation {
    fn on_panic() -> Self {
        Propagation::Propagate
    }
}

/// Run a handler, turning a panic into its fallback answer.
pub(crate) fn guarded<R: Fallback>(capability: Capabilities, call: impl FnOnce() -> R) -> R {
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(answer) => answer,
        Err(_) => {
            tracing::error!("[{}] Handler {:?} panicked", CORE, capability);
            R::on_panic()
        }
    }
}

/// Borrowed interface plus the enabled capability set. Serves as the
/// arbiter's policy and the router's sink.
pub(crate) struct Dispatch<'a> {
    interface: &'a mut dyn Interface,
    capabilities: Capabilities,
    commands: &'a CommandQueue,
}

impl<'a> Dispatch<'a> {
    pub(crate) fn new(
        interface: &'a mut dyn Interface,
        capabilities: Capabilities,
        commands: &'a CommandQueue,
    ) -> Self {
        Self {
            interface,
            capabilities,
            commands,
        }
    }

    fn enabled(&self, capability: Capabilities) -> bool {
        self.capabilities.contains(capability)
    }
}

impl RequestPolicy for Dispatch<'_> {
    fn geometry(&mut self, state: &CompositorState, view: Handle, proposed: Geometry) -> Decision<Geometry> {
        if !self.enabled(Capabilities::VIEW_GEOMETRY_REQUEST) {
            return Decision::Accept(proposed);
        }
        let ctx = Context::new(state, self.commands);
        let interface = &mut *self.interface;
        guarded(Capabilities::VIEW_GEOMETRY_REQUEST, || {
            interface.view_geometry_request(&ctx, view, proposed)
        })
    }

    fn state(&mut self, state: &CompositorState, view: Handle, bit: ViewState, toggle: bool) -> Decision {
        if !self.enabled(Capabilities::VIEW_STATE_REQUEST) {
            return Decision::Accept(());
        }
        let ctx = Context::new(state, self.commands);
        let interface = &mut *self.interface;
        guarded(Capabilities::VIEW_STATE_REQUEST, || {
            interface.view_state_request(&ctx, view, bit, toggle)
        })
    }

    fn interactive_move(&mut self, state: &CompositorState, view: Handle, point: Point) -> Decision {
        if !self.enabled(Capabilities::VIEW_MOVE_REQUEST) {
            return Decision::Accept(());
        }
        let ctx = Context::new(state, self.commands);
        let interface = &mut *self.interface;
        guarded(Capabilities::VIEW_MOVE_REQUEST, || interface.view_move_request(&ctx, view, point))
    }

    fn interactive_resize(
        &mut self,
        state: &CompositorState,
        view: Handle,
        edges: ResizeEdges,
        point: Point,
    ) -> Decision {
        if !self.enabled(Capabilities::VIEW_RESIZE_REQUEST) {
            return Decision::Accept(());
        }
        let ctx = Context::new(state, self.commands);
        let interface = &mut *self.interface;
        guarded(Capabilities::VIEW_RESIZE_REQUEST, || {
            interface.view_resize_request(&ctx, view, edges, point)
        })
    }
}

impl InputSink for Dispatch<'_> {
    fn deliver(&mut self, state: &CompositorState, view: Handle, event: &InputEvent) -> Propagation {
        let capability = event.capability();
        if !self.enabled(capability) {
            return Propagation::Propagate;
        }
        let ctx = Context::new(state, self.commands);
        let interface = &mut *self.interface;
        guarded(capability, || match *event {
            InputEvent::Key {
                time,
                modifiers,
                key,
                state,
            } => interface.keyboard_key(&ctx, view, time, &modifiers, key, state),
            InputEvent::Button {
                time,
                modifiers,
                button,
                state,
                point,
            } => interface.pointer_button(&ctx, view, time, &modifiers, button, state, point),
            InputEvent::Scroll {
                time,
                modifiers,
                axis,
                amount,
            } => interface.pointer_scroll(&ctx, view, time, &modifiers, axis, amount),
            InputEvent::Motion { time, point } => interface.pointer_motion(&ctx, view, time, point),
            InputEvent::Touch {
                time,
                modifiers,
                kind,
                slot,
                point,
            } => interface.touch(&ctx, view, time, &modifiers, kind, slot, point),
        })
    }

    fn unrouted(&mut self, state: &CompositorState, event: &InputEvent) {
        let capability = event.capability();
        if self.enabled(capability) {
            let ctx = Context::new(state, self.commands);
            let interface = &mut *self.interface;
            guarded(capability, || interface.unrouted_input(&ctx, event));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_cover_every_handler() {
        let groups = Capabilities::OUTPUT
            | Capabilities::VIEW
            | Capabilities::INPUT
            | Capabilities::COMPOSITOR
            | Capabilities::DEVICE;
        assert_eq!(groups, Capabilities::all());
        assert_eq!(Capabilities::all().bits().count_ones(), 25);
        assert!((Capabilities::OUTPUT & Capabilities::VIEW).is_empty());
    }

    #[test]
    fn test_capabilities_parse_from_text() {
        let caps: Capabilities = bitflags::parser::from_str("KEYBOARD_KEY | POINTER_BUTTON").unwrap();
        assert_eq!(caps, Capabilities::KEYBOARD_KEY | Capabilities::POINTER_BUTTON);
    }

    #[test]
    fn test_stub_accepts_everything() {
        let state = CompositorState::new(crate::config::CompositorConfig::default());
        let commands = CommandQueue::new();
        let ctx = Context::new(&state, &commands);
        let mut stub = StubInterface;
        let view = Handle::from_raw(1);
        assert!(stub.view_created(&ctx, view).is_accepted());
        assert_eq!(
            stub.view_geometry_request(&ctx, view, Geometry::new(1, 2, 3, 4)),
            Decision::Accept(Geometry::new(1, 2, 3, 4))
        );
        assert_eq!(
            stub.keyboard_key(&ctx, view, 0, &Modifiers::NONE, 30, KeyState::Pressed),
            Propagation::Propagate
        );
        assert!(commands.is_empty());
    }

    struct Consumer;

    impl Interface for Consumer {
        fn capabilities(&self) -> Capabilities {
            Capabilities::POINTER_MOTION
        }

        fn keyboard_key(
            &mut self,
            _: &Context<'_>,
            _: Handle,
            _: u32,
            _: &Modifiers,
            _: u32,
            _: KeyState,
        ) -> Propagation {
            Propagation::Consumed
        }

        fn view_geometry_request(&mut self, _: &Context<'_>, _: Handle, _: Geometry) -> Decision<Geometry> {
            Decision::Reject
        }
    }

    #[test]
    fn test_disabled_handlers_fall_back_to_defaults() {
        let state = CompositorState::new(crate::config::CompositorConfig::default());
        let commands = CommandQueue::new();
        let mut consumer = Consumer;
        let caps = consumer.capabilities();
        let mut dispatch = Dispatch::new(&mut consumer, caps, &commands);
        let view = Handle::from_raw(1);
        let key = InputEvent::Key {
            time: 1,
            modifiers: Modifiers::NONE,
            key: 30,
            state: KeyState::Pressed,
        };
        assert_eq!(dispatch.deliver(&state, view, &key), Propagation::Propagate);
        assert!(dispatch
            .geometry(&state, view, Geometry::new(0, 0, 10, 10))
            .is_accepted());
    }

    struct Panicking;

    impl Interface for Panicking {
        fn view_geometry_request(&mut self, _: &Context<'_>, _: Handle, _: Geometry) -> Decision<Geometry> {
            panic!("geometry handler failed");
        }

        fn pointer_motion(&mut self, _: &Context<'_>, _: Handle, _: u32, _: Point) -> Propagation {
            panic!("motion handler failed");
        }
    }

    #[test]
    fn test_panicking_handlers_fall_back() {
        let state = CompositorState::new(crate::config::CompositorConfig::default());
        let commands = CommandQueue::new();
        let mut panicking = Panicking;
        let mut dispatch = Dispatch::new(&mut panicking, Capabilities::all(), &commands);
        let view = Handle::from_raw(1);
        assert_eq!(
            dispatch.geometry(&state, view, Geometry::new(0, 0, 10, 10)),
            Decision::Reject
        );
        let motion = InputEvent::Motion {
            time: 1,
            point: Point::new(5, 5),
        };
        assert_eq!(dispatch.deliver(&state, view, &motion), Propagation::Propagate);
    }
}

//! Central compositor state machine.
//!
//! The `Compositor` is what a backend talks to. Each inbound event maps to
//! one method here. A method takes the state lock, checks the lifecycle gate,
//! validates, mutates through the authoritative `CompositorState` paths,
//! notifies the embedder's [`Interface`] and finally applies any commands the
//! handlers deferred. Errors are returned to the backend; none of them leave
//! the state half-updated.
//!
//! All state access is serialized by one mutex. The only work done outside
//! it is the renderer call in [`Compositor::render_output`], so frames of
//! distinct outputs can be drawn concurrently.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::CompositorConfig;
use crate::core::errors::{CoreError, ObjectKind, Result};
use crate::core::handle::Handle;
use crate::core::input::{
    ButtonState, InputDevice, InputEvent, InputRouter, KeyState, Modifiers, Propagation, ScrollAxis,
    TouchType,
};
use crate::core::interface::{guarded, Capabilities, Context, Dispatch, Fallback, Interface};
use crate::core::lifecycle::LifecycleState;
use crate::core::render::{Frame, RenderPhase, Renderer};
use crate::core::request::{Decision, RequestArbiter};
use crate::core::runtime::{Command, CommandQueue};
use crate::core::state::CompositorState;
use crate::core::view::{FocusChange, GrabKind, ResizeEdges, ViewState, ViewType};
use crate::util::geometry::{Geometry, Point, Size};
use crate::util::logging::{CORE, FOCUS, LIFECYCLE, RENDER};
use crate::wlog;

// ============================================================================
// Compositor Events
// ============================================================================

/// Record of a state change, retrievable with [`Compositor::take_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum CompositorEvent {
    /// An output was created and accepted
    OutputCreated { output: Handle },
    /// An output was destroyed
    OutputDestroyed { output: Handle },
    OutputFocusChanged { output: Handle, focused: bool },
    OutputResolutionChanged { output: Handle, from: Size, to: Size },
    /// A view was created and accepted
    ViewCreated { view: Handle, output: Handle },
    /// A view was destroyed
    ViewDestroyed { view: Handle },
    ViewFocusChanged { view: Handle, focused: bool },
    ViewMovedToOutput { view: Handle, from: Handle, to: Handle },
    ViewGeometryChanged { view: Handle, from: Geometry, to: Geometry },
    ViewStateChanged { view: Handle, state: ViewState },
    /// Interactive move or resize started
    GrabStarted { view: Handle, kind: GrabKind },
    GrabEnded { view: Handle },
    /// An output wants a new frame
    RenderRequested { output: Handle },
    InputDeviceAttached { device: InputDevice },
    InputDeviceDetached { device: InputDevice },
    LifecycleChanged { from: LifecycleState, to: LifecycleState },
}

// ============================================================================
// Compositor
// ============================================================================

pub struct Compositor {
    inner: Mutex<Inner>,
}

struct Inner {
    state: CompositorState,
    interface: Box<dyn Interface>,
    /// Handlers enabled at construction
    capabilities: Capabilities,
    arbiter: RequestArbiter,
    router: InputRouter,
    commands: CommandQueue,
}

impl Compositor {
    /// Build a compositor around an embedder interface.
    ///
    /// The enabled handler set is fixed here: the interface's own
    /// capabilities intersected with `config.capabilities`.
    pub fn new(config: CompositorConfig, interface: Box<dyn Interface>) -> Self {
        let capabilities = interface.capabilities() & config.capabilities;
        let arbiter = RequestArbiter::new(config.min_view_size);
        wlog!(CORE, "Compositor created with capabilities {:?}", capabilities);
        Self {
            inner: Mutex::new(Inner {
                state: CompositorState::new(config),
                interface,
                capabilities,
                arbiter,
                router: InputRouter::new(),
                commands: CommandQueue::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capabilities(&self) -> Capabilities {
        self.lock().capabilities
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.lock().state.lifecycle()
    }

    /// Run `f` against the current state.
    pub fn with_state<R>(&self, f: impl FnOnce(&CompositorState) -> R) -> R {
        f(&self.lock().state)
    }

    /// Take all pending events (clears the internal queue)
    pub fn take_events(&self) -> Vec<CompositorEvent> {
        self.lock().state.take_events()
    }

    /// Apply a command from outside any handler, as the embedder's own call.
    pub fn execute(&self, command: Command) -> Result<()> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_operational()?;
        let result = inner.apply(command);
        inner.drain_commands();
        result
    }

    // =========================================================================
    // Outputs
    // =========================================================================

    /// A backend output appeared. Returns the new handle, or `Reject` if the
    /// embedder declined it (the handle is discarded).
    pub fn output_created(&self, name: &str, resolution: Size) -> Result<Decision<Handle>> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_accepting()?;

        let output = inner.state.insert_output(name, resolution);
        let decision = inner.notify(Capabilities::OUTPUT_CREATED, Decision::Accept(()), |i, ctx| {
            i.output_created(ctx, output)
        });
        let result = match decision {
            Decision::Accept(()) => {
                inner.state.push_event(CompositorEvent::OutputCreated { output });
                wlog!(CORE, "Output {} '{}' created ({})", output, name, resolution);
                Decision::Accept(output)
            }
            Decision::Reject => {
                inner.state.remove_output(output)?;
                tracing::debug!("Output '{}' rejected", name);
                Decision::Reject
            }
        };
        inner.drain_commands();
        Ok(result)
    }

    /// Destroy an output. With cascading enabled its views are destroyed
    /// first, topmost first, each with its own notification.
    pub fn output_destroyed(&self, output: Handle) -> Result<()> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_operational()?;
        let result = inner.destroy_output(output);
        inner.drain_commands();
        result
    }

    pub fn output_focus(&self, output: Handle, focus: bool) -> Result<()> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_operational()?;
        let result = inner.set_output_focus(output, focus);
        inner.drain_commands();
        result
    }

    pub fn output_resolution(&self, output: Handle, to: Size) -> Result<()> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_operational()?;
        if let Some(from) = inner.state.set_output_resolution(output, to)? {
            wlog!(CORE, "Output {} resolution {} -> {}", output, from, to);
            inner.notify(Capabilities::OUTPUT_RESOLUTION, (), |i, ctx| {
                i.output_resolution(ctx, output, from, to)
            });
        }
        inner.drain_commands();
        Ok(())
    }

    /// Open a frame on `output` (`Idle -> PreRender`). Returns the frame
    /// number.
    pub fn output_pre_render(&self, output: Handle) -> Result<u64> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_operational()?;
        let number = inner.state.begin_frame(output)?;
        inner.notify(Capabilities::OUTPUT_PRE_RENDER, (), |i, ctx| {
            i.output_pre_render(ctx, output)
        });
        inner.drain_commands();
        Ok(number)
    }

    /// Close the frame on `output` (`-> PostRender -> Idle`). Returns `true`
    /// if another frame was requested meanwhile.
    pub fn output_post_render(&self, output: Handle) -> Result<bool> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_operational()?;
        let again = inner.finish_frame(output)?;
        inner.drain_commands();
        Ok(again)
    }

    pub fn set_output_mask(&self, output: Handle, mask: u32) -> Result<()> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_operational()?;
        inner.state.set_output_mask(output, mask)
    }

    /// Put an output to sleep or wake it. Sleeping outputs draw empty frames.
    pub fn set_output_sleep(&self, output: Handle, sleeping: bool) -> Result<()> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_operational()?;
        inner.state.set_output_sleep(output, sleeping)?;
        if !sleeping {
            inner.state.schedule_render(output)?;
        }
        Ok(())
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// A client mapped a view on `output`. Returns the new handle, or
    /// `Reject` if the embedder declined it.
    pub fn view_created(&self, output: Handle, geometry: Geometry) -> Result<Decision<Handle>> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_accepting()?;

        let view = inner.state.insert_view(output, geometry)?;
        let decision = inner.notify(Capabilities::VIEW_CREATED, Decision::Accept(()), |i, ctx| {
            i.view_created(ctx, view)
        });
        let result = match decision {
            Decision::Accept(()) => {
                inner.state.push_event(CompositorEvent::ViewCreated { view, output });
                wlog!(CORE, "View {} created on output {} at {}", view, output, geometry);
                Decision::Accept(view)
            }
            Decision::Reject => {
                inner.state.remove_view(view)?;
                tracing::debug!("View on output {} rejected", output);
                Decision::Reject
            }
        };
        inner.drain_commands();
        Ok(result)
    }

    pub fn view_destroyed(&self, view: Handle) -> Result<()> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_operational()?;
        let refocus = inner.state.config().refocus_on_destroy;
        let result = inner.destroy_view(view, refocus);
        inner.drain_commands();
        result
    }

    pub fn view_focus(&self, view: Handle, focus: bool) -> Result<()> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_operational()?;
        let result = inner.set_view_focus(view, focus);
        inner.drain_commands();
        result
    }

    /// Move a view from `from` to `to`. `from` must be the view's current
    /// output.
    pub fn view_move_to_output(&self, view: Handle, from: Handle, to: Handle) -> Result<()> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_operational()?;
        let current = inner.state.view(view)?.output;
        inner.state.output(from)?;
        if current != from {
            return Err(CoreError::invalid_state(format!(
                "view {view} is on output {current}, not {from}"
            )));
        }
        let result = inner.move_view(view, to);
        inner.drain_commands();
        result
    }

    /// Ask for a new geometry. On `Accept` the returned geometry has been
    /// applied.
    pub fn view_geometry_request(&self, view: Handle, geometry: Geometry) -> Result<Decision<Geometry>> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_operational()?;
        let Inner {
            state,
            interface,
            capabilities,
            arbiter,
            commands,
            ..
        } = &mut *inner;
        let mut dispatch = Dispatch::new(interface.as_mut(), *capabilities, commands);
        let decision = arbiter.request_geometry(state, view, geometry, &mut dispatch)?;
        if let Decision::Accept(accepted) = decision {
            state.apply_geometry(view, accepted)?;
        }
        inner.drain_commands();
        Ok(decision)
    }

    pub fn view_state_request(&self, view: Handle, bit: ViewState, toggle: bool) -> Result<Decision> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_operational()?;
        let Inner {
            state,
            interface,
            capabilities,
            arbiter,
            commands,
            ..
        } = &mut *inner;
        let mut dispatch = Dispatch::new(interface.as_mut(), *capabilities, commands);
        let decision = arbiter.request_state(state, view, bit, toggle, &mut dispatch)?;
        if decision.is_accepted() {
            state.apply_state(view, bit, toggle)?;
        }
        inner.drain_commands();
        Ok(decision)
    }

    /// Ask to start an interactive move. On `Accept` the grab is active.
    pub fn view_move_request(&self, view: Handle, point: Point) -> Result<Decision> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_operational()?;
        let Inner {
            state,
            interface,
            capabilities,
            arbiter,
            commands,
            ..
        } = &mut *inner;
        let mut dispatch = Dispatch::new(interface.as_mut(), *capabilities, commands);
        let decision = arbiter.request_move(state, view, point, &mut dispatch)?;
        if decision.is_accepted() {
            state.begin_grab(view, GrabKind::Move, point)?;
        }
        inner.drain_commands();
        Ok(decision)
    }

    /// Ask to start an interactive resize. On `Accept` the grab is active
    /// with the returned (possibly inferred) edges.
    pub fn view_resize_request(
        &self,
        view: Handle,
        edges: ResizeEdges,
        point: Point,
    ) -> Result<Decision<ResizeEdges>> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_operational()?;
        let Inner {
            state,
            interface,
            capabilities,
            arbiter,
            commands,
            ..
        } = &mut *inner;
        let mut dispatch = Dispatch::new(interface.as_mut(), *capabilities, commands);
        let decision = arbiter.request_resize(state, view, edges, point, &mut dispatch)?;
        if let Decision::Accept(edges) = decision {
            state.begin_grab(view, GrabKind::Resize(edges), point)?;
        }
        inner.drain_commands();
        Ok(decision)
    }

    /// The backend is about to draw `view`. Its output must be in pre-render.
    pub fn view_pre_render(&self, view: Handle) -> Result<()> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_operational()?;
        let output = inner.state.view(view)?.output;
        let phase = inner.state.render_phase(output)?;
        if phase != RenderPhase::PreRender {
            return Err(CoreError::invalid_state(format!(
                "view {view} pre-render while output {output} is {phase:?}"
            )));
        }
        inner.notify(Capabilities::VIEW_PRE_RENDER, (), |i, ctx| i.view_pre_render(ctx, view));
        inner.drain_commands();
        Ok(())
    }

    /// The backend drew `view`. The output stays in pre-render until
    /// [`output_post_render`](Self::output_post_render), so per-view hooks
    /// may interleave.
    pub fn view_post_render(&self, view: Handle) -> Result<()> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_operational()?;
        let output = inner.state.view(view)?.output;
        let phase = inner.state.render_phase(output)?;
        if phase != RenderPhase::PreRender {
            return Err(CoreError::invalid_state(format!(
                "view {view} post-render while output {output} is {phase:?}"
            )));
        }
        inner.notify(Capabilities::VIEW_POST_RENDER, (), |i, ctx| i.view_post_render(ctx, view));
        inner.drain_commands();
        Ok(())
    }

    pub fn set_view_title(&self, view: Handle, title: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_operational()?;
        inner.state.set_view_title(view, title)
    }

    pub fn set_view_app_id(&self, view: Handle, app_id: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_operational()?;
        inner.state.set_view_app_id(view, app_id)
    }

    pub fn set_view_type(&self, view: Handle, view_type: ViewType) -> Result<()> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_operational()?;
        inner.state.set_view_type(view, view_type)
    }

    pub fn set_view_parent(&self, view: Handle, parent: Option<Handle>) -> Result<()> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_operational()?;
        inner.state.set_view_parent(view, parent)
    }

    // =========================================================================
    // Input
    // =========================================================================

    pub fn keyboard_key(
        &self,
        view: Option<Handle>,
        time: u32,
        modifiers: Modifiers,
        key: u32,
        state: KeyState,
    ) -> Result<Propagation> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_operational()?;
        let event = InputEvent::Key {
            time,
            modifiers,
            key,
            state,
        };
        let result = inner.route(view, &event);
        inner.drain_commands();
        result
    }

    /// Route a button event. Releasing the last held button ends any
    /// interactive grab.
    #[allow(clippy::too_many_arguments)]
    pub fn pointer_button(
        &self,
        view: Option<Handle>,
        time: u32,
        modifiers: Modifiers,
        button: u32,
        state: ButtonState,
        point: Point,
    ) -> Result<Propagation> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_operational()?;
        let event = InputEvent::Button {
            time,
            modifiers,
            button,
            state,
            point,
        };
        let result = inner.route(view, &event);
        if result.is_ok() {
            inner.state.set_pointer_position(point);
            if inner.state.update_button(state) {
                inner.state.end_grab()?;
            }
        }
        inner.drain_commands();
        result
    }

    pub fn pointer_scroll(
        &self,
        view: Option<Handle>,
        time: u32,
        modifiers: Modifiers,
        axis: ScrollAxis,
        amount: [f64; 2],
    ) -> Result<Propagation> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_operational()?;
        let event = InputEvent::Scroll {
            time,
            modifiers,
            axis,
            amount,
        };
        let result = inner.route(view, &event);
        inner.drain_commands();
        result
    }

    /// Route pointer motion. While a grab is active the grabbed view follows
    /// the pointer regardless of what the handler returns.
    pub fn pointer_motion(&self, view: Option<Handle>, time: u32, point: Point) -> Result<Propagation> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_operational()?;
        let event = InputEvent::Motion { time, point };
        let result = inner.route(view, &event);
        if result.is_ok() {
            inner.state.set_pointer_position(point);
            if let Some((grabbed, geometry)) = inner.state.grab_motion(point)? {
                inner.state.apply_geometry(grabbed, geometry)?;
            }
        }
        inner.drain_commands();
        result
    }

    #[allow(clippy::too_many_arguments)]
    pub fn touch_event(
        &self,
        view: Option<Handle>,
        time: u32,
        modifiers: Modifiers,
        kind: TouchType,
        slot: i32,
        point: Point,
    ) -> Result<Propagation> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_operational()?;
        let event = InputEvent::Touch {
            time,
            modifiers,
            kind,
            slot,
            point,
        };
        let result = inner.route(view, &event);
        inner.drain_commands();
        result
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// The backend finished initializing. Legal once, from `Starting`.
    pub fn compositor_ready(&self) -> Result<()> {
        let mut inner = self.lock();
        inner.state.transition(|l| l.ready())?;
        wlog!(LIFECYCLE, "Compositor ready");
        inner.notify(Capabilities::COMPOSITOR_READY, (), |i, ctx| i.compositor_ready(ctx));
        inner.drain_commands();
        Ok(())
    }

    /// Shutdown signal. Creation is refused from here on; destroys still
    /// work. Repeated calls are no-ops.
    pub fn compositor_terminate(&self) -> Result<()> {
        let mut inner = self.lock();
        if inner.terminate()? {
            inner.drain_commands();
        }
        Ok(())
    }

    /// Drain everything and enter `Stopped`. Only legal while terminating.
    ///
    /// Views and outputs are destroyed with their usual notifications and
    /// every device is detached.
    pub fn stop(&self) -> Result<()> {
        let mut inner = self.lock();
        let current = inner.state.lifecycle();
        if current != LifecycleState::Terminating {
            return Err(CoreError::invalid_state(format!("stop while {current}")));
        }

        let outputs: Vec<Handle> = inner.state.outputs().map(|o| o.handle).collect();
        for output in outputs {
            inner.destroy_output_cascading(output)?;
        }
        let devices: Vec<InputDevice> = inner.state.devices().collect();
        for device in devices {
            inner.detach_device(device)?;
        }
        inner.drain_commands();

        inner.state.transition(|l| l.stop())?;
        let dropped = inner.commands.clear();
        if dropped > 0 {
            tracing::warn!("Dropped {} command(s) deferred during stop", dropped);
        }
        wlog!(LIFECYCLE, "Compositor stopped");
        Ok(())
    }

    // =========================================================================
    // Devices
    // =========================================================================

    pub fn input_device_created(&self, device: InputDevice) -> Result<Decision> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_devices()?;
        if inner.state.has_device(device) {
            return Err(CoreError::invalid_state(format!("{device:?} is already attached")));
        }
        let decision = inner.notify(Capabilities::INPUT_CREATED, Decision::Accept(()), |i, ctx| {
            i.input_device_created(ctx, device)
        });
        if decision.is_accepted() {
            inner.state.attach_device(device)?;
            tracing::debug!("Attached {:?}", device);
        }
        inner.drain_commands();
        Ok(decision)
    }

    pub fn input_device_destroyed(&self, device: InputDevice) -> Result<()> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_devices()?;
        inner.detach_device(device)?;
        inner.drain_commands();
        Ok(())
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Request a frame for `output`. Returns `false` if one was already
    /// pending.
    pub fn schedule_render(&self, output: Handle) -> Result<bool> {
        let mut inner = self.lock();
        inner.state.lifecycle_gate().ensure_operational()?;
        inner.state.schedule_render(output)
    }

    /// Drive one full frame of `output` through `renderer`.
    ///
    /// Pre-render hooks run under the lock, the renderer runs without it,
    /// post-render hooks run under the lock again. Returns the frame number.
    ///
    /// If the renderer panics the frame is closed before the panic resumes,
    /// so the output can render again.
    pub fn render_output(&self, output: Handle, renderer: &mut dyn Renderer) -> Result<u64> {
        let frame = {
            let mut inner = self.lock();
            inner.state.lifecycle_gate().ensure_operational()?;
            let number = inner.state.begin_frame(output)?;
            inner.notify(Capabilities::OUTPUT_PRE_RENDER, (), |i, ctx| {
                i.output_pre_render(ctx, output)
            });
            inner.drain_commands();
            let frame = Frame::build(&inner.state, output, number)?;
            for view in frame.views() {
                inner.notify(Capabilities::VIEW_PRE_RENDER, (), |i, ctx| i.view_pre_render(ctx, view));
            }
            inner.drain_commands();
            frame
        };

        let drawn = panic::catch_unwind(AssertUnwindSafe(|| renderer.render(&frame)));

        let mut inner = self.lock();
        if let Err(payload) = drawn {
            tracing::error!("[{}] Renderer panicked on output {} frame {}", RENDER, output, frame.number);
            // The output may have been destroyed meanwhile.
            if inner.state.render_phase(output).is_ok() {
                if let Err(err) = inner.finish_frame(output) {
                    tracing::warn!("[{}] Could not close frame on output {}: {}", RENDER, output, err);
                }
            }
            inner.drain_commands();
            drop(inner);
            panic::resume_unwind(payload);
        }
        for view in frame.views() {
            if inner.state.view(view).is_ok() {
                inner.notify(Capabilities::VIEW_POST_RENDER, (), |i, ctx| i.view_post_render(ctx, view));
            }
        }
        inner.finish_frame(output)?;
        inner.drain_commands();
        Ok(frame.number)
    }
}

impl std::fmt::Debug for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Compositor")
            .field("state", &inner.state)
            .field("capabilities", &inner.capabilities)
            .finish()
    }
}

// ============================================================================
// Authoritative operations
// ============================================================================

impl Inner {
    /// Call a handler if its capability is enabled, else return `default`.
    /// A panicking handler yields its fallback answer.
    fn notify<R: Fallback>(
        &mut self,
        capability: Capabilities,
        default: R,
        call: impl FnOnce(&mut dyn Interface, &Context<'_>) -> R,
    ) -> R {
        if !self.capabilities.contains(capability) {
            return default;
        }
        let ctx = Context::new(&self.state, &self.commands);
        let interface = self.interface.as_mut();
        guarded(capability, || call(interface, &ctx))
    }

    fn route(&mut self, target: Option<Handle>, event: &InputEvent) -> Result<Propagation> {
        let mut dispatch = Dispatch::new(self.interface.as_mut(), self.capabilities, &self.commands);
        self.router.route(&self.state, target, event, &mut dispatch)
    }

    fn notify_output_focus(&mut self, change: Option<FocusChange>) {
        let Some(change) = change else { return };
        if let Some(lost) = change.lost {
            self.notify(Capabilities::OUTPUT_FOCUS, (), |i, ctx| i.output_focus(ctx, lost, false));
        }
        if let Some(gained) = change.gained {
            self.notify(Capabilities::OUTPUT_FOCUS, (), |i, ctx| i.output_focus(ctx, gained, true));
        }
    }

    fn notify_view_focus(&mut self, change: Option<FocusChange>) {
        let Some(change) = change else { return };
        tracing::debug!("[{}] View focus {:?} -> {:?}", FOCUS, change.lost, change.gained);
        if let Some(lost) = change.lost {
            self.notify(Capabilities::VIEW_FOCUS, (), |i, ctx| i.view_focus(ctx, lost, false));
        }
        if let Some(gained) = change.gained {
            self.notify(Capabilities::VIEW_FOCUS, (), |i, ctx| i.view_focus(ctx, gained, true));
        }
    }

    fn set_output_focus(&mut self, output: Handle, focus: bool) -> Result<()> {
        let change = if focus {
            self.state.focus_output(output)?
        } else {
            self.state.unfocus_output(output)?
        };
        self.notify_output_focus(change);
        Ok(())
    }

    fn set_view_focus(&mut self, view: Handle, focus: bool) -> Result<()> {
        let change = if focus {
            self.state.focus_view(view)?
        } else {
            self.state.unfocus_view(view)?
        };
        self.notify_view_focus(change);
        Ok(())
    }

    fn move_view(&mut self, view: Handle, to: Handle) -> Result<()> {
        if let Some(from) = self.state.move_view_to_output(view, to)? {
            self.notify(Capabilities::VIEW_MOVE_TO_OUTPUT, (), |i, ctx| {
                i.view_move_to_output(ctx, view, from, to)
            });
        }
        Ok(())
    }

    /// Unfocus, notify, remove. Handlers still see the view while notified.
    fn destroy_view(&mut self, view: Handle, refocus: bool) -> Result<()> {
        let was_focused = self.state.view(view)?.focused;
        let change = self.state.unfocus_view(view)?;
        self.notify_view_focus(change);
        self.notify(Capabilities::VIEW_DESTROYED, (), |i, ctx| i.view_destroyed(ctx, view));
        self.state.remove_view(view)?;
        self.state.push_event(CompositorEvent::ViewDestroyed { view });
        wlog!(CORE, "View {} destroyed", view);

        if refocus && was_focused {
            if let Some(previous) = self.state.previous_view() {
                self.set_view_focus(previous, true)?;
            }
        }
        Ok(())
    }

    fn destroy_output(&mut self, output: Handle) -> Result<()> {
        let views = self.state.views_on(output)?.len();
        if views > 0 && !self.state.config().cascade_destroy {
            return Err(CoreError::DanglingReference { output, views });
        }
        self.destroy_output_cascading(output)
    }

    fn destroy_output_cascading(&mut self, output: Handle) -> Result<()> {
        let views: Vec<Handle> = self.state.views_on(output)?.iter().rev().copied().collect();
        for view in views {
            self.destroy_view(view, false)?;
        }
        let change = self.state.unfocus_output(output)?;
        self.notify_output_focus(change);
        self.notify(Capabilities::OUTPUT_DESTROYED, (), |i, ctx| i.output_destroyed(ctx, output));
        self.state.remove_output(output)?;
        self.state.push_event(CompositorEvent::OutputDestroyed { output });
        wlog!(CORE, "Output {} destroyed", output);
        Ok(())
    }

    /// Move the frame to post-render, notify, then return to idle.
    fn finish_frame(&mut self, output: Handle) -> Result<bool> {
        if self.state.render_phase(output)? == RenderPhase::Idle {
            return Err(CoreError::invalid_state(format!(
                "output {output} has no frame in flight"
            )));
        }
        self.state.mark_drawn(output)?;
        self.notify(Capabilities::OUTPUT_POST_RENDER, (), |i, ctx| {
            i.output_post_render(ctx, output)
        });
        self.state.end_frame(output)
    }

    fn detach_device(&mut self, device: InputDevice) -> Result<()> {
        if !self.state.has_device(device) {
            return Err(CoreError::NotFound {
                kind: ObjectKind::InputDevice,
                id: device.0,
            });
        }
        self.notify(Capabilities::INPUT_DESTROYED, (), |i, ctx| {
            i.input_device_destroyed(ctx, device)
        });
        self.state.detach_device(device)?;
        tracing::debug!("Detached {:?}", device);
        Ok(())
    }

    /// Returns `true` on the first call.
    fn terminate(&mut self) -> Result<bool> {
        if !self.state.transition(|l| l.terminate())? {
            return Ok(false);
        }
        wlog!(LIFECYCLE, "Compositor terminating");
        self.state.end_grab()?;
        self.notify(Capabilities::COMPOSITOR_TERMINATE, (), |i, ctx| {
            i.compositor_terminate(ctx)
        });
        Ok(true)
    }

    fn apply(&mut self, command: Command) -> Result<()> {
        tracing::trace!("Applying {:?}", command);
        match command {
            Command::FocusOutput(Some(output)) => self.set_output_focus(output, true),
            Command::FocusOutput(None) => {
                let change = self.state.clear_output_focus();
                self.notify_output_focus(change);
                Ok(())
            }
            Command::FocusView(Some(view)) => self.set_view_focus(view, true),
            Command::FocusView(None) => {
                let change = self.state.clear_view_focus();
                self.notify_view_focus(change);
                Ok(())
            }
            Command::SetGeometry { view, geometry } => self.state.apply_geometry(view, geometry).map(drop),
            Command::SetState { view, state, toggle } => self.state.apply_state(view, state, toggle).map(drop),
            Command::SetOutput { view, output } => self.move_view(view, output),
            Command::SetMask { view, mask } => self.state.set_view_mask(view, mask),
            Command::BringToFront(view) => self.state.bring_to_front(view),
            Command::SendToBack(view) => self.state.send_to_back(view),
            Command::BringAbove { view, other } => self.state.bring_above(view, other),
            Command::SendBelow { view, other } => self.state.send_below(view, other),
            Command::SetViews { output, views } => self.state.set_output_views(output, &views),
            Command::CloseView(view) => {
                let refocus = self.state.config().refocus_on_destroy;
                self.destroy_view(view, refocus)
            }
            Command::BeginGrab { view, kind, point } => self.state.begin_grab(view, kind, point),
            Command::ScheduleRender(output) => self.state.schedule_render(output).map(drop),
            Command::Terminate => self.terminate().map(drop),
        }
    }

    /// Apply deferred commands in FIFO order. Commands deferred while
    /// applying form the next round; rounds are bounded.
    fn drain_commands(&mut self) {
        let max_rounds = self.state.config().max_command_rounds;
        for _ in 0..max_rounds {
            let batch = self.commands.take_all();
            if batch.is_empty() {
                return;
            }
            for command in batch {
                match self.apply(command.clone()) {
                    Ok(()) => {}
                    // The target went away before the command ran.
                    Err(err @ CoreError::NotFound { .. }) => {
                        tracing::debug!("Skipping deferred {:?}: {}", command, err);
                    }
                    Err(err) => tracing::warn!("Deferred command {:?} failed: {}", command, err),
                }
            }
        }
        let dropped = self.commands.clear();
        if dropped > 0 {
            tracing::warn!(
                "Dropped {} deferred command(s) after {} rounds",
                dropped,
                max_rounds
            );
        }
    }
}

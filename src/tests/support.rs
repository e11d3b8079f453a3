//! Recording interface shared by the scenario tests.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::CompositorConfig;
use crate::core::compositor::Compositor;
use crate::core::handle::Handle;
use crate::core::input::{
    ButtonState, InputDevice, InputEvent, KeyState, Modifiers, Propagation, ScrollAxis, TouchType,
};
use crate::core::interface::{Capabilities, Context, Interface};
use crate::core::request::Decision;
use crate::core::runtime::Command;
use crate::core::view::{ResizeEdges, ViewState};
use crate::util::geometry::{Geometry, Point, Size};

/// One handler invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    OutputCreated(Handle),
    OutputDestroyed(Handle),
    OutputFocus(Handle, bool),
    OutputResolution(Handle, Size, Size),
    OutputPreRender(Handle),
    OutputPostRender(Handle),
    ViewCreated(Handle),
    ViewDestroyed(Handle),
    ViewFocus(Handle, bool),
    ViewMoveToOutput(Handle, Handle, Handle),
    ViewGeometryRequest(Handle, Geometry),
    ViewStateRequest(Handle, ViewState, bool),
    ViewMoveRequest(Handle, Point),
    ViewResizeRequest(Handle, ResizeEdges, Point),
    ViewPreRender(Handle),
    ViewPostRender(Handle),
    Key {
        view: Handle,
        time: u32,
        modifiers: Modifiers,
        key: u32,
        state: KeyState,
    },
    Button(Handle, u32, ButtonState),
    Scroll(Handle, ScrollAxis, [f64; 2]),
    Motion(Handle, Point),
    Touch(Handle, TouchType, i32),
    Unrouted(InputEvent),
    Ready,
    Terminate,
    DeviceCreated(InputDevice),
    DeviceDestroyed(InputDevice),
}

/// What the recording interface answers.
#[derive(Debug, Clone)]
pub struct Behaviour {
    pub capabilities: Capabilities,
    pub accept_outputs: bool,
    pub accept_views: bool,
    pub accept_devices: bool,
    /// `None` accepts the proposal unchanged
    pub geometry: Option<Decision<Geometry>>,
    pub accept_requests: bool,
    pub input: Propagation,
    /// Defer focus of every accepted view
    pub focus_new_views: bool,
}

impl Default for Behaviour {
    fn default() -> Self {
        Self {
            capabilities: Capabilities::all(),
            accept_outputs: true,
            accept_views: true,
            accept_devices: true,
            geometry: None,
            accept_requests: true,
            input: Propagation::Propagate,
            focus_new_views: false,
        }
    }
}

#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
    behaviour: Arc<Mutex<Behaviour>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl Recorder {
    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    /// Return and forget everything recorded so far.
    pub fn take(&self) -> Vec<Call> {
        std::mem::take(&mut *lock(&self.calls))
    }

    pub fn set(&self, f: impl FnOnce(&mut Behaviour)) {
        f(&mut lock(&self.behaviour));
    }

    fn record(&self, call: Call) {
        lock(&self.calls).push(call);
    }

    fn behaviour(&self) -> Behaviour {
        lock(&self.behaviour).clone()
    }
}

pub struct RecordingInterface {
    recorder: Recorder,
}

impl RecordingInterface {
    pub fn new(behaviour: Behaviour) -> (Self, Recorder) {
        let recorder = Recorder::default();
        recorder.set(|b| *b = behaviour);
        (
            Self {
                recorder: recorder.clone(),
            },
            recorder,
        )
    }
}

impl Interface for RecordingInterface {
    fn capabilities(&self) -> Capabilities {
        self.recorder.behaviour().capabilities
    }

    fn output_created(&mut self, _ctx: &Context<'_>, output: Handle) -> Decision {
        self.recorder.record(Call::OutputCreated(output));
        self.recorder.behaviour().accept_outputs.into()
    }

    fn output_destroyed(&mut self, _ctx: &Context<'_>, output: Handle) {
        self.recorder.record(Call::OutputDestroyed(output));
    }

    fn output_focus(&mut self, _ctx: &Context<'_>, output: Handle, focus: bool) {
        self.recorder.record(Call::OutputFocus(output, focus));
    }

    fn output_resolution(&mut self, _ctx: &Context<'_>, output: Handle, from: Size, to: Size) {
        self.recorder.record(Call::OutputResolution(output, from, to));
    }

    fn output_pre_render(&mut self, _ctx: &Context<'_>, output: Handle) {
        self.recorder.record(Call::OutputPreRender(output));
    }

    fn output_post_render(&mut self, _ctx: &Context<'_>, output: Handle) {
        self.recorder.record(Call::OutputPostRender(output));
    }

    fn view_created(&mut self, ctx: &Context<'_>, view: Handle) -> Decision {
        self.recorder.record(Call::ViewCreated(view));
        let behaviour = self.recorder.behaviour();
        if behaviour.accept_views && behaviour.focus_new_views {
            ctx.defer(Command::FocusView(Some(view)));
        }
        behaviour.accept_views.into()
    }

    fn view_destroyed(&mut self, _ctx: &Context<'_>, view: Handle) {
        self.recorder.record(Call::ViewDestroyed(view));
    }

    fn view_focus(&mut self, _ctx: &Context<'_>, view: Handle, focus: bool) {
        self.recorder.record(Call::ViewFocus(view, focus));
    }

    fn view_move_to_output(&mut self, _ctx: &Context<'_>, view: Handle, from: Handle, to: Handle) {
        self.recorder.record(Call::ViewMoveToOutput(view, from, to));
    }

    fn view_geometry_request(&mut self, _ctx: &Context<'_>, view: Handle, geometry: Geometry) -> Decision<Geometry> {
        self.recorder.record(Call::ViewGeometryRequest(view, geometry));
        self.recorder
            .behaviour()
            .geometry
            .unwrap_or(Decision::Accept(geometry))
    }

    fn view_state_request(&mut self, _ctx: &Context<'_>, view: Handle, bit: ViewState, toggle: bool) -> Decision {
        self.recorder.record(Call::ViewStateRequest(view, bit, toggle));
        self.recorder.behaviour().accept_requests.into()
    }

    fn view_move_request(&mut self, _ctx: &Context<'_>, view: Handle, point: Point) -> Decision {
        self.recorder.record(Call::ViewMoveRequest(view, point));
        self.recorder.behaviour().accept_requests.into()
    }

    fn view_resize_request(&mut self, _ctx: &Context<'_>, view: Handle, edges: ResizeEdges, point: Point) -> Decision {
        self.recorder.record(Call::ViewResizeRequest(view, edges, point));
        self.recorder.behaviour().accept_requests.into()
    }

    fn view_pre_render(&mut self, _ctx: &Context<'_>, view: Handle) {
        self.recorder.record(Call::ViewPreRender(view));
    }

    fn view_post_render(&mut self, _ctx: &Context<'_>, view: Handle) {
        self.recorder.record(Call::ViewPostRender(view));
    }

    fn keyboard_key(
        &mut self,
        _ctx: &Context<'_>,
        view: Handle,
        time: u32,
        modifiers: &Modifiers,
        key: u32,
        state: KeyState,
    ) -> Propagation {
        self.recorder.record(Call::Key {
            view,
            time,
            modifiers: *modifiers,
            key,
            state,
        });
        self.recorder.behaviour().input
    }

    fn pointer_button(
        &mut self,
        _ctx: &Context<'_>,
        view: Handle,
        _time: u32,
        _modifiers: &Modifiers,
        button: u32,
        state: ButtonState,
        _point: Point,
    ) -> Propagation {
        self.recorder.record(Call::Button(view, button, state));
        self.recorder.behaviour().input
    }

    fn pointer_scroll(
        &mut self,
        _ctx: &Context<'_>,
        view: Handle,
        _time: u32,
        _modifiers: &Modifiers,
        axis: ScrollAxis,
        amount: [f64; 2],
    ) -> Propagation {
        self.recorder.record(Call::Scroll(view, axis, amount));
        self.recorder.behaviour().input
    }

    fn pointer_motion(&mut self, _ctx: &Context<'_>, view: Handle, _time: u32, point: Point) -> Propagation {
        self.recorder.record(Call::Motion(view, point));
        self.recorder.behaviour().input
    }

    fn touch(
        &mut self,
        _ctx: &Context<'_>,
        view: Handle,
        _time: u32,
        _modifiers: &Modifiers,
        kind: TouchType,
        slot: i32,
        _point: Point,
    ) -> Propagation {
        self.recorder.record(Call::Touch(view, kind, slot));
        self.recorder.behaviour().input
    }

    fn unrouted_input(&mut self, _ctx: &Context<'_>, event: &InputEvent) {
        self.recorder.record(Call::Unrouted(*event));
    }

    fn compositor_ready(&mut self, _ctx: &Context<'_>) {
        self.recorder.record(Call::Ready);
    }

    fn compositor_terminate(&mut self, _ctx: &Context<'_>) {
        self.recorder.record(Call::Terminate);
    }

    fn input_device_created(&mut self, _ctx: &Context<'_>, device: InputDevice) -> Decision {
        self.recorder.record(Call::DeviceCreated(device));
        self.recorder.behaviour().accept_devices.into()
    }

    fn input_device_destroyed(&mut self, _ctx: &Context<'_>, device: InputDevice) {
        self.recorder.record(Call::DeviceDestroyed(device));
    }
}

/// A compositor that is not ready yet.
pub fn starting(config: CompositorConfig, behaviour: Behaviour) -> (Compositor, Recorder) {
    let (interface, recorder) = RecordingInterface::new(behaviour);
    (Compositor::new(config, Box::new(interface)), recorder)
}

/// A ready compositor with the recorder cleared.
pub fn ready(config: CompositorConfig, behaviour: Behaviour) -> (Compositor, Recorder) {
    let (compositor, recorder) = starting(config, behaviour);
    compositor.compositor_ready().unwrap();
    recorder.take();
    compositor.take_events();
    (compositor, recorder)
}

pub fn ready_default() -> (Compositor, Recorder) {
    ready(CompositorConfig::default(), Behaviour::default())
}

pub fn new_output(compositor: &Compositor) -> Handle {
    compositor
        .output_created("test", Size::new(1000, 800))
        .unwrap()
        .accepted()
        .unwrap()
}

pub fn new_view(compositor: &Compositor, output: Handle, geometry: Geometry) -> Handle {
    compositor
        .view_created(output, geometry)
        .unwrap()
        .accepted()
        .unwrap()
}

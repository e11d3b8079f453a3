//! Global compositor state.
//!
//! `CompositorState` holds every record the core knows about: the handle
//! table, focus, render phases, per-output stacking, attached devices, the
//! lifecycle and the pointer. Handlers only ever see it read-only. All
//! mutators are crate-private and are driven by the
//! [`Compositor`](crate::core::compositor::Compositor) after it has
//! validated the operation, so a failed operation leaves the state as it was.
//!
//! Every change is also recorded as a [`CompositorEvent`] for
//! [`take_events`](CompositorState::take_events).

use std::collections::HashMap;

use crate::config::CompositorConfig;
use crate::core::compositor::CompositorEvent;
use crate::core::errors::{CoreError, ObjectKind, Result};
use crate::core::handle::{Handle, HandleTable, Object};
use crate::core::input::{ButtonState, InputDevice, InputDevices, PointerState};
use crate::core::lifecycle::{CompositorLifecycle, LifecycleState};
use crate::core::output::Output;
use crate::core::render::{RenderPhase, RenderScheduler};
use crate::core::view::{FocusChange, FocusTracker, InteractiveGrab, View, ViewStack};
use crate::util::geometry::Point;

// Sub-modules containing extracted CompositorState impl blocks
mod outputs;
mod views;

pub struct CompositorState {
    config: CompositorConfig,
    objects: HandleTable,
    focus: FocusTracker,
    scheduler: RenderScheduler,
    /// Stacking order per output, back to front
    stacks: HashMap<Handle, ViewStack>,
    devices: InputDevices,
    lifecycle: CompositorLifecycle,
    pointer: PointerState,
    grab: Option<InteractiveGrab>,
    events: Vec<CompositorEvent>,
}

impl CompositorState {
    pub fn new(config: CompositorConfig) -> Self {
        Self {
            config,
            objects: HandleTable::new(),
            focus: FocusTracker::new(),
            scheduler: RenderScheduler::new(),
            stacks: HashMap::new(),
            devices: InputDevices::new(),
            lifecycle: CompositorLifecycle::new(),
            pointer: PointerState::new(),
            grab: None,
            events: Vec::new(),
        }
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    pub fn get(&self, handle: Handle) -> Result<&Object> {
        self.objects.get(handle)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.objects.contains(handle)
    }

    pub fn output(&self, handle: Handle) -> Result<&Output> {
        self.objects.output(handle)
    }

    pub fn view(&self, handle: Handle) -> Result<&View> {
        self.objects.view(handle)
    }

    /// Live outputs in handle-table order.
    pub fn outputs(&self) -> impl Iterator<Item = &Output> + '_ {
        self.objects.outputs()
    }

    pub fn views(&self) -> impl Iterator<Item = &View> + '_ {
        self.objects.views()
    }

    /// Number of live outputs and views.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn focused_output(&self) -> Option<Handle> {
        self.focus.focused_output()
    }

    pub fn focused_view(&self) -> Option<Handle> {
        self.focus.focused_view()
    }

    /// The most recently focused view that no longer has focus.
    pub fn previous_view(&self) -> Option<Handle> {
        self.focus
            .previous_view()
            .filter(|&view| self.objects.view(view).is_ok())
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn render_phase(&self, output: Handle) -> Result<RenderPhase> {
        self.scheduler.phase(output)
    }

    pub fn frame_count(&self, output: Handle) -> Result<u64> {
        self.scheduler.frame_count(output)
    }

    pub fn is_render_scheduled(&self, output: Handle) -> bool {
        self.scheduler.is_scheduled(output)
    }

    /// Outputs waiting for a frame, in handle order.
    pub fn scheduled_outputs(&self) -> Vec<Handle> {
        self.scheduler.scheduled()
    }

    pub fn devices(&self) -> impl Iterator<Item = InputDevice> + '_ {
        self.devices.iter()
    }

    pub fn has_device(&self, device: InputDevice) -> bool {
        self.devices.contains(device)
    }

    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    pub fn grab(&self) -> Option<&InteractiveGrab> {
        self.grab.as_ref()
    }

    /// Events recorded since the last call, oldest first.
    pub fn take_events(&mut self) -> Vec<CompositorEvent> {
        std::mem::take(&mut self.events)
    }

    // =========================================================================
    // Lifecycle, devices, pointer
    // =========================================================================

    /// Run a lifecycle transition, recording it if the state moved.
    pub(crate) fn transition<T>(
        &mut self,
        step: impl FnOnce(&mut CompositorLifecycle) -> Result<T>,
    ) -> Result<T> {
        let from = self.lifecycle.state();
        let result = step(&mut self.lifecycle)?;
        let to = self.lifecycle.state();
        if from != to {
            self.events.push(CompositorEvent::LifecycleChanged { from, to });
        }
        Ok(result)
    }

    pub(crate) fn lifecycle_gate(&self) -> &CompositorLifecycle {
        &self.lifecycle
    }

    pub(crate) fn attach_device(&mut self, device: InputDevice) -> Result<()> {
        self.devices.attach(device)?;
        self.events.push(CompositorEvent::InputDeviceAttached { device });
        Ok(())
    }

    pub(crate) fn detach_device(&mut self, device: InputDevice) -> Result<()> {
        self.devices.detach(device)?;
        self.events.push(CompositorEvent::InputDeviceDetached { device });
        Ok(())
    }

    pub(crate) fn set_pointer_position(&mut self, point: Point) {
        self.pointer.position = point;
    }

    /// Track a button transition. Returns `true` when the last held
    /// button was released.
    pub(crate) fn update_button(&mut self, state: ButtonState) -> bool {
        let held = self.pointer.has_implicit_grab();
        self.pointer.update_button(state);
        held && !self.pointer.has_implicit_grab()
    }

    pub(crate) fn push_event(&mut self, event: CompositorEvent) {
        self.events.push(event);
    }

    // =========================================================================
    // Focus
    // =========================================================================

    pub(crate) fn focus_output(&mut self, output: Handle) -> Result<Option<FocusChange>> {
        self.objects.output(output)?;
        let change = self.focus.focus_output(output);
        self.sync_output_focus(change);
        Ok(change)
    }

    pub(crate) fn unfocus_output(&mut self, output: Handle) -> Result<Option<FocusChange>> {
        self.objects.output(output)?;
        let change = self.focus.unfocus_output(output);
        self.sync_output_focus(change);
        Ok(change)
    }

    pub(crate) fn clear_output_focus(&mut self) -> Option<FocusChange> {
        let change = self
            .focus
            .focused_output()
            .and_then(|output| self.focus.unfocus_output(output));
        self.sync_output_focus(change);
        change
    }

    pub(crate) fn focus_view(&mut self, view: Handle) -> Result<Option<FocusChange>> {
        self.objects.view(view)?;
        let change = self.focus.focus_view(view);
        self.sync_view_focus(change);
        Ok(change)
    }

    pub(crate) fn unfocus_view(&mut self, view: Handle) -> Result<Option<FocusChange>> {
        self.objects.view(view)?;
        let change = self.focus.unfocus_view(view);
        self.sync_view_focus(change);
        Ok(change)
    }

    pub(crate) fn clear_view_focus(&mut self) -> Option<FocusChange> {
        let change = self
            .focus
            .focused_view()
            .and_then(|view| self.focus.unfocus_view(view));
        self.sync_view_focus(change);
        change
    }

    fn sync_output_focus(&mut self, change: Option<FocusChange>) {
        let Some(change) = change else { return };
        if let Some(lost) = change.lost {
            if let Ok(output) = self.objects.output_mut(lost) {
                output.focused = false;
            }
            self.events.push(CompositorEvent::OutputFocusChanged {
                output: lost,
                focused: false,
            });
        }
        if let Some(gained) = change.gained {
            if let Ok(output) = self.objects.output_mut(gained) {
                output.focused = true;
            }
            self.events.push(CompositorEvent::OutputFocusChanged {
                output: gained,
                focused: true,
            });
        }
    }

    fn sync_view_focus(&mut self, change: Option<FocusChange>) {
        let Some(change) = change else { return };
        if let Some(lost) = change.lost {
            if let Ok(view) = self.objects.view_mut(lost) {
                view.focused = false;
            }
            self.events.push(CompositorEvent::ViewFocusChanged {
                view: lost,
                focused: false,
            });
        }
        if let Some(gained) = change.gained {
            if let Ok(view) = self.objects.view_mut(gained) {
                view.focused = true;
            }
            self.events.push(CompositorEvent::ViewFocusChanged {
                view: gained,
                focused: true,
            });
        }
    }

    fn stack(&self, output: Handle) -> Result<&ViewStack> {
        self.stacks
            .get(&output)
            .ok_or_else(|| CoreError::not_found(ObjectKind::Output, output))
    }

    fn stack_mut(&mut self, output: Handle) -> Result<&mut ViewStack> {
        self.stacks
            .get_mut(&output)
            .ok_or_else(|| CoreError::not_found(ObjectKind::Output, output))
    }
}

impl std::fmt::Debug for CompositorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositorState")
            .field("lifecycle", &self.lifecycle.state())
            .field("objects", &self.objects.len())
            .field("focused_output", &self.focus.focused_output())
            .field("focused_view", &self.focus.focused_view())
            .field("devices", &self.devices.len())
            .field("grab", &self.grab)
            .finish()
    }
}

//! View records, stacking and interactive grabs.

use super::*;
use crate::core::view::{GrabKind, ViewState, ViewType};
use crate::util::geometry::Geometry;

impl CompositorState {
    /// Allocate a view on `output`, on top of its stack. The view inherits
    /// the output's visibility mask.
    pub(crate) fn insert_view(&mut self, output: Handle, geometry: Geometry) -> Result<Handle> {
        let mask = self.objects.output(output)?.mask;
        let handle = self
            .objects
            .create(|h| Object::View(View::new(h, output, geometry, mask)));
        self.stack_mut(output)?.insert(handle);
        Ok(handle)
    }

    /// Remove a view, evicting it from focus, any grab and its stack.
    /// Children of the view are orphaned.
    pub(crate) fn remove_view(&mut self, view: Handle) -> Result<View> {
        let output = self.objects.view(view)?.output;
        if self.focus.evict(view).is_some() {
            self.events.push(CompositorEvent::ViewFocusChanged {
                view,
                focused: false,
            });
        }
        if self.grab.is_some_and(|g| g.view == view) {
            self.grab = None;
            self.events.push(CompositorEvent::GrabEnded { view });
        }
        if let Ok(stack) = self.stack_mut(output) {
            stack.remove(view);
        }
        let children: Vec<Handle> = self
            .objects
            .views()
            .filter(|v| v.parent == Some(view))
            .map(|v| v.handle)
            .collect();
        for child in children {
            if let Ok(record) = self.objects.view_mut(child) {
                record.parent = None;
            }
        }
        self.objects.remove_view(view)
    }

    /// Views on `output`, back to front.
    pub fn views_on(&self, output: Handle) -> Result<&[Handle]> {
        Ok(self.stack(output)?.stacking_order.as_slice())
    }

    pub fn topmost(&self, output: Handle) -> Result<Option<Handle>> {
        Ok(self.stack(output)?.topmost())
    }

    /// Topmost view on `output` whose geometry contains `point`.
    pub fn view_at(&self, output: Handle, point: Point) -> Result<Option<Handle>> {
        let stack = self.stack(output)?;
        Ok(stack.view_under(point, |h| self.objects.view(h).ok().map(|v| v.geometry)))
    }

    /// Re-home a view. Returns the previous output, or `None` if the view
    /// already lives on `to`.
    pub(crate) fn move_view_to_output(&mut self, view: Handle, to: Handle) -> Result<Option<Handle>> {
        let from = self.objects.view(view)?.output;
        self.objects.output(to)?;
        if from == to {
            return Ok(None);
        }
        if let Ok(stack) = self.stack_mut(from) {
            stack.remove(view);
        }
        self.stack_mut(to)?.insert(view);
        self.objects.view_mut(view)?.output = to;
        self.events
            .push(CompositorEvent::ViewMovedToOutput { view, from, to });
        Ok(Some(from))
    }

    /// Authoritative geometry update. Returns whether anything changed.
    pub(crate) fn apply_geometry(&mut self, view: Handle, geometry: Geometry) -> Result<bool> {
        let record = self.objects.view_mut(view)?;
        if record.geometry == geometry {
            return Ok(false);
        }
        let from = std::mem::replace(&mut record.geometry, geometry);
        self.events.push(CompositorEvent::ViewGeometryChanged {
            view,
            from,
            to: geometry,
        });
        Ok(true)
    }

    /// Authoritative state update. Returns whether anything changed.
    pub(crate) fn apply_state(&mut self, view: Handle, bits: ViewState, toggle: bool) -> Result<bool> {
        let record = self.objects.view_mut(view)?;
        let before = record.state;
        record.state.set(bits, toggle);
        let state = record.state;
        if state == before {
            return Ok(false);
        }
        self.events.push(CompositorEvent::ViewStateChanged { view, state });
        Ok(true)
    }

    pub(crate) fn set_view_mask(&mut self, view: Handle, mask: u32) -> Result<()> {
        self.objects.view_mut(view)?.mask = mask;
        Ok(())
    }

    pub(crate) fn set_view_title(&mut self, view: Handle, title: &str) -> Result<()> {
        self.objects.view_mut(view)?.title = title.to_owned();
        Ok(())
    }

    pub(crate) fn set_view_app_id(&mut self, view: Handle, app_id: &str) -> Result<()> {
        self.objects.view_mut(view)?.app_id = app_id.to_owned();
        Ok(())
    }

    pub(crate) fn set_view_type(&mut self, view: Handle, view_type: ViewType) -> Result<()> {
        self.objects.view_mut(view)?.view_type = view_type;
        Ok(())
    }

    /// Set or clear the parent. A view cannot parent itself and the parent
    /// must be a live view.
    pub(crate) fn set_view_parent(&mut self, view: Handle, parent: Option<Handle>) -> Result<()> {
        if let Some(parent) = parent {
            self.objects.view(parent)?;
            if parent == view {
                return Err(CoreError::invalid_state(format!("view {view} cannot parent itself")));
            }
        }
        self.objects.view_mut(view)?.parent = parent;
        Ok(())
    }

    // =========================================================================
    // Stacking
    // =========================================================================

    pub(crate) fn bring_to_front(&mut self, view: Handle) -> Result<()> {
        let output = self.objects.view(view)?.output;
        self.stack_mut(output)?.bring_to_front(view);
        Ok(())
    }

    pub(crate) fn send_to_back(&mut self, view: Handle) -> Result<()> {
        let output = self.objects.view(view)?.output;
        self.stack_mut(output)?.send_to_back(view);
        Ok(())
    }

    pub(crate) fn bring_above(&mut self, view: Handle, other: Handle) -> Result<()> {
        let output = self.sibling_output(view, other)?;
        self.stack_mut(output)?.bring_above(view, other);
        Ok(())
    }

    pub(crate) fn send_below(&mut self, view: Handle, other: Handle) -> Result<()> {
        let output = self.sibling_output(view, other)?;
        self.stack_mut(output)?.send_below(view, other);
        Ok(())
    }

    /// Restack every view on `output`. `views` is back to front and must
    /// list exactly the views currently on it.
    pub(crate) fn set_output_views(&mut self, output: Handle, views: &[Handle]) -> Result<()> {
        if !self.stack_mut(output)?.reorder(views) {
            return Err(CoreError::invalid_state(format!(
                "{} views do not match the stack of output {output}",
                views.len()
            )));
        }
        Ok(())
    }

    fn sibling_output(&self, view: Handle, other: Handle) -> Result<Handle> {
        let output = self.objects.view(view)?.output;
        if self.objects.view(other)?.output != output {
            return Err(CoreError::invalid_state(format!(
                "views {view} and {other} are on different outputs"
            )));
        }
        Ok(output)
    }

    // =========================================================================
    // Interactive grabs
    // =========================================================================

    pub(crate) fn begin_grab(&mut self, view: Handle, kind: GrabKind, point: Point) -> Result<()> {
        self.objects.view(view)?;
        if let Some(active) = self.grab {
            return Err(CoreError::invalid_state(format!(
                "view {} already grabbed",
                active.view
            )));
        }
        self.grab = Some(InteractiveGrab::new(view, kind, point));
        self.events.push(CompositorEvent::GrabStarted { view, kind });
        self.apply_state(view, grab_bit(kind), true)?;
        Ok(())
    }

    /// Feed pointer motion to the active grab. Returns the view and the
    /// geometry it should take, if a grab is active.
    pub(crate) fn grab_motion(&mut self, point: Point) -> Result<Option<(Handle, Geometry)>> {
        let min = self.config.min_view_size;
        let Some(grab) = self.grab.as_mut() else {
            return Ok(None);
        };
        let current = self.objects.view(grab.view)?.geometry;
        Ok(Some((grab.view, grab.motion(current, point, min))))
    }

    pub(crate) fn end_grab(&mut self) -> Result<Option<InteractiveGrab>> {
        let Some(grab) = self.grab.take() else {
            return Ok(None);
        };
        self.events.push(CompositorEvent::GrabEnded { view: grab.view });
        self.apply_state(grab.view, grab_bit(grab.kind), false)?;
        Ok(Some(grab))
    }
}

fn grab_bit(kind: GrabKind) -> ViewState {
    match kind {
        GrabKind::Move => ViewState::MOVING,
        GrabKind::Resize(_) => ViewState::RESIZING,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::view::ResizeEdges;
    use crate::util::geometry::Size;

    fn setup() -> (CompositorState, Handle) {
        let mut state = CompositorState::new(CompositorConfig::default());
        let output = state.insert_output("test", Size::new(800, 600));
        (state, output)
    }

    #[test]
    fn test_new_views_stack_on_top() {
        let (mut state, output) = setup();
        let a = state.insert_view(output, Geometry::new(0, 0, 100, 100)).unwrap();
        let b = state.insert_view(output, Geometry::new(50, 50, 100, 100)).unwrap();
        assert_eq!(state.views_on(output).unwrap(), &[a, b]);
        assert_eq!(state.view_at(output, Point::new(60, 60)).unwrap(), Some(b));
        state.bring_to_front(a).unwrap();
        assert_eq!(state.view_at(output, Point::new(60, 60)).unwrap(), Some(a));
        state.send_below(a, b).unwrap();
        assert_eq!(state.topmost(output).unwrap(), Some(b));
    }

    #[test]
    fn test_restack_across_outputs_is_invalid() {
        let (mut state, output) = setup();
        let other = state.insert_output("other", Size::new(800, 600));
        let a = state.insert_view(output, Geometry::new(0, 0, 10, 10)).unwrap();
        let b = state.insert_view(other, Geometry::new(0, 0, 10, 10)).unwrap();
        assert!(matches!(state.bring_above(a, b), Err(CoreError::InvalidState(_))));
    }

    #[test]
    fn test_set_output_views() {
        let (mut state, output) = setup();
        let a = state.insert_view(output, Geometry::new(0, 0, 10, 10)).unwrap();
        let b = state.insert_view(output, Geometry::new(0, 0, 10, 10)).unwrap();
        state.set_output_views(output, &[b, a]).unwrap();
        assert_eq!(state.views_on(output).unwrap(), &[b, a]);
        assert!(matches!(
            state.set_output_views(output, &[a]),
            Err(CoreError::InvalidState(_))
        ));
        assert_eq!(state.views_on(output).unwrap(), &[b, a]);
    }

    #[test]
    fn test_removing_parent_orphans_children() {
        let (mut state, output) = setup();
        let parent = state.insert_view(output, Geometry::new(0, 0, 10, 10)).unwrap();
        let child = state.insert_view(output, Geometry::new(0, 0, 10, 10)).unwrap();
        state.set_view_parent(child, Some(parent)).unwrap();
        state.remove_view(parent).unwrap();
        assert_eq!(state.view(child).unwrap().parent, None);

        // A later view must not inherit the stale link.
        let next = state.insert_view(output, Geometry::new(0, 0, 10, 10)).unwrap();
        assert_ne!(next, parent);
        assert_eq!(state.view(child).unwrap().parent, None);
    }

    #[test]
    fn test_move_view_to_output() {
        let (mut state, output) = setup();
        let other = state.insert_output("other", Size::new(800, 600));
        let view = state.insert_view(output, Geometry::new(0, 0, 10, 10)).unwrap();
        assert_eq!(state.move_view_to_output(view, other).unwrap(), Some(output));
        assert_eq!(state.move_view_to_output(view, other).unwrap(), None);
        assert_eq!(state.view(view).unwrap().output, other);
        assert!(state.views_on(output).unwrap().is_empty());
        assert_eq!(state.views_on(other).unwrap(), &[view]);
        assert!(state.remove_output(output).is_ok());
    }

    #[test]
    fn test_apply_state_reports_changes_only() {
        let (mut state, output) = setup();
        let view = state.insert_view(output, Geometry::new(0, 0, 10, 10)).unwrap();
        assert!(state.apply_state(view, ViewState::MAXIMIZED, true).unwrap());
        assert!(!state.apply_state(view, ViewState::MAXIMIZED, true).unwrap());
        assert!(state.apply_state(view, ViewState::MAXIMIZED, false).unwrap());
        assert!(!state.apply_geometry(view, Geometry::new(0, 0, 10, 10)).unwrap());
    }

    #[test]
    fn test_resize_grab_lifecycle() {
        let (mut state, output) = setup();
        let view = state.insert_view(output, Geometry::new(0, 0, 200, 100)).unwrap();
        state
            .begin_grab(view, GrabKind::Resize(ResizeEdges::BOTTOM_RIGHT), Point::new(200, 100))
            .unwrap();
        assert!(state.view(view).unwrap().state.contains(ViewState::RESIZING));
        assert!(state.begin_grab(view, GrabKind::Move, Point::ORIGIN).is_err());

        let (grabbed, geometry) = state.grab_motion(Point::new(230, 90)).unwrap().unwrap();
        assert_eq!(grabbed, view);
        assert_eq!(geometry, Geometry::new(0, 0, 230, 90));

        let ended = state.end_grab().unwrap().unwrap();
        assert_eq!(ended.view, view);
        assert!(!state.view(view).unwrap().state.contains(ViewState::RESIZING));
        assert_eq!(state.grab_motion(Point::ORIGIN).unwrap(), None);
    }

    #[test]
    fn test_removing_grabbed_view_ends_grab() {
        let (mut state, output) = setup();
        let view = state.insert_view(output, Geometry::new(0, 0, 200, 100)).unwrap();
        state.begin_grab(view, GrabKind::Move, Point::ORIGIN).unwrap();
        state.remove_view(view).unwrap();
        assert!(state.grab().is_none());
        assert!(state.views_on(output).unwrap().is_empty());
    }

    #[test]
    fn test_view_parent_must_be_live() {
        let (mut state, output) = setup();
        let view = state.insert_view(output, Geometry::new(0, 0, 10, 10)).unwrap();
        assert!(state.set_view_parent(view, Some(view)).is_err());
        assert!(state.set_view_parent(view, Some(output)).is_err());
        let parent = state.insert_view(output, Geometry::new(0, 0, 10, 10)).unwrap();
        state.set_view_parent(view, Some(parent)).unwrap();
        assert_eq!(state.view(view).unwrap().parent, Some(parent));
    }
}

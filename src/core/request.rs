//! Request arbitration.
//!
//! Clients ask for geometry, state, move and resize changes; the arbiter
//! answers with a [`Decision`]. It only reads state. Whoever asked applies an
//! accepted decision through the authoritative mutation path afterwards.

use crate::core::errors::Result;
use crate::core::handle::Handle;
use crate::core::state::CompositorState;
use crate::core::view::{ResizeEdges, ViewState};
use crate::util::geometry::{Geometry, Point, Size};
use crate::util::logging::REQUEST;

/// Outcome of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision<T = ()> {
    Accept(T),
    Reject,
}

impl<T> Decision<T> {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Decision::Accept(_))
    }

    pub fn accepted(self) -> Option<T> {
        match self {
            Decision::Accept(value) => Some(value),
            Decision::Reject => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Decision<U> {
        match self {
            Decision::Accept(value) => Decision::Accept(f(value)),
            Decision::Reject => Decision::Reject,
        }
    }
}

impl From<bool> for Decision {
    fn from(accept: bool) -> Self {
        if accept {
            Decision::Accept(())
        } else {
            Decision::Reject
        }
    }
}

/// Window-management policy consulted after the built-in checks pass.
///
/// Every method defaults to accepting the proposal as is.
pub trait RequestPolicy {
    /// May return a different geometry to clamp the request.
    fn geometry(&mut self, _state: &CompositorState, _view: Handle, proposed: Geometry) -> Decision<Geometry> {
        Decision::Accept(proposed)
    }

    fn state(&mut self, _state: &CompositorState, _view: Handle, _bit: ViewState, _toggle: bool) -> Decision {
        Decision::Accept(())
    }

    fn interactive_move(&mut self, _state: &CompositorState, _view: Handle, _point: Point) -> Decision {
        Decision::Accept(())
    }

    fn interactive_resize(
        &mut self,
        _state: &CompositorState,
        _view: Handle,
        _edges: ResizeEdges,
        _point: Point,
    ) -> Decision {
        Decision::Accept(())
    }
}

/// Policy that accepts everything the built-in checks let through.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl RequestPolicy for AcceptAll {}

#[derive(Debug, Clone, Copy)]
pub struct RequestArbiter {
    min_size: Size,
}

impl RequestArbiter {
    pub fn new(min_size: Size) -> Self {
        Self { min_size }
    }

    pub fn min_size(&self) -> Size {
        self.min_size
    }

    /// Decide a geometry request.
    ///
    /// Empty proposals are rejected, as is any change to a fullscreen view.
    /// The size is clamped to the minimum both before and after the policy
    /// runs, so the accepted geometry always satisfies it.
    pub fn request_geometry(
        &self,
        state: &CompositorState,
        view: Handle,
        proposed: Geometry,
        policy: &mut dyn RequestPolicy,
    ) -> Result<Decision<Geometry>> {
        let current = state.view(view)?;
        if proposed.size.is_empty() {
            tracing::debug!("[{}] Rejecting empty geometry {} for view {}", REQUEST, proposed, view);
            return Ok(Decision::Reject);
        }
        if current.is_fullscreen() && proposed != current.geometry {
            tracing::debug!("[{}] Rejecting geometry change of fullscreen view {}", REQUEST, view);
            return Ok(Decision::Reject);
        }

        let clamped = self.clamp(proposed);
        Ok(match policy.geometry(state, view, clamped) {
            Decision::Accept(geometry) if !geometry.size.is_empty() => Decision::Accept(self.clamp(geometry)),
            _ => Decision::Reject,
        })
    }

    /// Decide a single state-bit change. Requests naming zero or several
    /// bits are rejected.
    pub fn request_state(
        &self,
        state: &CompositorState,
        view: Handle,
        bit: ViewState,
        toggle: bool,
        policy: &mut dyn RequestPolicy,
    ) -> Result<Decision> {
        state.view(view)?;
        if bit.bits().count_ones() != 1 {
            tracing::debug!("[{}] Rejecting state request {:?} for view {}", REQUEST, bit, view);
            return Ok(Decision::Reject);
        }
        Ok(policy.state(state, view, bit, toggle))
    }

    /// Decide whether an interactive move may start.
    pub fn request_move(
        &self,
        state: &CompositorState,
        view: Handle,
        point: Point,
        policy: &mut dyn RequestPolicy,
    ) -> Result<Decision> {
        let current = state.view(view)?;
        if state.grab().is_some() || current.is_fullscreen() {
            return Ok(Decision::Reject);
        }
        Ok(policy.interactive_move(state, view, point))
    }

    /// Decide whether an interactive resize may start, resolving the edges.
    ///
    /// All edges arrive in one request. No edges means "infer from the
    /// pointer position"; opposite edges together are rejected.
    pub fn request_resize(
        &self,
        state: &CompositorState,
        view: Handle,
        edges: ResizeEdges,
        point: Point,
        policy: &mut dyn RequestPolicy,
    ) -> Result<Decision<ResizeEdges>> {
        let current = state.view(view)?;
        let edges = if edges.is_empty() {
            ResizeEdges::nearest(current.geometry, point)
        } else {
            edges
        };
        if edges.is_empty() || !edges.is_valid() {
            tracing::debug!("[{}] Rejecting resize edges {:?} for view {}", REQUEST, edges, view);
            return Ok(Decision::Reject);
        }
        if state.grab().is_some() || current.is_fullscreen() {
            return Ok(Decision::Reject);
        }
        Ok(policy
            .interactive_resize(state, view, edges, point)
            .map(|()| edges))
    }

    fn clamp(&self, geometry: Geometry) -> Geometry {
        Geometry {
            origin: geometry.origin,
            size: geometry.size.at_least(self.min_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompositorConfig;
    use crate::core::view::GrabKind;

    fn setup() -> (CompositorState, Handle) {
        let mut state = CompositorState::new(CompositorConfig::default());
        let output = state.insert_output("test", Size::new(1000, 800));
        let view = state
            .insert_view(output, Geometry::new(100, 100, 300, 200))
            .unwrap();
        (state, view)
    }

    fn arbiter() -> RequestArbiter {
        RequestArbiter::new(Size::new(80, 40))
    }

    struct Veto;

    impl RequestPolicy for Veto {
        fn geometry(&mut self, _: &CompositorState, _: Handle, _: Geometry) -> Decision<Geometry> {
            Decision::Reject
        }

        fn interactive_resize(&mut self, _: &CompositorState, _: Handle, _: ResizeEdges, _: Point) -> Decision {
            Decision::Reject
        }
    }

    #[test]
    fn test_geometry_accept_clamps_to_min() {
        let (state, view) = setup();
        let decision = arbiter()
            .request_geometry(&state, view, Geometry::new(5, 6, 10, 500), &mut AcceptAll)
            .unwrap();
        assert_eq!(decision, Decision::Accept(Geometry::new(5, 6, 80, 500)));
        assert_eq!(state.view(view).unwrap().geometry, Geometry::new(100, 100, 300, 200));
    }

    #[test]
    fn test_rejected_geometry_leaves_view_untouched() {
        let (state, view) = setup();
        let before = state.view(view).unwrap().clone();
        let decision = arbiter()
            .request_geometry(&state, view, Geometry::new(0, 0, 640, 480), &mut Veto)
            .unwrap();
        assert_eq!(decision, Decision::Reject);
        assert_eq!(*state.view(view).unwrap(), before);
    }

    #[test]
    fn test_empty_geometry_rejected() {
        let (state, view) = setup();
        let decision = arbiter()
            .request_geometry(&state, view, Geometry::new(0, 0, 0, 480), &mut AcceptAll)
            .unwrap();
        assert_eq!(decision, Decision::Reject);
    }

    #[test]
    fn test_fullscreen_view_keeps_geometry() {
        let (mut state, view) = setup();
        state.apply_state(view, ViewState::FULLSCREEN, true).unwrap();
        let decision = arbiter()
            .request_geometry(&state, view, Geometry::new(0, 0, 640, 480), &mut AcceptAll)
            .unwrap();
        assert_eq!(decision, Decision::Reject);
        assert_eq!(
            arbiter().request_move(&state, view, Point::new(1, 1), &mut AcceptAll).unwrap(),
            Decision::Reject
        );
    }

    #[test]
    fn test_state_request_needs_single_bit() {
        let (state, view) = setup();
        let a = arbiter();
        assert!(a
            .request_state(&state, view, ViewState::MAXIMIZED, true, &mut AcceptAll)
            .unwrap()
            .is_accepted());
        assert_eq!(
            a.request_state(&state, view, ViewState::MAXIMIZED | ViewState::FULLSCREEN, true, &mut AcceptAll)
                .unwrap(),
            Decision::Reject
        );
        assert_eq!(
            a.request_state(&state, view, ViewState::empty(), true, &mut AcceptAll).unwrap(),
            Decision::Reject
        );
    }

    #[test]
    fn test_resize_edges_resolved() {
        let (state, view) = setup();
        let a = arbiter();
        let edges = ResizeEdges::RIGHT | ResizeEdges::BOTTOM;
        assert_eq!(
            a.request_resize(&state, view, edges, Point::new(10, 20), &mut AcceptAll).unwrap(),
            Decision::Accept(edges)
        );
        // Inferred from the quadrant of (120, 110): top-left of the centre.
        assert_eq!(
            a.request_resize(&state, view, ResizeEdges::empty(), Point::new(120, 110), &mut AcceptAll)
                .unwrap(),
            Decision::Accept(ResizeEdges::TOP_LEFT)
        );
        assert_eq!(
            a.request_resize(&state, view, ResizeEdges::LEFT | ResizeEdges::RIGHT, Point::ORIGIN, &mut AcceptAll)
                .unwrap(),
            Decision::Reject
        );
        assert_eq!(
            a.request_resize(&state, view, edges, Point::ORIGIN, &mut Veto).unwrap(),
            Decision::Reject
        );
    }

    #[test]
    fn test_no_new_grab_while_one_is_active() {
        let (mut state, view) = setup();
        state.begin_grab(view, GrabKind::Move, Point::new(5, 5)).unwrap();
        assert_eq!(
            arbiter().request_move(&state, view, Point::new(6, 6), &mut AcceptAll).unwrap(),
            Decision::Reject
        );
        assert_eq!(
            arbiter()
                .request_resize(&state, view, ResizeEdges::RIGHT, Point::ORIGIN, &mut AcceptAll)
                .unwrap(),
            Decision::Reject
        );
    }

    #[test]
    fn test_unknown_view_is_not_found() {
        let (state, _) = setup();
        let ghost = Handle::from_raw(0xdead);
        assert!(arbiter()
            .request_move(&state, ghost, Point::ORIGIN, &mut AcceptAll)
            .is_err());
    }
}

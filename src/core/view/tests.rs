#[cfg(test)]
mod tests {
    use crate::core::handle::Handle;
    use crate::core::view::resize::{GrabKind, InteractiveGrab, ResizeEdges};
    use crate::core::view::tree::ViewStack;
    use crate::core::view::{View, ViewType};
    use crate::util::geometry::{Geometry, Point, Size};

    fn h(raw: u64) -> Handle {
        Handle::from_raw(raw)
    }

    #[test]
    fn test_view_stack_operations() {
        let mut stack = ViewStack::new();

        stack.insert(h(1));
        stack.insert(h(2));
        stack.insert(h(3));
        assert_eq!(stack.stacking_order, vec![h(1), h(2), h(3)]);
        assert_eq!(stack.topmost(), Some(h(3)));

        stack.bring_to_front(h(1));
        assert_eq!(stack.stacking_order, vec![h(2), h(3), h(1)]);

        stack.send_to_back(h(1));
        assert_eq!(stack.stacking_order, vec![h(1), h(2), h(3)]);

        stack.bring_above(h(1), h(2));
        assert_eq!(stack.stacking_order, vec![h(2), h(1), h(3)]);

        stack.send_below(h(3), h(2));
        assert_eq!(stack.stacking_order, vec![h(3), h(2), h(1)]);

        assert!(stack.remove(h(2)));
        assert!(!stack.remove(h(2)));
        assert_eq!(stack.stacking_order, vec![h(3), h(1)]);

        // Inserting an existing view is a no-op
        stack.insert(h(3));
        assert_eq!(stack.stacking_order, vec![h(3), h(1)]);
    }

    #[test]
    fn test_reorder_requires_same_views() {
        let mut stack = ViewStack::new();
        stack.insert(h(1));
        stack.insert(h(2));
        stack.insert(h(3));

        assert!(stack.reorder(&[h(3), h(1), h(2)]));
        assert_eq!(stack.stacking_order, vec![h(3), h(1), h(2)]);

        assert!(!stack.reorder(&[h(1), h(2)]));
        assert!(!stack.reorder(&[h(1), h(1), h(2)]));
        assert!(!stack.reorder(&[h(1), h(2), h(4)]));
        assert_eq!(stack.stacking_order, vec![h(3), h(1), h(2)]);
    }

    #[test]
    fn test_view_under_prefers_topmost() {
        let mut stack = ViewStack::new();
        stack.insert(h(1));
        stack.insert(h(2));
        let geometry_of = |id: Handle| match id.raw() {
            1 => Some(Geometry::new(0, 0, 100, 100)),
            2 => Some(Geometry::new(50, 50, 100, 100)),
            _ => None,
        };
        assert_eq!(stack.view_under(Point::new(60, 60), geometry_of), Some(h(2)));
        assert_eq!(stack.view_under(Point::new(10, 10), geometry_of), Some(h(1)));
        assert_eq!(stack.view_under(Point::new(500, 500), geometry_of), None);
    }

    #[test]
    fn test_resize_edges_validity() {
        assert!(ResizeEdges::BOTTOM_RIGHT.is_valid());
        assert!(ResizeEdges::TOP_LEFT.is_valid());
        assert!(!(ResizeEdges::LEFT | ResizeEdges::RIGHT).is_valid());
        assert!(!(ResizeEdges::TOP | ResizeEdges::BOTTOM).is_valid());
    }

    #[test]
    fn test_nearest_edges_by_quadrant() {
        let g = Geometry::new(0, 0, 100, 100);
        assert_eq!(ResizeEdges::nearest(g, Point::new(10, 10)), ResizeEdges::TOP_LEFT);
        assert_eq!(ResizeEdges::nearest(g, Point::new(90, 90)), ResizeEdges::BOTTOM_RIGHT);
        assert_eq!(ResizeEdges::nearest(g, Point::new(90, 50)), ResizeEdges::RIGHT);
    }

    #[test]
    fn test_move_grab_follows_pointer() {
        let mut grab = InteractiveGrab::new(h(1), GrabKind::Move, Point::new(100, 100));
        let g = grab.motion(Geometry::new(10, 20, 300, 200), Point::new(130, 90), Size::new(80, 40));
        assert_eq!(g, Geometry::new(40, 10, 300, 200));
        assert_eq!(grab.anchor, Point::new(130, 90));
    }

    #[test]
    fn test_resize_grab_respects_minimum() {
        let min = Size::new(80, 40);
        let mut grab = InteractiveGrab::new(h(1), GrabKind::Resize(ResizeEdges::TOP_LEFT), Point::ORIGIN);
        let start = Geometry::new(100, 100, 200, 100);

        let g = grab.motion(start, Point::new(20, 10), min);
        assert_eq!(g, Geometry::new(120, 110, 180, 90));

        // Shrinking width below the minimum leaves that axis alone
        let g2 = grab.motion(g, Point::new(140, 20), min);
        assert_eq!(g2.size.w, 180);
        assert_eq!(g2.origin.x, 120);
        assert_eq!(g2.size.h, 80);
    }

    #[test]
    fn test_resize_grab_bottom_right() {
        let mut grab = InteractiveGrab::new(h(1), GrabKind::Resize(ResizeEdges::BOTTOM_RIGHT), Point::new(10, 20));
        let g = grab.motion(Geometry::new(0, 0, 100, 100), Point::new(12, 22), Size::new(80, 40));
        assert_eq!(g, Geometry::new(0, 0, 102, 102));
    }

    #[test]
    fn test_unmanaged_views() {
        let mut view = View::new(h(2), h(1), Geometry::new(0, 0, 10, 10), 1);
        assert!(view.is_managed());
        view.view_type = ViewType::UNMANAGED | ViewType::POPUP;
        assert!(!view.is_managed());
    }
}

//! Per-output stacking order.

use crate::core::handle::Handle;
use crate::util::geometry::{Geometry, Point};

/// Stacking order of the views on one output.
#[derive(Debug, Default, Clone)]
pub struct ViewStack {
    /// Back to front; the last element is the topmost view.
    pub stacking_order: Vec<Handle>,
}

impl ViewStack {
    pub fn new() -> Self {
        Self {
            stacking_order: Vec::new(),
        }
    }

    /// Insert a new view at the top of the stack.
    pub fn insert(&mut self, view: Handle) {
        if !self.stacking_order.contains(&view) {
            self.stacking_order.push(view);
        }
    }

    pub fn remove(&mut self, view: Handle) -> bool {
        match self.position(view) {
            Some(pos) => {
                self.stacking_order.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, view: Handle) -> bool {
        self.stacking_order.contains(&view)
    }

    pub fn len(&self) -> usize {
        self.stacking_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacking_order.is_empty()
    }

    pub fn bring_to_front(&mut self, view: Handle) {
        if let Some(pos) = self.position(view) {
            let id = self.stacking_order.remove(pos);
            self.stacking_order.push(id);
        }
    }

    pub fn send_to_back(&mut self, view: Handle) {
        if let Some(pos) = self.position(view) {
            let id = self.stacking_order.remove(pos);
            self.stacking_order.insert(0, id);
        }
    }

    /// Place `view` directly above `other`.
    pub fn bring_above(&mut self, view: Handle, other: Handle) {
        if view == other || !self.contains(other) {
            return;
        }
        if let Some(pos) = self.position(view) {
            let id = self.stacking_order.remove(pos);
            if let Some(anchor) = self.position(other) {
                self.stacking_order.insert(anchor + 1, id);
            }
        }
    }

    /// Place `view` directly below `other`.
    pub fn send_below(&mut self, view: Handle, other: Handle) {
        if view == other || !self.contains(other) {
            return;
        }
        if let Some(pos) = self.position(view) {
            let id = self.stacking_order.remove(pos);
            if let Some(anchor) = self.position(other) {
                self.stacking_order.insert(anchor, id);
            }
        }
    }

    /// Replace the order wholesale. `order` must hold exactly the views
    /// already on the stack; otherwise nothing changes and `false` is
    /// returned.
    pub fn reorder(&mut self, order: &[Handle]) -> bool {
        if order.len() != self.stacking_order.len() {
            return false;
        }
        let mut seen = Vec::with_capacity(order.len());
        for &view in order {
            if !self.contains(view) || seen.contains(&view) {
                return false;
            }
            seen.push(view);
        }
        self.stacking_order = seen;
        true
    }

    pub fn topmost(&self) -> Option<Handle> {
        self.stacking_order.last().copied()
    }

    /// Topmost view whose geometry contains `point`.
    pub fn view_under<F>(&self, point: Point, geometry_of: F) -> Option<Handle>
    where
        F: Fn(Handle) -> Option<Geometry>,
    {
        self.stacking_order
            .iter()
            .rev()
            .copied()
            .find(|&id| geometry_of(id).is_some_and(|g| g.contains(point)))
    }

    fn position(&self, view: Handle) -> Option<usize> {
        self.stacking_order.iter().position(|&id| id == view)
    }
}

//! Resize edges and interactive move/resize grabs.

use crate::core::handle::Handle;
use crate::util::geometry::{Geometry, Point, Size};

bitflags::bitflags! {
    /// Edges being dragged by an interactive resize.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ResizeEdges: u32 {
        const TOP    = 1;
        const BOTTOM = 2;
        const LEFT   = 4;
        const RIGHT  = 8;
        const TOP_LEFT     = Self::TOP.bits() | Self::LEFT.bits();
        const BOTTOM_LEFT  = Self::BOTTOM.bits() | Self::LEFT.bits();
        const TOP_RIGHT    = Self::TOP.bits() | Self::RIGHT.bits();
        const BOTTOM_RIGHT = Self::BOTTOM.bits() | Self::RIGHT.bits();
    }
}

impl ResizeEdges {
    /// Opposite edges cannot be dragged together.
    pub fn is_valid(self) -> bool {
        !self.contains(Self::TOP | Self::BOTTOM) && !self.contains(Self::LEFT | Self::RIGHT)
    }

    /// Edges nearest to `point`, picked by which quadrant of `geometry` it
    /// falls in. A point exactly on a center line selects no edge on that axis.
    pub fn nearest(geometry: Geometry, point: Point) -> Self {
        let center = geometry.center();
        let mut edges = Self::empty();
        if point.x < center.x {
            edges |= Self::LEFT;
        } else if point.x > center.x {
            edges |= Self::RIGHT;
        }
        if point.y < center.y {
            edges |= Self::TOP;
        } else if point.y > center.y {
            edges |= Self::BOTTOM;
        }
        edges
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabKind {
    Move,
    Resize(ResizeEdges),
}

/// A pointer-driven move or resize in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractiveGrab {
    pub view: Handle,
    pub kind: GrabKind,
    /// Pointer position at the last applied motion
    pub anchor: Point,
}

impl InteractiveGrab {
    pub fn new(view: Handle, kind: GrabKind, anchor: Point) -> Self {
        Self { view, kind, anchor }
    }

    /// Geometry after the pointer moved to `point`.
    ///
    /// Resizing never shrinks a dimension below `min`; an axis that would
    /// is left untouched.
    pub fn motion(&mut self, current: Geometry, point: Point, min: Size) -> Geometry {
        let (dx, dy) = point.delta(self.anchor);
        self.anchor = point;

        let mut next = current;
        match self.kind {
            GrabKind::Move => {
                next.origin.x = clamp_i32(current.origin.x as i64 + dx);
                next.origin.y = clamp_i32(current.origin.y as i64 + dy);
            }
            GrabKind::Resize(edges) => {
                let (x, w) = if edges.contains(ResizeEdges::LEFT) {
                    (current.origin.x as i64 + dx, current.size.w as i64 - dx)
                } else if edges.contains(ResizeEdges::RIGHT) {
                    (current.origin.x as i64, current.size.w as i64 + dx)
                } else {
                    (current.origin.x as i64, current.size.w as i64)
                };
                if w >= min.w as i64 {
                    next.origin.x = clamp_i32(x);
                    next.size.w = w.min(u32::MAX as i64) as u32;
                }

                let (y, h) = if edges.contains(ResizeEdges::TOP) {
                    (current.origin.y as i64 + dy, current.size.h as i64 - dy)
                } else if edges.contains(ResizeEdges::BOTTOM) {
                    (current.origin.y as i64, current.size.h as i64 + dy)
                } else {
                    (current.origin.y as i64, current.size.h as i64)
                };
                if h >= min.h as i64 {
                    next.origin.y = clamp_i32(y);
                    next.size.h = h.min(u32::MAX as i64) as u32;
                }
            }
        }
        next
    }
}

fn clamp_i32(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

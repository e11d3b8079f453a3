//! Geometry primitives shared by outputs, views and pointer events.

use std::fmt;

/// A point in compositor-global coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Component-wise difference `self - other`.
    pub fn delta(self, other: Point) -> (i64, i64) {
        (
            self.x as i64 - other.x as i64,
            self.y as i64 - other.y as i64,
        )
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    pub const ZERO: Size = Size { w: 0, h: 0 };

    pub const fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Grow each dimension to at least `min`.
    pub fn at_least(self, min: Size) -> Self {
        Self {
            w: self.w.max(min.w),
            h: self.h.max(min.h),
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.w, self.h)
    }
}

/// Origin plus size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Geometry {
    pub origin: Point,
    pub size: Size,
}

impl Geometry {
    pub const fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(w, h),
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        let (x, y) = (point.x as i64, point.y as i64);
        let (ox, oy) = (self.origin.x as i64, self.origin.y as i64);
        x >= ox && x < ox + self.size.w as i64 && y >= oy && y < oy + self.size.h as i64
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.origin.x.saturating_add((self.size.w / 2) as i32),
            self.origin.y.saturating_add((self.size.h / 2) as i32),
        )
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}+{}", self.size, self.origin.x, self.origin.y)
    }
}

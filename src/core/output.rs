//! Output (display) records.

use crate::core::handle::Handle;
use crate::util::geometry::{Geometry, Point, Size};

/// A display the compositor renders to.
///
/// The render phase is not stored here; the
/// [`RenderScheduler`](crate::core::render::RenderScheduler) owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub handle: Handle,
    pub name: String,
    /// Current resolution in pixels
    pub resolution: Size,
    pub focused: bool,
    /// Visibility bitmask; a view is drawn when its mask intersects this one
    pub mask: u32,
    /// Sleeping outputs render empty frames
    pub sleeping: bool,
}

impl Output {
    pub fn new(handle: Handle, name: impl Into<String>, resolution: Size, mask: u32) -> Self {
        Self {
            handle,
            name: name.into(),
            resolution,
            focused: false,
            mask,
            sleeping: false,
        }
    }

    /// The output area in output-local coordinates.
    pub fn geometry(&self) -> Geometry {
        Geometry {
            origin: Point::ORIGIN,
            size: self.resolution,
        }
    }

    pub fn shows(&self, view_mask: u32) -> bool {
        !self.sleeping && self.mask & view_mask != 0
    }
}

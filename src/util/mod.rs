pub mod geometry;
pub mod logging;

pub use geometry::{Geometry, Point, Size};

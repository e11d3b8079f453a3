pub mod focus;
pub mod resize;
pub mod tree;
pub mod view;
mod tests;

pub use focus::{FocusChange, FocusTracker};
pub use resize::{GrabKind, InteractiveGrab, ResizeEdges};
pub use tree::ViewStack;
pub use view::{View, ViewState, ViewType};

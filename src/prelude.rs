//! Common imports for embedders.

pub use crate::config::CompositorConfig;
pub use crate::core::input::{
    ButtonState, InputDevice, KeyState, ModifierBits, Modifiers, Propagation, ScrollAxis, TouchType,
};
pub use crate::core::render::{Frame, Renderer};
pub use crate::core::view::{ResizeEdges, ViewState, ViewType};
pub use crate::core::{
    Capabilities, Command, Compositor, CompositorEvent, Context, CoreError, Decision, Handle,
    Interface,
};
pub use crate::util::geometry::{Geometry, Point, Size};

pub type Result<T> = std::result::Result<T, crate::core::errors::CoreError>;

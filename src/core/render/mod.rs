pub mod scene;
pub mod scheduler;

pub use scene::{DrawCommand, Frame, NullRenderer, Renderer};
pub use scheduler::{RenderPhase, RenderScheduler};

pub mod errors;
pub mod handle;
pub mod output;
pub mod view;
pub mod render;
pub mod input;
pub mod request;
pub mod lifecycle;
pub mod interface;
pub mod runtime;
pub mod state;
pub mod compositor;

// Re-export key types
pub use compositor::{Compositor, CompositorEvent};
pub use errors::{CoreError, ObjectKind, Result};
pub use handle::{Handle, HandleTable, Object};
pub use interface::{Capabilities, Context, Interface, StubInterface};
pub use lifecycle::{CompositorLifecycle, LifecycleState};
pub use request::{AcceptAll, Decision, RequestArbiter, RequestPolicy};
pub use runtime::{Command, CommandQueue};
pub use state::CompositorState;

// wlc-core
//
// Event-dispatch core of a compositor: output/view lifecycle behind
// generation-counted handles, focus, per-output render phases, input
// routing and request arbitration. Backends feed events in, an embedder
// interface decides policy.

pub mod core;
pub mod platform;
pub mod config;
pub mod util;
pub mod prelude;

pub use crate::config::CompositorConfig;
pub use crate::core::{Compositor, CoreError, Handle};

#[cfg(test)]
mod tests;

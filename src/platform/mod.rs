//! Platform Integration Module
//!
//! Backends sit on this side of the core. The headless platform and the
//! tiling policy double as a reference embedding.

pub mod api;
pub mod policy;

pub use api::{HeadlessPlatform, LogRenderer, Platform};
pub use policy::TilingPolicy;

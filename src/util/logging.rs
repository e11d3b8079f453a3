//! Logging setup and the `wlog!` macro.
//!
//! Everything is emitted through `tracing`. `wlog!` tags a line with one of
//! the module identifiers below so logs read as `[MODULE] message`.

use anyhow::anyhow;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

#[macro_export]
macro_rules! wlog {
    ($module:expr, $($arg:tt)*) => {{
        tracing::info!("[{}] {}", $module, format_args!($($arg)*));
    }};
}

/// Standardized module identifiers
pub const MAIN: &str = "MAIN";
pub const CORE: &str = "CORE";
pub const HANDLES: &str = "HANDLES";
pub const FOCUS: &str = "FOCUS";
pub const RENDER: &str = "RENDER";
pub const INPUT: &str = "INPUT";
pub const REQUEST: &str = "REQUEST";
pub const LIFECYCLE: &str = "LIFECYCLE";
pub const PLATFORM: &str = "PLATFORM";

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins over `default_filter` when set. Fails if a global
/// subscriber is already installed.
pub fn init(default_filter: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| anyhow!("invalid log filter {default_filter:?}: {e}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}

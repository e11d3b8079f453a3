use anyhow::{Context, Result};
use wlc_core::config::CompositorConfig;
use wlc_core::platform::{HeadlessPlatform, Platform};
use wlc_core::util::logging::{self, MAIN};
use wlc_core::wlog;

fn main() -> Result<()> {
    let config = CompositorConfig::from_env().context("Failed to load configuration")?;

    // Initialize logging with standardized format
    logging::init(&config.log_filter)?;
    wlog!(MAIN, "Starting headless session");

    let mut app = HeadlessPlatform::new(config);

    // Initialize the platform (creates the output and devices)
    app.initialize().context("Failed to initialize headless platform")?;

    // Run the scripted session to completion
    app.run().context("Headless session failed")?;

    Ok(())
}

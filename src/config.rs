//! Compositor configuration.

use anyhow::{anyhow, bail, Context, Result};

use crate::core::interface::Capabilities;
use crate::util::geometry::Size;

/// Configuration for the compositor
#[derive(Debug, Clone, PartialEq)]
pub struct CompositorConfig {
    /// Upper bound on enabled handlers; intersected with the interface's own set
    pub capabilities: Capabilities,
    /// Destroying an output destroys its views (else `DanglingReference`)
    pub cascade_destroy: bool,
    /// Give focus back to the previously focused view when the focused one goes away
    pub refocus_on_destroy: bool,
    /// Lower clamp for accepted geometry requests and interactive resize
    pub min_view_size: Size,
    /// Visibility mask given to new outputs
    pub default_output_mask: u32,
    /// Deferred-command drain rounds per dispatch
    pub max_command_rounds: usize,
    /// Default tracing filter
    pub log_filter: String,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            capabilities: Capabilities::all(),
            cascade_destroy: true,
            refocus_on_destroy: false,
            min_view_size: Size::new(80, 40),
            default_output_mask: 1,
            max_command_rounds: 16,
            log_filter: "info".to_string(),
        }
    }
}

impl CompositorConfig {
    /// Defaults overridden by `WLC_CORE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("WLC_CORE_CAPABILITIES") {
            config.capabilities = parse_capabilities(&raw)
                .with_context(|| format!("Invalid WLC_CORE_CAPABILITIES: {raw:?}"))?;
        }
        if let Some(raw) = lookup("WLC_CORE_CASCADE") {
            config.cascade_destroy =
                parse_flag(&raw).with_context(|| format!("Invalid WLC_CORE_CASCADE: {raw:?}"))?;
        }
        if let Some(raw) = lookup("WLC_CORE_REFOCUS") {
            config.refocus_on_destroy =
                parse_flag(&raw).with_context(|| format!("Invalid WLC_CORE_REFOCUS: {raw:?}"))?;
        }
        if let Some(raw) = lookup("WLC_CORE_MIN_VIEW_SIZE") {
            config.min_view_size = parse_size(&raw)
                .with_context(|| format!("Invalid WLC_CORE_MIN_VIEW_SIZE: {raw:?}"))?;
        }
        if let Some(raw) = lookup("WLC_CORE_LOG") {
            config.log_filter = raw;
        }

        Ok(config)
    }
}

fn parse_capabilities(raw: &str) -> Result<Capabilities> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("all") {
        return Ok(Capabilities::all());
    }
    bitflags::parser::from_str(raw).map_err(|e| anyhow!("{e}"))
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected 0 or 1, got {other:?}"),
    }
}

fn parse_size(raw: &str) -> Result<Size> {
    let (w, h) = raw
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("expected WxH"))?;
    let w = w.trim().parse().context("width")?;
    let h = h.trim().parse().context("height")?;
    Ok(Size::new(w, h))
}

//! Platform API Trait
//!
//! A platform owns the backend side of the core: it creates the
//! [`Compositor`], reports outputs, views, devices and input to it, and
//! drives frames.

use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::config::CompositorConfig;
use crate::core::compositor::Compositor;
use crate::core::handle::Handle;
use crate::core::input::{ButtonState, InputDevice, KeyState, ModifierBits, Modifiers};
use crate::core::lifecycle::LifecycleState;
use crate::core::render::{Frame, Renderer};
use crate::platform::policy::{TilingPolicy, BTN_RIGHT, KEY_DOWN, KEY_ESC, KEY_Q};
use crate::util::geometry::{Geometry, Point, Size};
use crate::util::logging::{PLATFORM, RENDER};
use crate::wlog;

/// Platform adapter interface.
pub trait Platform {
    /// Initialize the platform adapter.
    fn initialize(&mut self) -> Result<()>;

    /// Run the platform event loop until the compositor stops.
    fn run(&mut self) -> Result<()>;
}

/// Renderer that logs each frame.
#[derive(Debug, Default)]
pub struct LogRenderer {
    frames: u64,
}

impl LogRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Renderer for LogRenderer {
    fn render(&mut self, frame: &Frame) {
        self.frames += 1;
        tracing::debug!("{}", frame.dump().trim_end());
    }
}

const OUTPUT_NAME: &str = "HEADLESS-1";
const KEYBOARD: InputDevice = InputDevice(1);
const POINTER: InputDevice = InputDevice(2);

/// Platform without any real backend. Replays a short scripted session
/// through the core using the tiling policy.
pub struct HeadlessPlatform {
    compositor: Arc<Compositor>,
    resolution: Size,
    output: Option<Handle>,
    renderer: LogRenderer,
}

impl HeadlessPlatform {
    pub fn new(config: CompositorConfig) -> Self {
        Self {
            compositor: Arc::new(Compositor::new(config, Box::new(TilingPolicy::new()))),
            resolution: Size::new(1920, 1080),
            output: None,
            renderer: LogRenderer::new(),
        }
    }

    pub fn compositor(&self) -> &Arc<Compositor> {
        &self.compositor
    }

    pub fn frames_rendered(&self) -> u64 {
        self.renderer.frames()
    }

    fn output(&self) -> Result<Handle> {
        self.output.context("headless platform not initialized")
    }

    fn render_pending(&mut self) -> Result<()> {
        let pending = self.compositor.with_state(|s| s.scheduled_outputs());
        for output in pending {
            let number = self.compositor.render_output(output, &mut self.renderer)?;
            tracing::trace!("[{}] output {} frame {}", RENDER, output, number);
        }
        Ok(())
    }

    fn map_view(&mut self, title: &str) -> Result<Option<Handle>> {
        let output = self.output()?;
        let view = self
            .compositor
            .view_created(output, Geometry::new(0, 0, 640, 480))?
            .accepted();
        if let Some(view) = view {
            self.compositor.set_view_title(view, title)?;
            self.compositor.schedule_render(output)?;
        }
        Ok(view)
    }

    fn ctrl_key(&self, time: u32, key: u32) -> Result<()> {
        let ctrl = Modifiers {
            mods: ModifierBits::CTRL,
            ..Modifiers::NONE
        };
        for state in [KeyState::Pressed, KeyState::Released] {
            self.compositor.keyboard_key(None, time, ctrl, key, state)?;
        }
        Ok(())
    }
}

impl Platform for HeadlessPlatform {
    fn initialize(&mut self) -> Result<()> {
        self.compositor.compositor_ready()?;
        for device in [KEYBOARD, POINTER] {
            self.compositor.input_device_created(device)?;
        }
        let output = self
            .compositor
            .output_created(OUTPUT_NAME, self.resolution)?
            .accepted()
            .context("output rejected by policy")?;
        self.compositor.output_focus(output, true)?;
        self.compositor.schedule_render(output)?;
        self.output = Some(output);
        wlog!(PLATFORM, "Headless platform initialized with output {} ({})", output, self.resolution);
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let output = self.output()?;
        self.render_pending()?;

        let mut views = Vec::new();
        for title in ["terminal", "editor", "browser"] {
            if let Some(view) = self.map_view(title)? {
                views.push(view);
            }
            self.render_pending()?;
        }
        wlog!(PLATFORM, "Mapped {} view(s)", views.len());

        // Ctrl+right-drag the bottom-right quadrant of the last view.
        let ctrl = Modifiers {
            mods: ModifierBits::CTRL,
            ..Modifiers::NONE
        };
        if let Some(&view) = views.last() {
            let center = self.compositor.with_state(|s| s.view(view).map(|v| v.geometry.center()))?;
            let start = Point::new(center.x + 10, center.y + 10);
            let end = Point::new(start.x + 40, start.y + 30);
            self.compositor
                .pointer_button(Some(view), 200, ctrl, BTN_RIGHT, ButtonState::Pressed, start)?;
            self.compositor.pointer_motion(Some(view), 210, end)?;
            self.compositor
                .pointer_button(Some(view), 220, ctrl, BTN_RIGHT, ButtonState::Released, end)?;
            self.compositor.schedule_render(output)?;
            self.render_pending()?;
        }

        self.ctrl_key(300, KEY_DOWN)?;
        self.ctrl_key(310, KEY_Q)?;
        self.compositor.schedule_render(output)?;
        self.render_pending()?;

        self.compositor.output_resolution(output, Size::new(1280, 720))?;
        self.compositor.schedule_render(output)?;
        self.render_pending()?;

        self.ctrl_key(400, KEY_ESC)?;
        if self.compositor.lifecycle() != LifecycleState::Terminating {
            self.compositor.compositor_terminate()?;
        }
        self.compositor.stop()?;

        for event in self.compositor.take_events() {
            tracing::debug!("[{}] {:?}", PLATFORM, event);
        }
        wlog!(PLATFORM, "Session finished after {} frame(s)", self.renderer.frames());
        Ok(())
    }
}

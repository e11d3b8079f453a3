//! Reference window-management policy.
//!
//! Tiles managed views in two columns, focuses new views, marks the focused
//! view activated and binds a few keys:
//!
//! - `Ctrl+Q` closes the target view
//! - `Ctrl+Down` sends it to the back and focuses the new topmost view
//! - `Ctrl+Esc` terminates the compositor
//! - `Ctrl+Left button` starts a move, `Ctrl+Right button` a resize

use crate::core::handle::Handle;
use crate::core::input::{ButtonState, KeyState, ModifierBits, Modifiers, Propagation};
use crate::core::interface::{Capabilities, Context, Interface};
use crate::core::request::Decision;
use crate::core::runtime::Command;
use crate::core::view::{GrabKind, ResizeEdges, ViewState};
use crate::util::geometry::{Geometry, Point, Size};

// evdev key codes (linux/input-event-codes.h)
pub const KEY_ESC: u32 = 1;
pub const KEY_Q: u32 = 16;
pub const KEY_DOWN: u32 = 108;
pub const BTN_LEFT: u32 = 0x110;
pub const BTN_RIGHT: u32 = 0x111;

/// Two-column tiling layout for `count` views.
///
/// Views fill rows left then right; a lone view in the last row spans the
/// full width.
pub fn tile(resolution: Size, count: usize) -> Vec<Geometry> {
    let rows = count.div_ceil(2).max(1) as u32;
    let w = resolution.w / 2;
    let h = resolution.h / rows;
    (0..count)
        .map(|i| {
            let row = (i / 2) as u32;
            let right = i % 2 == 1;
            let y = (row * h).min(i32::MAX as u32) as i32;
            if right {
                Geometry::new(w.min(i32::MAX as u32) as i32, y, w, h)
            } else if i == count - 1 {
                Geometry::new(0, y, resolution.w, h)
            } else {
                Geometry::new(0, y, w, h)
            }
        })
        .collect()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TilingPolicy;

impl TilingPolicy {
    pub fn new() -> Self {
        Self
    }

    /// Queue geometry for every managed view on `output`, skipping
    /// `exclude`.
    fn relayout(&self, ctx: &Context<'_>, output: Handle, exclude: Option<Handle>) {
        let state = ctx.state();
        let Ok(record) = state.output(output) else {
            return;
        };
        let Ok(stack) = state.views_on(output) else {
            return;
        };
        let views: Vec<Handle> = stack
            .iter()
            .copied()
            .filter(|&v| Some(v) != exclude)
            .filter(|&v| state.view(v).is_ok_and(|view| view.is_managed()))
            .collect();
        for (view, geometry) in views.iter().zip(tile(record.resolution, views.len())) {
            ctx.defer(Command::SetGeometry {
                view: *view,
                geometry,
            });
        }
    }

    fn topmost_except(ctx: &Context<'_>, output: Handle, exclude: Handle) -> Option<Handle> {
        ctx.state()
            .views_on(output)
            .ok()?
            .iter()
            .rev()
            .copied()
            .find(|&v| v != exclude)
    }
}

impl Interface for TilingPolicy {
    fn capabilities(&self) -> Capabilities {
        Capabilities::OUTPUT_RESOLUTION
            | Capabilities::VIEW_CREATED
            | Capabilities::VIEW_DESTROYED
            | Capabilities::VIEW_FOCUS
            | Capabilities::KEYBOARD_KEY
            | Capabilities::POINTER_BUTTON
    }

    fn output_resolution(&mut self, ctx: &Context<'_>, output: Handle, _from: Size, _to: Size) {
        self.relayout(ctx, output, None);
    }

    fn view_created(&mut self, ctx: &Context<'_>, view: Handle) -> Decision {
        let Ok(record) = ctx.state().view(view) else {
            return Decision::Reject;
        };
        let output = record.output;
        ctx.defer(Command::BringToFront(view));
        ctx.defer(Command::FocusView(Some(view)));
        self.relayout(ctx, output, None);
        Decision::Accept(())
    }

    fn view_destroyed(&mut self, ctx: &Context<'_>, view: Handle) {
        let Ok(record) = ctx.state().view(view) else {
            return;
        };
        let output = record.output;
        // Focus was already evicted if this view held it.
        if ctx.state().focused_view().is_none() {
            ctx.defer(Command::FocusView(Self::topmost_except(ctx, output, view)));
        }
        self.relayout(ctx, output, Some(view));
    }

    fn view_focus(&mut self, ctx: &Context<'_>, view: Handle, focus: bool) {
        ctx.defer(Command::SetState {
            view,
            state: ViewState::ACTIVATED,
            toggle: focus,
        });
    }

    fn keyboard_key(
        &mut self,
        ctx: &Context<'_>,
        view: Handle,
        _time: u32,
        modifiers: &Modifiers,
        key: u32,
        state: KeyState,
    ) -> Propagation {
        if state != KeyState::Pressed || !modifiers.has(ModifierBits::CTRL) {
            return Propagation::Propagate;
        }
        match key {
            KEY_Q => ctx.defer(Command::CloseView(view)),
            KEY_DOWN => {
                ctx.defer(Command::SendToBack(view));
                if let Ok(record) = ctx.state().view(view) {
                    ctx.defer(Command::FocusView(Self::topmost_except(ctx, record.output, view)));
                }
            }
            KEY_ESC => ctx.defer(Command::Terminate),
            _ => return Propagation::Propagate,
        }
        Propagation::Consumed
    }

    fn pointer_button(
        &mut self,
        ctx: &Context<'_>,
        view: Handle,
        _time: u32,
        modifiers: &Modifiers,
        button: u32,
        state: ButtonState,
        point: Point,
    ) -> Propagation {
        if state != ButtonState::Pressed {
            return Propagation::Propagate;
        }
        ctx.defer(Command::FocusView(Some(view)));
        if !modifiers.has(ModifierBits::CTRL) || ctx.state().grab().is_some() {
            return Propagation::Propagate;
        }
        let kind = match button {
            BTN_LEFT => GrabKind::Move,
            BTN_RIGHT => match ctx.state().view(view) {
                Ok(record) => GrabKind::Resize(ResizeEdges::nearest(record.geometry, point)),
                Err(_) => return Propagation::Propagate,
            },
            _ => return Propagation::Propagate,
        };
        ctx.defer(Command::BringToFront(view));
        ctx.defer(Command::BeginGrab { view, kind, point });
        Propagation::Consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_single_view_fills_output() {
        assert_eq!(tile(Size::new(800, 600), 1), vec![Geometry::new(0, 0, 800, 600)]);
        assert!(tile(Size::new(800, 600), 0).is_empty());
    }

    #[test]
    fn test_tile_two_columns() {
        assert_eq!(
            tile(Size::new(800, 600), 3),
            vec![
                Geometry::new(0, 0, 400, 300),
                Geometry::new(400, 0, 400, 300),
                Geometry::new(0, 300, 800, 300),
            ]
        );
        assert_eq!(
            tile(Size::new(800, 600), 4)[3],
            Geometry::new(400, 300, 400, 300)
        );
    }
}

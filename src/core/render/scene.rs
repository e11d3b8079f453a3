//! Per-frame scene snapshots handed to an external renderer.

use std::fmt::Write as _;

use crate::core::errors::Result;
use crate::core::handle::Handle;
use crate::core::state::CompositorState;
use crate::core::view::ViewState;
use crate::util::geometry::{Geometry, Size};

/// A single draw operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCommand {
    /// Clear the whole output
    Clear { size: Size },
    /// Draw a view at its geometry
    View {
        view: Handle,
        geometry: Geometry,
        state: ViewState,
    },
}

/// Everything a renderer needs for one frame of one output. Owns its data so
/// it can be rendered without holding the state lock.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub output: Handle,
    pub number: u64,
    pub resolution: Size,
    /// Back to front
    pub commands: Vec<DrawCommand>,
}

impl Frame {
    /// Snapshot the visible views of `output`.
    ///
    /// A view is drawn when its mask intersects the output's mask, its size
    /// is non-empty and the output is awake.
    pub fn build(state: &CompositorState, output: Handle, number: u64) -> Result<Self> {
        let record = state.output(output)?;
        let mut commands = vec![DrawCommand::Clear {
            size: record.resolution,
        }];
        for &handle in state.views_on(output)? {
            let view = state.view(handle)?;
            if record.shows(view.mask) && !view.geometry.size.is_empty() {
                commands.push(DrawCommand::View {
                    view: handle,
                    geometry: view.geometry,
                    state: view.state,
                });
            }
        }
        Ok(Self {
            output,
            number,
            resolution: record.resolution,
            commands,
        })
    }

    /// Views drawn in this frame, back to front.
    pub fn views(&self) -> impl Iterator<Item = Handle> + '_ {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::View { view, .. } => Some(*view),
            DrawCommand::Clear { .. } => None,
        })
    }

    /// Dump the frame for debugging
    pub fn dump(&self) -> String {
        let mut out = format!(
            "Frame {} for output {} ({})\n",
            self.number, self.output, self.resolution
        );
        for command in &self.commands {
            let _ = match command {
                DrawCommand::Clear { size } => writeln!(out, "  clear {size}"),
                DrawCommand::View {
                    view,
                    geometry,
                    state,
                } => writeln!(out, "  view {view} at {geometry} {state:?}"),
            };
        }
        out
    }
}

/// Draws frames. Implemented by the embedder's backend.
pub trait Renderer {
    fn render(&mut self, frame: &Frame);
}

/// Renderer that draws nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _frame: &Frame) {}
}

//! Per-output frame phases.
//!
//! Each output cycles `Idle -> PreRender -> PostRender -> Idle` once per
//! frame. The scheduler only brackets the phases; the renderer is invoked by
//! the caller between `begin_frame` and `mark_drawn`.

use std::collections::HashMap;

use crate::core::errors::{CoreError, ObjectKind, Result};
use crate::core::handle::Handle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderPhase {
    #[default]
    Idle,
    PreRender,
    PostRender,
}

#[derive(Debug, Default)]
struct FrameState {
    phase: RenderPhase,
    /// Completed frames
    frames: u64,
    /// Another frame was requested
    scheduled: bool,
}

/// Sequences render phases for every live output.
#[derive(Debug, Default)]
pub struct RenderScheduler {
    outputs: HashMap<Handle, FrameState>,
}

impl RenderScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, output: Handle) {
        self.outputs.entry(output).or_default();
    }

    /// Drop all frame state for `output`. Returns whether a frame was in flight.
    pub fn evict(&mut self, output: Handle) -> bool {
        self.outputs
            .remove(&output)
            .is_some_and(|f| f.phase != RenderPhase::Idle)
    }

    pub fn phase(&self, output: Handle) -> Result<RenderPhase> {
        self.frame(output).map(|f| f.phase)
    }

    /// Idle -> PreRender. Returns the number of the frame being started.
    pub fn begin_frame(&mut self, output: Handle) -> Result<u64> {
        let frame = self.frame_mut(output)?;
        if frame.phase != RenderPhase::Idle {
            return Err(CoreError::invalid_state(format!(
                "output {output} already has a frame in flight ({:?})",
                frame.phase
            )));
        }
        frame.phase = RenderPhase::PreRender;
        frame.scheduled = false;
        Ok(frame.frames + 1)
    }

    /// PreRender -> PostRender, after the renderer ran.
    pub fn mark_drawn(&mut self, output: Handle) -> Result<()> {
        let frame = self.frame_mut(output)?;
        if frame.phase != RenderPhase::PreRender {
            return Err(CoreError::invalid_state(format!(
                "output {output} is not in pre-render ({:?})",
                frame.phase
            )));
        }
        frame.phase = RenderPhase::PostRender;
        Ok(())
    }

    /// PostRender -> Idle. Returns true when another frame was requested
    /// while this one was in flight.
    pub fn end_frame(&mut self, output: Handle) -> Result<bool> {
        let frame = self.frame_mut(output)?;
        if frame.phase != RenderPhase::PostRender {
            return Err(CoreError::invalid_state(format!(
                "output {output} is not in post-render ({:?})",
                frame.phase
            )));
        }
        frame.phase = RenderPhase::Idle;
        frame.frames += 1;
        Ok(frame.scheduled)
    }

    /// Request a frame. No-op when one is already pending.
    pub fn schedule(&mut self, output: Handle) -> Result<()> {
        self.frame_mut(output)?.scheduled = true;
        Ok(())
    }

    pub fn is_scheduled(&self, output: Handle) -> bool {
        self.outputs.get(&output).is_some_and(|f| f.scheduled)
    }

    /// Outputs with a pending frame request, in handle order.
    pub fn scheduled(&self) -> Vec<Handle> {
        let mut outputs: Vec<Handle> = self
            .outputs
            .iter()
            .filter(|(_, f)| f.scheduled)
            .map(|(&h, _)| h)
            .collect();
        outputs.sort();
        outputs
    }

    pub fn frame_count(&self, output: Handle) -> Result<u64> {
        self.frame(output).map(|f| f.frames)
    }

    fn frame(&self, output: Handle) -> Result<&FrameState> {
        self.outputs
            .get(&output)
            .ok_or_else(|| CoreError::not_found(ObjectKind::Output, output))
    }

    fn frame_mut(&mut self, output: Handle) -> Result<&mut FrameState> {
        self.outputs
            .get_mut(&output)
            .ok_or_else(|| CoreError::not_found(ObjectKind::Output, output))
    }
}

//! Output records and their render phases.

use super::*;
use crate::util::geometry::Size;

impl CompositorState {
    /// Allocate an output record. Records nothing; the compositor reports
    /// creation only once the embedder accepted it.
    pub(crate) fn insert_output(&mut self, name: &str, resolution: Size) -> Handle {
        let mask = self.config.default_output_mask;
        let handle = self
            .objects
            .create(|h| Object::Output(Output::new(h, name, resolution, mask)));
        self.scheduler.register(handle);
        self.stacks.insert(handle, ViewStack::new());
        handle
    }

    /// Remove an output with no views left.
    ///
    /// Fails with `DanglingReference` while views still reference it; the
    /// output is left intact in that case. Focus and render state are
    /// evicted first.
    pub(crate) fn remove_output(&mut self, output: Handle) -> Result<Output> {
        self.objects.output(output)?;
        let views = self.stack(output)?.len();
        if views > 0 {
            return Err(CoreError::DanglingReference { output, views });
        }

        let change = self.focus.evict(output);
        if let Some(record) = change.and_then(|_| self.objects.output_mut(output).ok()) {
            record.focused = false;
            self.events.push(CompositorEvent::OutputFocusChanged {
                output,
                focused: false,
            });
        }
        if self.scheduler.evict(output) {
            tracing::debug!("Output {} destroyed with a frame in flight", output);
        }
        self.stacks.remove(&output);
        self.objects.remove_output(output)
    }

    /// Change the resolution. Returns the previous one, or `None` if it
    /// did not change.
    pub(crate) fn set_output_resolution(&mut self, output: Handle, to: Size) -> Result<Option<Size>> {
        let record = self.objects.output_mut(output)?;
        if record.resolution == to {
            return Ok(None);
        }
        let from = std::mem::replace(&mut record.resolution, to);
        self.events
            .push(CompositorEvent::OutputResolutionChanged { output, from, to });
        Ok(Some(from))
    }

    pub(crate) fn set_output_mask(&mut self, output: Handle, mask: u32) -> Result<()> {
        self.objects.output_mut(output)?.mask = mask;
        Ok(())
    }

    pub(crate) fn set_output_sleep(&mut self, output: Handle, sleeping: bool) -> Result<()> {
        self.objects.output_mut(output)?.sleeping = sleeping;
        Ok(())
    }

    // =========================================================================
    // Render phases
    // =========================================================================

    pub(crate) fn begin_frame(&mut self, output: Handle) -> Result<u64> {
        self.objects.output(output)?;
        self.scheduler.begin_frame(output)
    }

    pub(crate) fn mark_drawn(&mut self, output: Handle) -> Result<()> {
        self.scheduler.mark_drawn(output)
    }

    /// Close the frame. Returns `true` if another frame was requested while
    /// this one was in flight.
    pub(crate) fn end_frame(&mut self, output: Handle) -> Result<bool> {
        let again = self.scheduler.end_frame(output)?;
        if again {
            self.events.push(CompositorEvent::RenderRequested { output });
        }
        Ok(again)
    }

    /// Request a frame. Returns `false` if one was already pending.
    pub(crate) fn schedule_render(&mut self, output: Handle) -> Result<bool> {
        self.objects.output(output)?;
        if self.scheduler.is_scheduled(output) {
            return Ok(false);
        }
        self.scheduler.schedule(output)?;
        // A request during a frame is reported when that frame ends.
        if self.scheduler.phase(output)? == RenderPhase::Idle {
            self.events.push(CompositorEvent::RenderRequested { output });
        }
        Ok(true)
    }
}

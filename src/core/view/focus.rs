//! Focus management.

use crate::core::handle::Handle;

const HISTORY_LIMIT: usize = 10;

/// One actual focus transition. At least one side is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusChange {
    pub lost: Option<Handle>,
    pub gained: Option<Handle>,
}

/// Tracks the single focused output and the single focused view.
///
/// Every mutator returns `None` when nothing changed, so callers notify
/// exactly once per real transition. Liveness of handles is checked by the
/// caller.
#[derive(Debug, Default)]
pub struct FocusTracker {
    output: Option<Handle>,
    view: Option<Handle>,
    /// Previously focused views, most recent first
    history: Vec<Handle>,
}

impl FocusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focused_output(&self) -> Option<Handle> {
        self.output
    }

    pub fn focused_view(&self) -> Option<Handle> {
        self.view
    }

    pub fn has_view_focus(&self, view: Handle) -> bool {
        self.view == Some(view)
    }

    pub fn focus_output(&mut self, output: Handle) -> Option<FocusChange> {
        if self.output == Some(output) {
            return None;
        }
        let lost = self.output.replace(output);
        Some(FocusChange {
            lost,
            gained: Some(output),
        })
    }

    pub fn unfocus_output(&mut self, output: Handle) -> Option<FocusChange> {
        if self.output != Some(output) {
            return None;
        }
        self.output = None;
        Some(FocusChange {
            lost: Some(output),
            gained: None,
        })
    }

    /// Focus `view`, implicitly unfocusing the previous one.
    pub fn focus_view(&mut self, view: Handle) -> Option<FocusChange> {
        if self.view == Some(view) {
            return None;
        }
        let lost = self.view.replace(view);
        if let Some(prev) = lost {
            self.history.retain(|&id| id != prev);
            self.history.insert(0, prev);
            self.history.truncate(HISTORY_LIMIT);
        }
        self.history.retain(|&id| id != view);
        Some(FocusChange {
            lost,
            gained: Some(view),
        })
    }

    pub fn unfocus_view(&mut self, view: Handle) -> Option<FocusChange> {
        if self.view != Some(view) {
            return None;
        }
        self.view = None;
        self.history.retain(|&id| id != view);
        self.history.insert(0, view);
        self.history.truncate(HISTORY_LIMIT);
        Some(FocusChange {
            lost: Some(view),
            gained: None,
        })
    }

    /// Forget `handle` entirely (it is being destroyed).
    pub fn evict(&mut self, handle: Handle) -> Option<FocusChange> {
        self.history.retain(|&id| id != handle);
        if self.view == Some(handle) {
            self.view = None;
        } else if self.output == Some(handle) {
            self.output = None;
        } else {
            return None;
        }
        Some(FocusChange {
            lost: Some(handle),
            gained: None,
        })
    }

    /// Most recently focused view other than the current one.
    pub fn previous_view(&self) -> Option<Handle> {
        self.history.first().copied()
    }
}

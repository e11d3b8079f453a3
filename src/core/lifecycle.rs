//! Global compositor lifecycle: `Starting -> Ready -> Terminating -> Stopped`.

use std::fmt;

use crate::core::errors::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LifecycleState {
    #[default]
    Starting,
    Ready,
    Terminating,
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LifecycleState::Starting => "starting",
            LifecycleState::Ready => "ready",
            LifecycleState::Terminating => "terminating",
            LifecycleState::Stopped => "stopped",
        })
    }
}

#[derive(Debug, Default)]
pub struct CompositorLifecycle {
    state: LifecycleState,
}

impl CompositorLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == LifecycleState::Ready
    }

    /// Enter `Ready`. Only legal once, from `Starting`.
    pub fn ready(&mut self) -> Result<()> {
        if self.state != LifecycleState::Starting {
            return Err(CoreError::invalid_state(format!(
                "compositor_ready while {}",
                self.state
            )));
        }
        self.state = LifecycleState::Ready;
        Ok(())
    }

    /// Enter `Terminating`. Returns `false` if already terminating.
    pub fn terminate(&mut self) -> Result<bool> {
        match self.state {
            LifecycleState::Starting | LifecycleState::Ready => {
                self.state = LifecycleState::Terminating;
                Ok(true)
            }
            LifecycleState::Terminating => Ok(false),
            LifecycleState::Stopped => Err(CoreError::invalid_state("compositor already stopped")),
        }
    }

    /// Enter `Stopped`, the terminal state.
    pub fn stop(&mut self) -> Result<()> {
        if self.state != LifecycleState::Terminating {
            return Err(CoreError::invalid_state(format!("stop while {}", self.state)));
        }
        self.state = LifecycleState::Stopped;
        Ok(())
    }

    /// Gate for operations on existing outputs and views. Destroys,
    /// focus changes and render hooks still run while terminating.
    pub fn ensure_operational(&self) -> Result<()> {
        match self.state {
            LifecycleState::Starting => Err(CoreError::NotReady),
            LifecycleState::Ready | LifecycleState::Terminating => Ok(()),
            LifecycleState::Stopped => Err(CoreError::invalid_state("compositor stopped")),
        }
    }

    /// Gate for creating outputs and views.
    pub fn ensure_accepting(&self) -> Result<()> {
        match self.state {
            LifecycleState::Starting => Err(CoreError::NotReady),
            LifecycleState::Ready => Ok(()),
            LifecycleState::Terminating | LifecycleState::Stopped => Err(CoreError::ShuttingDown),
        }
    }

    /// Gate for input device attach/detach.
    pub fn ensure_devices(&self) -> Result<()> {
        match self.state {
            LifecycleState::Stopped => Err(CoreError::invalid_state("compositor stopped")),
            _ => Ok(()),
        }
    }
}

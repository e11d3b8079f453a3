use crate::util::geometry::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonState {
    Released,
    Pressed,
}

bitflags::bitflags! {
    /// Axes carried by a scroll event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ScrollAxis: u8 {
        const VERTICAL   = 1 << 0;
        const HORIZONTAL = 1 << 1;
    }
}

/// Pointer position and button tracking for the seat.
#[derive(Debug, Clone, Default)]
pub struct PointerState {
    /// Last reported position in compositor-global coordinates
    pub position: Point,
    /// Number of buttons currently pressed (for implicit grab tracking)
    pub button_count: u32,
}

impl PointerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_button(&mut self, state: ButtonState) {
        match state {
            ButtonState::Pressed => self.button_count = self.button_count.saturating_add(1),
            ButtonState::Released => self.button_count = self.button_count.saturating_sub(1),
        }
    }

    /// Whether any button is held
    pub fn has_implicit_grab(&self) -> bool {
        self.button_count > 0
    }
}

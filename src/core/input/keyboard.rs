//! Keyboard event payload types.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyState {
    Released,
    Pressed,
}

impl From<bool> for KeyState {
    fn from(pressed: bool) -> Self {
        if pressed {
            KeyState::Pressed
        } else {
            KeyState::Released
        }
    }
}

bitflags::bitflags! {
    /// Active keyboard modifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModifierBits: u32 {
        const SHIFT = 1 << 0;
        const CAPS  = 1 << 1;
        const CTRL  = 1 << 2;
        const ALT   = 1 << 3;
        const MOD2  = 1 << 4;
        const MOD3  = 1 << 5;
        const LOGO  = 1 << 6;
        const MOD5  = 1 << 7;
    }
}

bitflags::bitflags! {
    /// Keyboard LEDs.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LedBits: u32 {
        const NUM    = 1 << 0;
        const CAPS   = 1 << 1;
        const SCROLL = 1 << 2;
    }
}

/// Modifier snapshot that accompanies an input event. Passed through, never
/// stored by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub leds: LedBits,
    pub mods: ModifierBits,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        leds: LedBits::empty(),
        mods: ModifierBits::empty(),
    };

    /// Build from raw backend bitmasks; unknown bits are dropped.
    pub fn from_raw(leds: u32, mods: u32) -> Self {
        Self {
            leds: LedBits::from_bits_truncate(leds),
            mods: ModifierBits::from_bits_truncate(mods),
        }
    }

    pub fn has(&self, mods: ModifierBits) -> bool {
        self.mods.contains(mods)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifiers_from_raw() {
        let m = Modifiers::from_raw(0b011, (1 << 2) | (1 << 31));
        assert_eq!(m.leds, LedBits::NUM | LedBits::CAPS);
        assert_eq!(m.mods, ModifierBits::CTRL);
        assert!(m.has(ModifierBits::CTRL));
        assert_eq!(Modifiers::from_raw(0, 0), Modifiers::NONE);
    }
}

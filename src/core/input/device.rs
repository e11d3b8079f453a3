//! Attached input devices.

use std::collections::BTreeSet;
use std::fmt;

use crate::core::errors::{CoreError, ObjectKind, Result};

/// Opaque identity of a backend input device.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InputDevice(pub u64);

impl fmt::Debug for InputDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InputDevice({:#x})", self.0)
    }
}

/// Devices currently attached, independent of output/view lifecycles.
#[derive(Debug, Default)]
pub struct InputDevices {
    attached: BTreeSet<InputDevice>,
}

impl InputDevices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, device: InputDevice) -> bool {
        self.attached.contains(&device)
    }

    pub fn attach(&mut self, device: InputDevice) -> Result<()> {
        if !self.attached.insert(device) {
            return Err(CoreError::invalid_state(format!(
                "{device:?} is already attached"
            )));
        }
        Ok(())
    }

    pub fn detach(&mut self, device: InputDevice) -> Result<()> {
        if !self.attached.remove(&device) {
            return Err(CoreError::NotFound {
                kind: ObjectKind::InputDevice,
                id: device.0,
            });
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = InputDevice> + '_ {
        self.attached.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.attached.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attached.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_detach() {
        let mut devices = InputDevices::new();
        devices.attach(InputDevice(7)).unwrap();
        assert!(devices.attach(InputDevice(7)).is_err());
        assert!(devices.contains(InputDevice(7)));
        devices.detach(InputDevice(7)).unwrap();
        assert_eq!(
            devices.detach(InputDevice(7)),
            Err(CoreError::NotFound {
                kind: ObjectKind::InputDevice,
                id: 7
            })
        );
        assert!(devices.is_empty());
    }
}

//! Handle allocation and the object table.
//!
//! Outputs and views share one generation-counted slot table. A handle packs
//! `slot index + 1` into the low 32 bits and the slot generation into the
//! high 32 bits, so:
//! - zero is never a valid handle,
//! - a live handle is never handed out twice,
//! - a handle to a destroyed object never resolves again, even after its
//!   slot has been recycled.

use std::fmt;

use crate::core::errors::{CoreError, ObjectKind, Result};
use crate::core::output::Output;
use crate::core::view::View;
use crate::util::logging::HANDLES;

/// Opaque 64-bit object identifier. Zero means "none".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Handle(u64);

impl Handle {
    pub const NULL: Handle = Handle(0);

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// `None` for the null handle.
    pub fn non_null(self) -> Option<Handle> {
        (!self.is_null()).then_some(self)
    }

    fn from_parts(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64 + 1))
    }

    fn index(self) -> Option<usize> {
        ((self.0 & 0xffff_ffff) as u32)
            .checked_sub(1)
            .map(|i| i as usize)
    }

    fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({:#x})", self.0)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A record stored in the table.
#[derive(Debug, Clone)]
pub enum Object {
    Output(Output),
    View(View),
}

impl Object {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::Output(_) => ObjectKind::Output,
            Object::View(_) => ObjectKind::View,
        }
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    object: Option<Object>,
}

/// Maps handles to output and view records.
#[derive(Debug, Default)]
pub struct HandleTable {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next unused handle and store the record built for it.
    pub fn create<F>(&mut self, build: F) -> Handle
    where
        F: FnOnce(Handle) -> Object,
    {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    generation: 1,
                    object: None,
                });
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        let handle = Handle::from_parts(index, slot.generation);
        slot.object = Some(build(handle));
        self.live += 1;
        tracing::trace!("[{}] Allocated handle {}", HANDLES, handle);
        handle
    }

    /// Remove the record for `handle`, retiring the handle for good.
    pub fn destroy(&mut self, handle: Handle) -> Result<Object> {
        self.take(handle, ObjectKind::Object)
    }

    pub fn get(&self, handle: Handle) -> Result<&Object> {
        self.locate(handle)
            .and_then(|i| self.slots[i].object.as_ref())
            .ok_or_else(|| CoreError::not_found(ObjectKind::Object, handle))
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.locate(handle).is_some()
    }

    pub fn output(&self, handle: Handle) -> Result<&Output> {
        match self.locate(handle).and_then(|i| self.slots[i].object.as_ref()) {
            Some(Object::Output(output)) => Ok(output),
            _ => Err(CoreError::not_found(ObjectKind::Output, handle)),
        }
    }

    pub fn output_mut(&mut self, handle: Handle) -> Result<&mut Output> {
        let index = self.locate(handle);
        match index.and_then(|i| self.slots[i].object.as_mut()) {
            Some(Object::Output(output)) => Ok(output),
            _ => Err(CoreError::not_found(ObjectKind::Output, handle)),
        }
    }

    pub fn view(&self, handle: Handle) -> Result<&View> {
        match self.locate(handle).and_then(|i| self.slots[i].object.as_ref()) {
            Some(Object::View(view)) => Ok(view),
            _ => Err(CoreError::not_found(ObjectKind::View, handle)),
        }
    }

    pub fn view_mut(&mut self, handle: Handle) -> Result<&mut View> {
        let index = self.locate(handle);
        match index.and_then(|i| self.slots[i].object.as_mut()) {
            Some(Object::View(view)) => Ok(view),
            _ => Err(CoreError::not_found(ObjectKind::View, handle)),
        }
    }

    pub fn remove_output(&mut self, handle: Handle) -> Result<Output> {
        let Object::Output(output) = self.take(handle, ObjectKind::Output)? else {
            return Err(CoreError::not_found(ObjectKind::Output, handle));
        };
        Ok(output)
    }

    pub fn remove_view(&mut self, handle: Handle) -> Result<View> {
        let Object::View(view) = self.take(handle, ObjectKind::View)? else {
            return Err(CoreError::not_found(ObjectKind::View, handle));
        };
        Ok(view)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Output> + '_ {
        self.slots.iter().filter_map(|slot| match &slot.object {
            Some(Object::Output(output)) => Some(output),
            _ => None,
        })
    }

    pub fn views(&self) -> impl Iterator<Item = &View> + '_ {
        self.slots.iter().filter_map(|slot| match &slot.object {
            Some(Object::View(view)) => Some(view),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    fn locate(&self, handle: Handle) -> Option<usize> {
        let index = handle.index()?;
        let slot = self.slots.get(index)?;
        (slot.generation == handle.generation() && slot.object.is_some()).then_some(index)
    }

    fn take(&mut self, handle: Handle, kind: ObjectKind) -> Result<Object> {
        let index = self
            .locate(handle)
            .filter(|&i| {
                kind == ObjectKind::Object
                    || self.slots[i].object.as_ref().map(Object::kind) == Some(kind)
            })
            .ok_or_else(|| CoreError::not_found(kind, handle))?;
        let slot = &mut self.slots[index];
        let object = slot
            .object
            .take()
            .ok_or_else(|| CoreError::not_found(kind, handle))?;
        slot.generation = slot.generation.wrapping_add(1);
        // A slot whose generation wrapped is retired instead of recycled.
        if slot.generation != 0 {
            self.free.push(index as u32);
        }
        self.live -= 1;
        tracing::trace!("[{}] Released handle {}", HANDLES, handle);
        Ok(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::geometry::{Geometry, Size};

    fn new_output(table: &mut HandleTable) -> Handle {
        table.create(|h| Object::Output(Output::new(h, "test", Size::new(800, 600), 1)))
    }

    #[test]
    fn test_handles_are_never_zero() {
        let mut table = HandleTable::new();
        let h = new_output(&mut table);
        assert!(!h.is_null());
        assert_eq!(Handle::NULL.non_null(), None);
        assert_eq!(h.non_null(), Some(h));
    }

    #[test]
    fn test_destroyed_handle_is_not_found() {
        let mut table = HandleTable::new();
        let h = new_output(&mut table);
        assert!(table.destroy(h).is_ok());
        assert!(matches!(table.get(h), Err(CoreError::NotFound { .. })));
        assert!(matches!(table.destroy(h), Err(CoreError::NotFound { .. })));
        assert!(table.is_empty());
    }

    #[test]
    fn test_recycled_slot_gets_new_handle() {
        let mut table = HandleTable::new();
        let first = new_output(&mut table);
        table.destroy(first).unwrap();
        let second = new_output(&mut table);
        assert_ne!(first, second);
        assert!(table.get(first).is_err());
        assert!(table.get(second).is_ok());
    }

    #[test]
    fn test_no_live_handle_is_reused() {
        let mut table = HandleTable::new();
        let mut live: Vec<Handle> = Vec::new();
        let mut seen = std::collections::HashSet::new();
        // Interleave creates and destroys so slots get recycled.
        for round in 0..200u32 {
            let h = new_output(&mut table);
            assert!(seen.insert(h), "handle {h} issued twice");
            live.push(h);
            if round % 3 == 0 {
                let victim = live.remove((round as usize * 7) % live.len());
                table.destroy(victim).unwrap();
                assert!(table.get(victim).is_err());
            }
        }
        assert_eq!(table.len(), live.len());
        for h in &live {
            assert!(table.contains(*h));
        }
    }

    #[test]
    fn test_typed_lookup_checks_kind() {
        let mut table = HandleTable::new();
        let output = new_output(&mut table);
        let view = table.create(|h| Object::View(View::new(h, output, Geometry::new(0, 0, 10, 10), 1)));

        assert!(table.output(output).is_ok());
        assert_eq!(
            table.view(output).unwrap_err(),
            CoreError::not_found(ObjectKind::View, output)
        );
        assert!(table.remove_output(view).is_err());
        assert!(table.contains(view), "failed remove must not drop the view");
        assert_eq!(table.views().count(), 1);
        assert_eq!(table.outputs().count(), 1);
    }

    #[test]
    fn test_garbage_handles_do_not_resolve() {
        let table = HandleTable::new();
        assert!(table.get(Handle::NULL).is_err());
        assert!(table.get(Handle::from_raw(u64::MAX)).is_err());
        assert!(table.get(Handle::from_raw(0x1_0000_0001)).is_err());
    }
}

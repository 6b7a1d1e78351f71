// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generational slot storage shared by the node arena and per-node recognizer slots.
//!
//! A [`SlotKey`] is a slot index plus a generation counter:
//!
//! - On insert, a fresh slot is allocated with generation `1`.
//! - On remove, the slot is freed; any key that pointed to it is now stale.
//! - On reuse of a freed slot, its generation is incremented, so stale keys never alias
//!   the new occupant.

use alloc::vec::Vec;

/// Index plus generation for a value stored in [`Slots`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct SlotKey {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

#[derive(Clone, Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// A small generational arena.
#[derive(Clone, Debug)]
pub(crate) struct Slots<T> {
    entries: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Default for Slots<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Slots<T> {
    pub(crate) const fn new() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    pub(crate) fn insert(&mut self, value: T) -> SlotKey {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.entries[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.value = Some(value);
            return SlotKey {
                index,
                generation: slot.generation,
            };
        }
        let index = u32::try_from(self.entries.len()).unwrap_or(u32::MAX);
        self.entries.push(Slot {
            generation: 1,
            value: Some(value),
        });
        SlotKey {
            index,
            generation: 1,
        }
    }

    pub(crate) fn remove(&mut self, key: SlotKey) -> Option<T> {
        let slot = self.entries.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        let value = slot.value.take()?;
        self.free.push(key.index);
        self.len -= 1;
        Some(value)
    }

    pub(crate) fn get(&self, key: SlotKey) -> Option<&T> {
        let slot = self.entries.get(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.value.as_ref()
    }

    pub(crate) fn get_mut(&mut self, key: SlotKey) -> Option<&mut T> {
        let slot = self.entries.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.value.as_mut()
    }

    pub(crate) fn contains(&self, key: SlotKey) -> bool {
        self.get(key).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Iterate live values together with their keys, in slot order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (SlotKey, &T)> + '_ {
        self.entries.iter().enumerate().filter_map(|(i, slot)| {
            let value = slot.value.as_ref()?;
            let index = u32::try_from(i).ok()?;
            Some((
                SlotKey {
                    index,
                    generation: slot.generation,
                },
                value,
            ))
        })
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (SlotKey, &mut T)> + '_ {
        self.entries.iter_mut().enumerate().filter_map(|(i, slot)| {
            let generation = slot.generation;
            let value = slot.value.as_mut()?;
            let index = u32::try_from(i).ok()?;
            Some((SlotKey { index, generation }, value))
        })
    }
}

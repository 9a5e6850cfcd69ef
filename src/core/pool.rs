use log::warn;

use crate::error::{ConfigError, PoolError};

/// Reference to a pooled entity. Stale once the entity is released.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    pub fn index(self) -> u32 {
        self.index
    }
}

#[derive(Debug)]
struct Slot<T> {
    value: T,
    generation: u32,
    live: bool,
}

/// Fixed-capacity arena. Released entities are reset to `T::default()`
/// before they can be handed out again.
#[derive(Debug)]
pub struct Pool<T: Default> {
    name: &'static str,
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
}

impl<T: Default> Pool<T> {
    pub fn new(name: &'static str, capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::EmptyPool(name));
        }
        let slots = (0..capacity)
            .map(|_| Slot { value: T::default(), generation: 0, live: false })
            .collect();
        // Reversed so the lowest index is handed out first.
        let free = (0..capacity as u32).rev().collect();
        Ok(Self { name, slots, free })
    }

    /// `None` when every entity is in use. The caller skips its spawn.
    pub fn acquire(&mut self) -> Option<Handle> {
        let Some(index) = self.free.pop() else {
            warn!(
                "Pool '{}' exhausted ({} entities in use), skipping spawn.",
                self.name,
                self.slots.len()
            );
            return None;
        };
        let slot = &mut self.slots[index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        slot.live = true;
        Some(Handle { index, generation: slot.generation })
    }

    pub fn release(&mut self, handle: Handle) -> Result<(), PoolError> {
        let Some(slot) = self.slots.get_mut(handle.index as usize) else {
            return Err(PoolError::StaleHandle { index: handle.index, generation: handle.generation });
        };
        if slot.generation != handle.generation {
            return Err(PoolError::StaleHandle { index: handle.index, generation: handle.generation });
        }
        if !slot.live {
            return Err(PoolError::AlreadyReleased {
                index: handle.index,
                generation: handle.generation,
            });
        }
        slot.live = false;
        slot.value = T::default();
        self.free.push(handle.index);
        Ok(())
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.live && s.generation == handle.generation)
            .map(|s| &s.value)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|s| s.live && s.generation == handle.generation)
            .map(|s| &mut s.value)
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn available(&self) -> usize {
        self.free.len()
    }

    pub fn in_use(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}

//! # Instance Table
//!
//! Dense array of instance slots indexed directly by id.
//!
//! The table starts at a configured capacity and doubles whenever the next
//! id would land past the end. Existing slots are preserved and the new tail
//! is filled with vacant slots.

use tracing::debug;

use super::ids::InstanceId;
use super::instance::Instance;
use crate::error::{EngineError, EngineResult};

pub(crate) struct InstanceTable {
    /// Slot 0 is the reserved "no instance" slot and is never used.
    slots: Vec<Instance>,
    next_id: u64,
    max_capacity: u64,
}

impl InstanceTable {
    pub(crate) fn new(initial_capacity: usize, max_capacity: u64) -> EngineResult<Self> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(initial_capacity)
            .map_err(|_| EngineError::Allocation {
                requested: initial_capacity,
            })?;
        slots.resize_with(initial_capacity, Instance::vacant);
        Ok(Self {
            slots,
            next_id: 1,
            max_capacity,
        })
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub(crate) const fn next_id(&self) -> InstanceId {
        InstanceId::from_raw(self.next_id)
    }

    /// Hands out the next id, growing the table first if needed.
    pub(crate) fn reserve_next(&mut self) -> EngineResult<InstanceId> {
        if self.next_id >= self.slots.len() as u64 {
            self.grow()?;
        }
        let id = InstanceId::from_raw(self.next_id);
        self.next_id += 1;
        Ok(id)
    }

    fn grow(&mut self) -> EngineResult<()> {
        let capacity = self.slots.len() as u64;
        let exhausted = EngineError::IdSpaceExhausted { capacity };
        let doubled = capacity
            .checked_mul(2)
            .filter(|&doubled| doubled <= self.max_capacity)
            .ok_or_else(|| exhausted.clone())?;
        let doubled = usize::try_from(doubled).map_err(|_| exhausted)?;

        self.slots
            .try_reserve_exact(doubled - self.slots.len())
            .map_err(|_| EngineError::Allocation { requested: doubled })?;
        self.slots.resize_with(doubled, Instance::vacant);
        debug!("instance table grown to {} slots", doubled);
        Ok(())
    }

    #[inline]
    fn slot_index(&self, id: InstanceId) -> Option<usize> {
        if id.is_none() {
            return None;
        }
        usize::try_from(id.get())
            .ok()
            .filter(|&index| index < self.slots.len())
    }

    pub(crate) fn get(&self, id: InstanceId) -> Option<&Instance> {
        let index = self.slot_index(id)?;
        Some(&self.slots[index])
    }

    pub(crate) fn get_mut(&mut self, id: InstanceId) -> Option<&mut Instance> {
        let index = self.slot_index(id)?;
        Some(&mut self.slots[index])
    }

    /// Live instances in id order.
    pub(crate) fn iter_alive(&self) -> impl Iterator<Item = &Instance> {
        self.slots.iter().skip(1).filter(|slot| slot.is_alive())
    }

    pub(crate) fn iter_alive_mut(&mut self) -> impl Iterator<Item = &mut Instance> {
        self.slots.iter_mut().skip(1).filter(|slot| slot.is_alive())
    }
}

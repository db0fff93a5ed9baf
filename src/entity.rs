// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Entity identifiers and the directory mapping them to storage locations.
//!
//! An [`EntityId`] is a generational handle: `id` names a slot, `version`
//! distinguishes the slot's current occupant from whatever previously lived
//! there. The directory recycles slots through a free list threaded through
//! the slot's own `row` field rather than a side `Vec`.

use crate::error::{EcsError, Result};

/// A stable, generational entity handle.
///
/// Two `EntityId`s compare equal only if they name the same slot *and* the
/// same occupant of that slot; a destroyed-and-recreated slot gets a new
/// `version`, so old handles to it become unresolvable rather than silently
/// aliasing the new occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId {
    pub id: u32,
    pub version: u32,
}

/// Where a live entity's components currently live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityLocation {
    pub archetype_index: usize,
    pub row: usize,
}

/// One directory slot. A live slot holds its [`EntityLocation`]; a free slot
/// repurposes the same storage to hold the index of the next free slot,
/// threading the free list through the directory itself.
#[derive(Clone, Copy)]
enum Slot {
    Occupied { version: u32, location: EntityLocation },
    Free { version: u32, next_free: Option<u32> },
}

/// Maps [`EntityId`]s to their current [`EntityLocation`], recycling freed
/// slots and bumping their version so stale handles are rejected.
#[derive(Default)]
pub struct EntityDirectory {
    slots: Vec<Slot>,
    free_head: Option<u32>,
}

impl EntityDirectory {
    pub fn new() -> Self {
        Self { slots: Vec::new(), free_head: None }
    }

    /// Allocate a fresh entity at `location`, reusing a freed slot if one is
    /// available.
    pub fn allocate(&mut self, location: EntityLocation) -> EntityId {
        if let Some(index) = self.free_head {
            let slot = &mut self.slots[index as usize];
            let version = match *slot {
                Slot::Free { version, next_free } => {
                    self.free_head = next_free;
                    version
                }
                Slot::Occupied { .. } => unreachable!("free list pointed at an occupied slot"),
            };
            *slot = Slot::Occupied { version, location };
            EntityId { id: index, version }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot::Occupied { version: 1, location });
            EntityId { id: index, version: 1 }
        }
    }

    /// Resolve `entity` to its current location.
    ///
    /// # Errors
    /// [`EcsError::EntityNotFound`] if `entity.id` is out of range, the slot
    /// is free, or `entity.version` doesn't match the slot's current
    /// occupant.
    pub fn locate(&self, entity: EntityId) -> Result<EntityLocation> {
        match self.slots.get(entity.id as usize) {
            Some(Slot::Occupied { version, location }) if *version == entity.version => {
                Ok(*location)
            }
            _ => Err(EcsError::EntityNotFound),
        }
    }

    /// Update the location recorded for a live `entity`.
    ///
    /// # Errors
    /// [`EcsError::EntityNotFound`] under the same conditions as
    /// [`EntityDirectory::locate`].
    pub fn set_location(&mut self, entity: EntityId, location: EntityLocation) -> Result<()> {
        match self.slots.get_mut(entity.id as usize) {
            Some(slot @ Slot::Occupied { .. }) => {
                let version = match *slot {
                    Slot::Occupied { version, .. } => version,
                    Slot::Free { .. } => unreachable!(),
                };
                if version != entity.version {
                    return Err(EcsError::EntityNotFound);
                }
                *slot = Slot::Occupied { version, location };
                Ok(())
            }
            _ => Err(EcsError::EntityNotFound),
        }
    }

    /// Free `entity`'s slot, bumping its version so any outstanding handle to
    /// it becomes stale. A version that would wrap to `0` skips ahead to `1`
    /// instead, since `0` is never a valid occupant version.
    ///
    /// # Errors
    /// [`EcsError::EntityNotFound`] under the same conditions as
    /// [`EntityDirectory::locate`].
    pub fn release(&mut self, entity: EntityId) -> Result<()> {
        let current_version = match self.slots.get(entity.id as usize) {
            Some(Slot::Occupied { version, .. }) if *version == entity.version => *version,
            _ => return Err(EcsError::EntityNotFound),
        };
        let next_version = match current_version.wrapping_add(1) {
            0 => 1,
            v => v,
        };
        self.slots[entity.id as usize] = Slot::Free {
            version: next_version,
            next_free: self.free_head,
        };
        self.free_head = Some(entity.id);
        Ok(())
    }

    /// `true` iff `entity` currently resolves to a live location.
    pub fn is_live(&self, entity: EntityId) -> bool {
        self.locate(entity).is_ok()
    }

    /// Number of currently live entities.
    pub fn live_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Occupied { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(row: usize) -> EntityLocation {
        EntityLocation { archetype_index: 0, row }
    }

    #[test]
    fn allocate_then_locate_round_trips() {
        let mut dir = EntityDirectory::new();
        let e = dir.allocate(loc(0));
        assert_eq!(dir.locate(e).unwrap(), loc(0));
    }

    #[test]
    fn released_slot_is_recycled_with_bumped_version() {
        let mut dir = EntityDirectory::new();
        let e0 = dir.allocate(loc(0));
        dir.release(e0).unwrap();

        let e1 = dir.allocate(loc(1));
        assert_eq!(e1.id, e0.id);
        assert_ne!(e1.version, e0.version);
    }

    #[test]
    fn stale_handle_after_release_is_not_found() {
        let mut dir = EntityDirectory::new();
        let e0 = dir.allocate(loc(0));
        dir.release(e0).unwrap();
        assert!(matches!(dir.locate(e0), Err(EcsError::EntityNotFound)));
    }

    #[test]
    fn stale_handle_after_recycle_does_not_alias_new_occupant() {
        let mut dir = EntityDirectory::new();
        let e0 = dir.allocate(loc(0));
        dir.release(e0).unwrap();
        let _e1 = dir.allocate(loc(1));
        assert!(matches!(dir.locate(e0), Err(EcsError::EntityNotFound)));
    }

    #[test]
    fn set_location_updates_live_entity() {
        let mut dir = EntityDirectory::new();
        let e = dir.allocate(loc(0));
        dir.set_location(e, loc(5)).unwrap();
        assert_eq!(dir.locate(e).unwrap(), loc(5));
    }

    #[test]
    fn unknown_id_is_not_found() {
        let dir = EntityDirectory::new();
        assert!(matches!(
            dir.locate(EntityId { id: 0, version: 1 }),
            Err(EcsError::EntityNotFound)
        ));
    }

    #[test]
    fn version_wrap_skips_zero() {
        // Seed a slot directly at the version just before wraparound rather
        // than cycling release/allocate u32::MAX times.
        let mut dir = EntityDirectory::new();
        dir.slots.push(Slot::Occupied { version: u32::MAX, location: loc(0) });
        let e = EntityId { id: 0, version: u32::MAX };

        dir.release(e).unwrap();
        let after_wrap = dir.allocate(loc(0));
        assert_eq!(after_wrap.id, 0);
        assert_eq!(after_wrap.version, 1);
    }

    #[test]
    fn live_count_tracks_allocate_and_release() {
        let mut dir = EntityDirectory::new();
        let e0 = dir.allocate(loc(0));
        let _e1 = dir.allocate(loc(1));
        assert_eq!(dir.live_count(), 2);
        dir.release(e0).unwrap();
        assert_eq!(dir.live_count(), 1);
    }
}

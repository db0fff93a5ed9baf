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

//! World: the coordinator entities, archetypes, and event channels live on.

use std::cell::Cell;

use rustc_hash::FxHashMap;

#[cfg(feature = "profiling")]
use tracing::info_span;

use crate::archetype::Archetype;
use crate::bridge::{EntityDestroyedIntent, EntitySpawnedIntent};
use crate::component::{Component, ComponentId, ComponentRegistry};
use crate::entity::{EntityDirectory, EntityId, EntityLocation};
use crate::error::{EcsError, Result};
use crate::event::EventChannels;
use crate::signature::Signature;

/// Construction-time tunables. Everything here has a sensible default; most
/// callers never touch this struct directly.
#[derive(Debug, Clone, Copy)]
pub struct WorldConfig {
    /// Archetype table capacity reserved up front.
    pub initial_archetype_capacity: usize,
    /// Per-event-type channel depth before publishes are dropped with a
    /// warning (see [`crate::event::EventChannels`]).
    pub event_channel_capacity: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            initial_archetype_capacity: 64,
            event_channel_capacity: 1024,
        }
    }
}

/// Central entity/component/archetype store.
///
/// A `World` owns every entity's location, every archetype's storage, and
/// the event channels systems use to signal each other within a tick. It has
/// no notion of systems or scheduling itself -- see [`crate::schedule::Schedule`].
pub struct World {
    entities: EntityDirectory,
    archetypes: Vec<Archetype>,
    archetype_index: FxHashMap<Signature, usize>,
    /// Cached archetype graph edges: `(archetype_index, component_id, is_add)
    /// -> destination archetype_index`, so repeated add/remove of the same
    /// component kind skips the signature-rebuild-and-lookup step.
    transitions: FxHashMap<(usize, ComponentId, bool), usize>,
    events: EventChannels,
    /// Raised for the lifetime of an open query walk; mutating methods
    /// assert it is clear so a structural mutation mid-iteration panics
    /// loudly in debug builds instead of corrupting archetype rows.
    #[cfg(debug_assertions)]
    iterating: Cell<bool>,
}

impl World {
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    pub fn with_config(config: WorldConfig) -> Self {
        let mut archetypes = Vec::with_capacity(config.initial_archetype_capacity);
        let mut archetype_index = FxHashMap::default();
        // The empty archetype (no components) always lives at index 0.
        archetypes.push(Archetype::new(Signature::empty()));
        archetype_index.insert(Signature::empty(), 0);

        Self {
            entities: EntityDirectory::new(),
            archetypes,
            archetype_index,
            transitions: FxHashMap::default(),
            events: EventChannels::with_capacity(config.event_channel_capacity),
            #[cfg(debug_assertions)]
            iterating: Cell::new(false),
        }
    }

    #[cfg(debug_assertions)]
    fn assert_not_iterating(&self) {
        assert!(
            !self.iterating.get(),
            "structural mutation attempted during an open query iteration"
        );
    }

    #[cfg(not(debug_assertions))]
    fn assert_not_iterating(&self) {}

    pub(crate) fn begin_iteration(&self) {
        #[cfg(debug_assertions)]
        {
            self.assert_not_iterating();
            self.iterating.set(true);
        }
    }

    pub(crate) fn end_iteration(&self) {
        #[cfg(debug_assertions)]
        self.iterating.set(false);
    }

    fn get_or_create_archetype(&mut self, signature: Signature) -> usize {
        if let Some(&id) = self.archetype_index.get(&signature) {
            return id;
        }
        let archetype = Archetype::new(signature.clone());
        self.archetypes.push(archetype);
        let id = self.archetypes.len() - 1;
        self.archetype_index.insert(signature, id);
        id
    }

    /// Create a new entity with no components, placed in the empty archetype.
    pub fn create_entity(&mut self) -> EntityId {
        self.assert_not_iterating();
        #[cfg(feature = "profiling")]
        let span = info_span!("world.create_entity");
        #[cfg(feature = "profiling")]
        let _guard = span.enter();

        // The directory must mint the entity handle before the archetype can
        // store it, so allocate with a placeholder location and fix it up
        // once the real row is known.
        let placeholder = EntityLocation { archetype_index: 0, row: usize::MAX };
        let entity = self.entities.allocate(placeholder);
        let row = self.archetypes[0].add_entity(entity);
        self.entities
            .set_location(entity, EntityLocation { archetype_index: 0, row })
            .expect("entity was just allocated");
        self.publish_event(EntitySpawnedIntent { entity });
        entity
    }

    /// Remove `entity` and every component it carries.
    ///
    /// A stale or already-destroyed `entity` is a silent no-op, not an error.
    pub fn destroy_entity(&mut self, entity: EntityId) -> Result<()> {
        self.assert_not_iterating();
        let location = match self.entities.locate(entity) {
            Ok(location) => location,
            Err(EcsError::EntityNotFound) => return Ok(()),
            Err(other) => return Err(other),
        };
        let archetype = &mut self.archetypes[location.archetype_index];
        if let Some(moved) = archetype.remove_row(location.row) {
            self.entities.set_location(moved, location)?;
        }
        self.entities.release(entity)?;
        self.publish_event(EntityDestroyedIntent { entity });
        Ok(())
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.entities.is_live(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.live_count()
    }

    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    pub(crate) fn archetypes(&self) -> &[Archetype] {
        &self.archetypes
    }

    /// Read `T` off `entity`.
    pub fn get_component<T: Component>(&self, entity: EntityId) -> Result<&T> {
        let location = self.entities.locate(entity)?;
        self.archetypes[location.archetype_index].read_component::<T>(location.row)
    }

    /// Mutably access `T` on `entity`.
    pub fn get_component_mut<T: Component>(&mut self, entity: EntityId) -> Result<&mut T> {
        let location = self.entities.locate(entity)?;
        self.archetypes[location.archetype_index].read_component_mut::<T>(location.row)
    }

    pub fn has_component<T: Component>(&self, entity: EntityId) -> bool {
        match self.entities.locate(entity) {
            Ok(location) => {
                let id = ComponentRegistry::id_of::<T>();
                self.archetypes[location.archetype_index].signature().contains(id)
            }
            Err(_) => false,
        }
    }

    /// Attach `component` to `entity`, moving it to the archetype for its
    /// new signature. Overwrites in place if `entity` already carries `T`.
    pub fn add_component<T: Component>(&mut self, entity: EntityId, component: T) -> Result<()> {
        self.assert_not_iterating();
        #[cfg(feature = "profiling")]
        let span = info_span!("world.add_component", component = std::any::type_name::<T>());
        #[cfg(feature = "profiling")]
        let _guard = span.enter();

        let location = self.entities.locate(entity)?;
        let id = ComponentRegistry::id_of::<T>();
        let old_signature = self.archetypes[location.archetype_index].signature().clone();

        if old_signature.contains(id) {
            *self.archetypes[location.archetype_index].read_component_mut::<T>(location.row)? =
                component;
            return Ok(());
        }

        let new_index = match self.transitions.get(&(location.archetype_index, id, true)) {
            Some(&idx) => idx,
            None => {
                let new_signature = old_signature.add(id);
                let idx = self.get_or_create_archetype(new_signature);
                self.transitions.insert((location.archetype_index, id, true), idx);
                idx
            }
        };

        let (old_row, new_row, moved_entity) =
            self.relocate(location.archetype_index, location.row, new_index);
        if let Some(moved) = moved_entity {
            self.entities.set_location(
                moved,
                EntityLocation { archetype_index: location.archetype_index, row: old_row },
            )?;
        }
        self.archetypes[new_index].write_component(new_row, component)?;
        self.entities
            .set_location(entity, EntityLocation { archetype_index: new_index, row: new_row })
    }

    /// Detach `T` from `entity`, moving it to the archetype for its reduced
    /// signature. The removed value is dropped.
    pub fn remove_component<T: Component>(&mut self, entity: EntityId) -> Result<()> {
        self.assert_not_iterating();
        #[cfg(feature = "profiling")]
        let span = info_span!("world.remove_component", component = std::any::type_name::<T>());
        #[cfg(feature = "profiling")]
        let _guard = span.enter();

        let location = self.entities.locate(entity)?;
        let id = ComponentRegistry::id_of::<T>();
        let old_signature = self.archetypes[location.archetype_index].signature().clone();

        if !old_signature.contains(id) {
            return Err(EcsError::ComponentNotInArchetype);
        }

        let new_index = match self.transitions.get(&(location.archetype_index, id, false)) {
            Some(&idx) => idx,
            None => {
                let new_signature = old_signature.remove(id);
                let idx = self.get_or_create_archetype(new_signature);
                self.transitions.insert((location.archetype_index, id, false), idx);
                idx
            }
        };

        let (old_row, new_row, moved_entity) =
            self.relocate(location.archetype_index, location.row, new_index);
        if let Some(moved) = moved_entity {
            self.entities.set_location(
                moved,
                EntityLocation { archetype_index: location.archetype_index, row: old_row },
            )?;
        }
        self.entities.set_location(entity, EntityLocation { archetype_index: new_index, row: new_row })
    }

    /// Relocate the row at `(src_index, src_row)` into `dest_index`,
    /// returning `(src_row, dest_row, entity_swapped_into_src_row)`.
    fn relocate(&mut self, src_index: usize, src_row: usize, dest_index: usize) -> (usize, usize, Option<EntityId>) {
        let (src_arch, dest_arch) = if src_index < dest_index {
            let (left, right) = self.archetypes.split_at_mut(dest_index);
            (&mut left[src_index], &mut right[0])
        } else {
            let (left, right) = self.archetypes.split_at_mut(src_index);
            (&mut right[0], &mut left[dest_index])
        };
        let (dest_row, moved_entity) = src_arch.relocate_row(src_row, dest_arch);
        (src_row, dest_row, moved_entity)
    }

    /// Publish an event on `T`'s channel.
    pub fn publish_event<T: Send + Sync + 'static>(&mut self, event: T) {
        self.events.publish(event);
    }

    /// Drain every queued `T` event, oldest first.
    pub fn drain_events<T: Send + Sync + 'static>(&mut self) -> Vec<T> {
        self.events.drain::<T>()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

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

//! Component queries over a [`World`]'s archetypes.
//!
//! A [`Query`] is a fluent `with`/`without` filter over component kinds; its
//! `chunks` produce one [`Chunk`] per matching, non-empty archetype. Chunk
//! enumeration order is whatever order archetypes were created in -- stable
//! for a given sequence of `World` operations, not specified beyond that.

use crate::archetype::Archetype;
use crate::component::{Component, ComponentId, ComponentRegistry};
use crate::entity::EntityId;
use crate::signature::Signature;
use crate::world::World;

/// A filter over component signatures: every `with` id must be present,
/// every `without` id must be absent.
#[derive(Clone, Debug, Default)]
pub struct Query {
    with: Signature,
    without: Signature,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require component kind `T`.
    pub fn with<T: Component>(mut self) -> Self {
        self.with = self.with.add(ComponentRegistry::id_of::<T>());
        self
    }

    /// Require absence of component kind `T`.
    pub fn without<T: Component>(mut self) -> Self {
        self.without = self.without.add(ComponentRegistry::id_of::<T>());
        self
    }

    /// Same as [`Query::with`] but by [`ComponentId`], for callers without a
    /// compile-time type (e.g. snapshot replay).
    pub fn with_id(mut self, id: ComponentId) -> Self {
        self.with = self.with.add(id);
        self
    }

    pub fn without_id(mut self, id: ComponentId) -> Self {
        self.without = self.without.add(id);
        self
    }

    fn matches(&self, signature: &Signature) -> bool {
        self.with.is_subset_of(signature) && self.without.is_disjoint(signature)
    }

    /// Walk every non-empty archetype matching this filter.
    ///
    /// The returned iterator raises `world`'s re-entrancy guard for its own
    /// lifetime: any structural mutation attempted through `world` while a
    /// `ChunkIter` from it is still alive panics in debug builds.
    pub fn chunks<'w>(&self, world: &'w World) -> ChunkIter<'w> {
        world.begin_iteration();
        let matches: Vec<&'w Archetype> = world
            .archetypes()
            .iter()
            .filter(|a| !a.is_empty() && self.matches(a.signature()))
            .collect();
        ChunkIter { matches: matches.into_iter(), world }
    }
}

/// One matching archetype's rows, borrowed for the lifetime of the
/// enclosing [`ChunkIter`].
pub struct Chunk<'w> {
    archetype: &'w Archetype,
}

impl<'w> Chunk<'w> {
    pub fn len(&self) -> usize {
        self.archetype.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archetype.is_empty()
    }

    pub fn entities(&self) -> &'w [EntityId] {
        self.archetype.entities()
    }

    /// Borrow the whole `T` column for this chunk, if the archetype carries
    /// one; `None` only for a filter that didn't request `T`.
    pub fn column<T: Component>(&self) -> Option<&'w [T]> {
        self.archetype.column_span::<T>()
    }
}

/// Iterator over the archetypes a [`Query`] matched, produced by
/// [`Query::chunks`]. Dropping it clears the owning world's iteration guard.
pub struct ChunkIter<'w> {
    matches: std::vec::IntoIter<&'w Archetype>,
    world: &'w World,
}

impl<'w> Iterator for ChunkIter<'w> {
    type Item = Chunk<'w>;

    fn next(&mut self) -> Option<Chunk<'w>> {
        self.matches.next().map(|archetype| Chunk { archetype })
    }
}

impl Drop for ChunkIter<'_> {
    fn drop(&mut self) {
        self.world.end_iteration();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Velocity(f32);

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Frozen;

    #[test]
    fn query_matches_only_archetypes_with_every_required_component() {
        let mut world = World::new();
        let moving = world.create_entity();
        world.add_component(moving, Position { x: 0.0, y: 0.0 }).unwrap();
        world.add_component(moving, Velocity(1.0)).unwrap();

        let still = world.create_entity();
        world.add_component(still, Position { x: 1.0, y: 1.0 }).unwrap();

        let query = Query::new().with::<Position>().with::<Velocity>();
        let entities: Vec<EntityId> =
            query.chunks(&world).flat_map(|c| c.entities().to_vec()).collect();
        assert_eq!(entities, vec![moving]);
    }

    #[test]
    fn without_filter_excludes_archetypes_carrying_it() {
        let mut world = World::new();
        let active = world.create_entity();
        world.add_component(active, Position { x: 0.0, y: 0.0 }).unwrap();

        let frozen = world.create_entity();
        world.add_component(frozen, Position { x: 0.0, y: 0.0 }).unwrap();
        world.add_component(frozen, Frozen).unwrap();

        let query = Query::new().with::<Position>().without::<Frozen>();
        let entities: Vec<EntityId> =
            query.chunks(&world).flat_map(|c| c.entities().to_vec()).collect();
        assert_eq!(entities, vec![active]);
    }

    #[test]
    fn empty_archetypes_are_skipped() {
        let mut world = World::new();
        let e = world.create_entity();
        world.add_component(e, Position { x: 0.0, y: 0.0 }).unwrap();
        world.destroy_entity(e).unwrap();

        let query = Query::new().with::<Position>();
        assert_eq!(query.chunks(&world).count(), 0);
    }

    #[test]
    fn chunk_column_exposes_component_values() {
        let mut world = World::new();
        let e = world.create_entity();
        world.add_component(e, Position { x: 3.0, y: 4.0 }).unwrap();

        let query = Query::new().with::<Position>();
        let chunk = query.chunks(&world).next().unwrap();
        assert_eq!(chunk.column::<Position>().unwrap(), &[Position { x: 3.0, y: 4.0 }]);
    }

    #[test]
    #[should_panic(expected = "structural mutation")]
    fn structural_mutation_during_iteration_panics_in_debug() {
        let mut world = World::new();
        let e = world.create_entity();
        world.add_component(e, Position { x: 0.0, y: 0.0 }).unwrap();

        let query = Query::new().with::<Position>();
        let _iter = query.chunks(&world);
        world.begin_iteration();
    }
}

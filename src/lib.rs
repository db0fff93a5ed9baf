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

//! Archetype ECS - a deterministic, single-threaded Entity Component System
//! core.
//!
//! Entities are generational handles into an [`entity::EntityDirectory`];
//! their components live in structure-of-arrays storage grouped by
//! [`archetype::Archetype`], one per distinct set of component kinds.
//! Systems are scheduled deterministically by [`schedule::Schedule`] and talk
//! to the outside world only through [`bridge::VisualBridge`] and
//! [`snapshot`].

pub mod archetype;
pub mod bridge;
pub mod component;
pub mod entity;
pub mod error;
pub mod event;
pub mod query;
pub mod schedule;
pub mod signature;
pub mod snapshot;
pub mod system;
pub mod world;

pub mod prelude;

pub use archetype::Archetype;
pub use bridge::{
    AnimationTriggeredIntent, EntityDestroyedIntent, EntitySpawnedIntent, HealthChangedIntent,
    IntentProcessor, NullBridge, PositionChangedIntent, SoundTriggeredIntent, VisualBridge,
};
pub use component::{Component, ComponentId, ComponentLayout, ComponentRegistry, MAX_COMPONENT_KINDS};
pub use entity::{EntityDirectory, EntityId, EntityLocation};
pub use error::{EcsError, Result};
pub use event::EventChannels;
pub use query::{Chunk, ChunkIter, Query};
pub use schedule::{Schedule, SystemId, SystemProfiler, SystemStats};
pub use signature::Signature;
pub use snapshot::SnapshotRegistry;
pub use system::{Phase, System};
pub use world::{World, WorldConfig};

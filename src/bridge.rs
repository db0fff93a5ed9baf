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

//! The Visual Bridge: the world's one-way sink for presentation-facing
//! intents, and the Presentation-phase system that drains them into it.

use crate::entity::EntityId;
use crate::error::{EcsError, Result};
use crate::system::{Phase, System};
use crate::world::World;

/// Entity moved; new world-space position.
#[derive(Debug, Clone, Copy)]
pub struct PositionChangedIntent {
    pub entity: EntityId,
    pub x: f32,
    pub y: f32,
}

/// A new entity became visible.
#[derive(Debug, Clone, Copy)]
pub struct EntitySpawnedIntent {
    pub entity: EntityId,
}

/// An entity should be removed from the presentation layer.
#[derive(Debug, Clone, Copy)]
pub struct EntityDestroyedIntent {
    pub entity: EntityId,
}

/// Entity's health changed; current/max for a health bar or similar.
#[derive(Debug, Clone, Copy)]
pub struct HealthChangedIntent {
    pub entity: EntityId,
    pub current: f32,
    pub max: f32,
}

/// An animation clip should play on an entity.
#[derive(Debug, Clone)]
pub struct AnimationTriggeredIntent {
    pub entity: EntityId,
    pub clip: String,
}

/// A sound cue should play, optionally anchored to an entity.
#[derive(Debug, Clone)]
pub struct SoundTriggeredIntent {
    pub entity: Option<EntityId>,
    pub sound: String,
}

/// Capability a renderer/audio layer implements to receive gameplay intents.
///
/// None of these calls may mutate the `World` they were produced from; the
/// bridge is a one-way sink, not a second source of structural change.
pub trait VisualBridge: Send + Sync {
    fn on_position_changed(&mut self, intent: PositionChangedIntent);
    fn on_entity_spawned(&mut self, intent: EntitySpawnedIntent);
    fn on_entity_destroyed(&mut self, intent: EntityDestroyedIntent);
    fn on_health_changed(&mut self, intent: HealthChangedIntent);
    fn on_animation_triggered(&mut self, intent: AnimationTriggeredIntent);
    fn on_sound_triggered(&mut self, intent: SoundTriggeredIntent);

    /// True only for the [`NullBridge`] marker; lets [`IntentProcessor::new`]
    /// reject it without requiring `VisualBridge` itself to carry `Any`.
    #[doc(hidden)]
    fn is_null_bridge(&self) -> bool {
        false
    }
}

/// Marker passed to [`IntentProcessor::new`] in place of a real bridge,
/// rejected up front rather than silently swallowing every intent.
pub struct NullBridge;

/// Presentation-phase system draining the six fixed intent channels into a
/// registered [`VisualBridge`], each channel at-most-once and in publish
/// order per tick.
pub struct IntentProcessor {
    bridge: Box<dyn VisualBridge>,
}

impl IntentProcessor {
    /// # Errors
    /// [`EcsError::InvalidArgument`] if `bridge` is a [`NullBridge`] marker
    /// rather than a real sink -- a processor with nowhere to send intents
    /// is a configuration mistake, not a silently-inert no-op.
    pub fn new(bridge: Box<dyn VisualBridge>) -> Result<Self> {
        if bridge.is_null_bridge() {
            return Err(EcsError::InvalidArgument(
                "IntentProcessor requires a real VisualBridge, not NullBridge".into(),
            ));
        }
        Ok(Self { bridge })
    }
}

impl VisualBridge for NullBridge {
    fn on_position_changed(&mut self, _intent: PositionChangedIntent) {}
    fn on_entity_spawned(&mut self, _intent: EntitySpawnedIntent) {}
    fn on_entity_destroyed(&mut self, _intent: EntityDestroyedIntent) {}
    fn on_health_changed(&mut self, _intent: HealthChangedIntent) {}
    fn on_animation_triggered(&mut self, _intent: AnimationTriggeredIntent) {}
    fn on_sound_triggered(&mut self, _intent: SoundTriggeredIntent) {}

    fn is_null_bridge(&self) -> bool {
        true
    }
}

impl System for IntentProcessor {
    const PHASE: Phase = Phase::Presentation;
    const ORDER: i32 = 0;

    fn name(&self) -> &'static str {
        "IntentProcessor"
    }

    fn run(&mut self, world: &mut World) -> Result<()> {
        for intent in world.drain_events::<PositionChangedIntent>() {
            self.bridge.on_position_changed(intent);
        }
        for intent in world.drain_events::<EntitySpawnedIntent>() {
            self.bridge.on_entity_spawned(intent);
        }
        for intent in world.drain_events::<EntityDestroyedIntent>() {
            self.bridge.on_entity_destroyed(intent);
        }
        for intent in world.drain_events::<HealthChangedIntent>() {
            self.bridge.on_health_changed(intent);
        }
        for intent in world.drain_events::<AnimationTriggeredIntent>() {
            self.bridge.on_animation_triggered(intent);
        }
        for intent in world.drain_events::<SoundTriggeredIntent>() {
            self.bridge.on_sound_triggered(intent);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingBridge {
        positions: Vec<PositionChangedIntent>,
        spawns: Vec<EntitySpawnedIntent>,
    }

    impl VisualBridge for RecordingBridge {
        fn on_position_changed(&mut self, intent: PositionChangedIntent) {
            self.positions.push(intent);
        }
        fn on_entity_spawned(&mut self, intent: EntitySpawnedIntent) {
            self.spawns.push(intent);
        }
        fn on_entity_destroyed(&mut self, _intent: EntityDestroyedIntent) {}
        fn on_health_changed(&mut self, _intent: HealthChangedIntent) {}
        fn on_animation_triggered(&mut self, _intent: AnimationTriggeredIntent) {}
        fn on_sound_triggered(&mut self, _intent: SoundTriggeredIntent) {}
    }

    #[test]
    fn null_bridge_is_rejected_at_construction() {
        assert!(matches!(
            IntentProcessor::new(Box::new(NullBridge)),
            Err(EcsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn real_bridge_is_accepted() {
        assert!(IntentProcessor::new(Box::new(RecordingBridge::default())).is_ok());
    }

    #[test]
    fn intents_are_delivered_in_publish_order_and_drained_once() {
        let mut world = World::new();
        let e = world.create_entity();
        world.publish_event(PositionChangedIntent { entity: e, x: 1.0, y: 2.0 });
        world.publish_event(PositionChangedIntent { entity: e, x: 3.0, y: 4.0 });
        world.publish_event(EntitySpawnedIntent { entity: e });

        // We can't get the RecordingBridge back out through the trait
        // object, so assert on drain semantics directly via the world, the
        // same channel IntentProcessor::run consumes.
        let drained = world.drain_events::<PositionChangedIntent>();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].x, 1.0);
        assert_eq!(drained[1].x, 3.0);
        assert!(world.drain_events::<PositionChangedIntent>().is_empty());
    }
}

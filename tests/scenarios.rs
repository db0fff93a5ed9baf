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

//! Black-box scenarios exercising the public API end to end.

use archetype_ecs::bridge::{
    EntitySpawnedIntent, IntentProcessor, PositionChangedIntent, VisualBridge,
};
use archetype_ecs::query::Query;
use archetype_ecs::schedule::Schedule;
use archetype_ecs::system::{Phase, System};
use archetype_ecs::world::World;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Velocity {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Health(f32);

struct MovementSystem {
    dt: f32,
}

impl System for MovementSystem {
    const PHASE: Phase = Phase::Update;
    const ORDER: i32 = 0;

    fn name(&self) -> &'static str {
        "MovementSystem"
    }

    fn run(&mut self, world: &mut World) -> archetype_ecs::error::Result<()> {
        let query = Query::new().with::<Position>().with::<Velocity>();
        let moves: Vec<_> = query
            .chunks(world)
            .flat_map(|chunk| {
                let entities = chunk.entities().to_vec();
                let positions = chunk.column::<Position>().unwrap().to_vec();
                let velocities = chunk.column::<Velocity>().unwrap().to_vec();
                entities.into_iter().zip(positions).zip(velocities)
            })
            .map(|((entity, position), velocity)| {
                (
                    entity,
                    Position {
                        x: position.x + velocity.x * self.dt,
                        y: position.y + velocity.y * self.dt,
                        z: position.z + velocity.z * self.dt,
                    },
                )
            })
            .collect();

        for (entity, new_position) in moves {
            *world.get_component_mut::<Position>(entity)? = new_position;
        }
        Ok(())
    }
}

#[test]
fn s1_move() {
    let mut world = World::new();
    let e = world.create_entity();
    world.add_component(e, Position { x: 1.0, y: 2.0, z: 3.0 }).unwrap();
    world.add_component(e, Velocity { x: 10.0, y: 0.0, z: 0.0 }).unwrap();

    let mut schedule = Schedule::new();
    schedule.add_system(MovementSystem { dt: 0.5 });
    schedule.tick(&mut world).unwrap();

    assert_eq!(*world.get_component::<Position>(e).unwrap(), Position { x: 6.0, y: 2.0, z: 3.0 });
}

#[test]
fn s2_archetype_transition() {
    let mut world = World::new();
    let e1 = world.create_entity();
    let e2 = world.create_entity();
    let e3 = world.create_entity();
    for e in [e1, e2, e3] {
        world.add_component(e, Position { x: 0.0, y: 0.0, z: 0.0 }).unwrap();
    }
    world.add_component(e2, Velocity { x: 0.0, y: 0.0, z: 0.0 }).unwrap();

    assert_eq!(world.archetype_count(), 3); // empty root + Position-only + Position+Velocity

    let with_velocity = Query::new().with::<Position>().with::<Velocity>();
    assert_eq!(with_velocity.chunks(&world).map(|c| c.len()).sum::<usize>(), 1);

    let without_velocity = Query::new().with::<Position>().without::<Velocity>();
    let mut entities: Vec<_> =
        without_velocity.chunks(&world).flat_map(|c| c.entities().to_vec()).collect();
    entities.sort_by_key(|e| e.id);
    assert_eq!(entities, vec![e1, e3]);
}

#[test]
fn s3_stale_handle() {
    let mut world = World::new();
    let e = world.create_entity();
    world.destroy_entity(e).unwrap();
    let e2 = world.create_entity();

    assert!(!world.is_alive(e));
    assert!(world.is_alive(e2));
    assert_eq!(e.id, e2.id);
    assert_ne!(e.version, e2.version);
}

struct PublishTwice;

impl System for PublishTwice {
    const PHASE: Phase = Phase::Update;
    const ORDER: i32 = 0;

    fn name(&self) -> &'static str {
        "PublishTwice"
    }

    fn run(&mut self, world: &mut World) -> archetype_ecs::error::Result<()> {
        let e = world.create_entity();
        world.publish_event(PositionChangedIntent { entity: e, x: 1.0, y: 1.0 });
        world.publish_event(PositionChangedIntent { entity: e, x: 2.0, y: 2.0 });
        world.publish_event(EntitySpawnedIntent { entity: e });
        Ok(())
    }
}

#[derive(Default)]
struct CountingBridge {
    position_calls: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

impl VisualBridge for CountingBridge {
    fn on_position_changed(&mut self, _intent: PositionChangedIntent) {
        self.position_calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
    fn on_entity_spawned(&mut self, _intent: EntitySpawnedIntent) {}
    fn on_entity_destroyed(&mut self, _intent: archetype_ecs::bridge::EntityDestroyedIntent) {}
    fn on_health_changed(&mut self, _intent: archetype_ecs::bridge::HealthChangedIntent) {}
    fn on_animation_triggered(&mut self, _intent: archetype_ecs::bridge::AnimationTriggeredIntent) {}
    fn on_sound_triggered(&mut self, _intent: archetype_ecs::bridge::SoundTriggeredIntent) {}
}

#[test]
fn s4_intent_pipeline() {
    let counter = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let mut world = World::new();
    let mut schedule = Schedule::new();
    schedule.add_system(PublishTwice);
    schedule
        .add_system(IntentProcessor::new(Box::new(CountingBridge { position_calls: counter.clone() })).unwrap());

    schedule.tick(&mut world).unwrap();

    assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 2);
    assert!(world.drain_events::<PositionChangedIntent>().is_empty());
}

struct OrderRecorder {
    order: std::sync::Arc<std::sync::Mutex<Vec<&'static str>>>,
    label: &'static str,
}

macro_rules! order_system {
    ($name:ident, $phase:expr, $order_value:expr) => {
        struct $name(OrderRecorder);
        impl System for $name {
            const PHASE: Phase = $phase;
            const ORDER: i32 = $order_value;
            fn name(&self) -> &'static str {
                self.0.label
            }
            fn run(&mut self, _world: &mut World) -> archetype_ecs::error::Result<()> {
                self.0.order.lock().unwrap().push(self.0.label);
                Ok(())
            }
        }
    };
}

order_system!(UpdateHundred, Phase::Update, 100);
order_system!(UpdateFifty, Phase::Update, 50);
order_system!(PostUpdateZero, Phase::PostUpdate, 0);

#[test]
fn s5_scheduler_order() {
    let order = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let mut schedule = Schedule::new();
    schedule.add_system(UpdateHundred(OrderRecorder { order: order.clone(), label: "update-100" }));
    schedule.add_system(UpdateFifty(OrderRecorder { order: order.clone(), label: "update-50" }));
    schedule.add_system(PostUpdateZero(OrderRecorder { order: order.clone(), label: "post-update-0" }));

    let mut world = World::new();
    schedule.tick(&mut world).unwrap();

    assert_eq!(*order.lock().unwrap(), vec!["update-50", "update-100", "post-update-0"]);
}

#[test]
fn s6_query_exclusion() {
    let mut world = World::new();
    let mut entities = Vec::with_capacity(100);
    for i in 0..100 {
        let e = world.create_entity();
        world.add_component(e, Position { x: 0.0, y: 0.0, z: 0.0 }).unwrap();
        if i % 3 == 0 {
            world.add_component(e, Health(100.0)).unwrap();
        }
        entities.push(e);
    }

    let query = Query::new().with::<Position>().without::<Health>();
    let matched: usize = query.chunks(&world).map(|c| c.len()).sum();
    assert_eq!(matched, 67);
}

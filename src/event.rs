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

//! Typed event channels for cross-system signaling within a tick.
//!
//! Each payload type gets its own bounded FIFO queue, lazily created on
//! first publish. A channel is drained at-most-once per tick, in publish
//! order; anything left in it past that point is stale by construction,
//! since the next tick's drain only sees what was published since.

use std::any::{Any, TypeId};
use std::collections::VecDeque;

use rustc_hash::FxHashMap;

/// Channels silently drop further events past this depth rather than grow
/// unbounded if nothing ever drains them.
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

trait AnyChannel: Any + Send + Sync {
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn len(&self) -> usize;
}

struct Channel<T> {
    queue: VecDeque<T>,
    capacity: usize,
}

impl<T: Send + Sync + 'static> AnyChannel for Channel<T> {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn len(&self) -> usize {
        self.queue.len()
    }
}

/// Registry of per-type event channels owned by a [`crate::world::World`].
///
/// Channels are looked up by `TypeId` only at this boundary, never inside
/// the archetype/query hot path -- the same discipline the component
/// registry follows for minting `ComponentId`s.
pub struct EventChannels {
    channels: FxHashMap<TypeId, Box<dyn AnyChannel>>,
    capacity: usize,
}

impl EventChannels {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { channels: FxHashMap::default(), capacity }
    }

    fn channel_mut<T: Send + Sync + 'static>(&mut self) -> &mut Channel<T> {
        let capacity = self.capacity;
        self.channels
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Channel::<T> { queue: VecDeque::new(), capacity }))
            .as_any_mut()
            .downcast_mut::<Channel<T>>()
            .expect("channel type mismatch for a stable TypeId key")
    }

    /// Append `event` to the back of `T`'s queue. Silently dropped (with an
    /// `eprintln!` warning, matching the queue-overflow policy this is
    /// generalized from) once the channel is at capacity.
    pub fn publish<T: Send + Sync + 'static>(&mut self, event: T) {
        let channel = self.channel_mut::<T>();
        if channel.queue.len() < channel.capacity {
            channel.queue.push_back(event);
        } else {
            eprintln!(
                "event channel overflow for {}, capacity {}",
                std::any::type_name::<T>(),
                channel.capacity
            );
        }
    }

    /// Drain every queued `T` event, oldest first, leaving the channel empty.
    pub fn drain<T: Send + Sync + 'static>(&mut self) -> Vec<T> {
        self.channel_mut::<T>().queue.drain(..).collect()
    }

    /// Number of `T` events currently queued, without draining them.
    pub fn len<T: Send + Sync + 'static>(&self) -> usize {
        self.channels.get(&TypeId::of::<T>()).map(|c| c.len()).unwrap_or(0)
    }
}

impl Default for EventChannels {
    fn default() -> Self {
        Self::new()
    }
}

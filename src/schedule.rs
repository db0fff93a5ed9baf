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

//! Deterministic, single-threaded system scheduling.
//!
//! Systems run in `(Phase, Order, registration index)` order every tick --
//! no dependency graph, no parallel stages. Per-system timing is tracked the
//! way the teacher's executor tracks it, just against this simpler plan.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::system::{Phase, System, SystemEntry};
use crate::world::World;

/// Samples kept per system for [`SystemStats::rolling_average`].
const ROLLING_WINDOW: usize = 30;

/// Stable identity for a registered system, independent of `Schedule`'s
/// current sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SystemId(pub usize);

/// Per-system timing, mirroring the teacher's `SystemStats` but windowed
/// instead of lifetime min/max/avg.
#[derive(Debug, Clone, Copy)]
pub struct SystemStats {
    pub current: Duration,
    pub peak: Duration,
    pub rolling_average: Duration,
    pub frame_count: u64,
}

#[derive(Default)]
struct ProfilerEntry {
    current: Duration,
    peak: Duration,
    window: VecDeque<Duration>,
    window_sum: Duration,
    frame_count: u64,
}

impl ProfilerEntry {
    fn record(&mut self, duration: Duration) {
        self.current = duration;
        if duration > self.peak {
            self.peak = duration;
        }
        self.window.push_back(duration);
        self.window_sum += duration;
        if self.window.len() > ROLLING_WINDOW {
            if let Some(oldest) = self.window.pop_front() {
                self.window_sum -= oldest;
            }
        }
        self.frame_count += 1;
    }

    fn stats(&self) -> SystemStats {
        let rolling_average = if self.window.is_empty() {
            Duration::ZERO
        } else {
            self.window_sum / self.window.len() as u32
        };
        SystemStats {
            current: self.current,
            peak: self.peak,
            rolling_average,
            frame_count: self.frame_count,
        }
    }
}

/// Collects per-system timing across ticks.
#[derive(Default)]
pub struct SystemProfiler {
    entries: FxHashMap<SystemId, ProfilerEntry>,
}

impl SystemProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, id: SystemId, duration: Duration) {
        self.entries.entry(id).or_default().record(duration);
    }

    pub fn stats(&self, id: SystemId) -> Option<SystemStats> {
        self.entries.get(&id).map(ProfilerEntry::stats)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// A sorted plan of systems plus their profiling data.
///
/// Insertion order is preserved as the tie-break key; `add_system` sorts the
/// plan by `(Phase, Order, registration_index)` immediately, so `tick` never
/// has to rebuild anything.
#[derive(Default)]
pub struct Schedule {
    entries: Vec<SystemEntry>,
    profiler: SystemProfiler,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `system`, re-sorting the plan by `(PHASE, ORDER,
    /// registration index)`.
    pub fn add_system<S: System + 'static>(&mut self, mut system: S) -> SystemId {
        let registration_index = self.entries.len();
        let id = SystemId(registration_index);
        let name = system.name();
        let phase = S::PHASE;
        let order = S::ORDER;

        self.entries.push(SystemEntry {
            system: Box::new(move |world| system.run(world)),
            name,
            phase,
            order,
            registration_index,
        });
        self.entries.sort_by_key(|e| (e.phase, e.order, e.registration_index));
        id
    }

    pub fn system_count(&self) -> usize {
        self.entries.len()
    }

    pub fn stats(&self, id: SystemId) -> Option<SystemStats> {
        self.profiler.stats(id)
    }

    pub fn clear_stats(&mut self) {
        self.profiler.clear();
    }

    /// Run every registered system once, in plan order, timing each.
    pub fn tick(&mut self, world: &mut World) -> Result<()> {
        for entry in &mut self.entries {
            let id = SystemId(entry.registration_index);
            let start = Instant::now();
            (entry.system)(world)?;
            self.profiler.record(id, start.elapsed());
        }
        Ok(())
    }

    /// Systems scheduled in `phase`, in plan order.
    pub fn systems_in_phase(&self, phase: Phase) -> impl Iterator<Item = &SystemEntry> {
        self.entries.iter().filter(move |e| e.phase == phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result as EcsResult;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Recorder {
        order: Arc<AtomicUsize>,
        slot: Arc<AtomicUsize>,
    }

    macro_rules! recorder_system {
        ($name:ident, $phase:expr, $order:expr) => {
            struct $name {
                shared: Recorder,
            }
            impl System for $name {
                const PHASE: Phase = $phase;
                const ORDER: i32 = $order;
                fn name(&self) -> &'static str {
                    stringify!($name)
                }
                fn run(&mut self, _world: &mut World) -> EcsResult<()> {
                    let position = self.shared.order.fetch_add(1, Ordering::SeqCst);
                    self.shared.slot.store(position, Ordering::SeqCst);
                    Ok(())
                }
            }
        };
    }

    recorder_system!(LateUpdate, Phase::Update, 10);
    recorder_system!(EarlyUpdate, Phase::Update, 0);
    recorder_system!(Presentation, Phase::Presentation, 0);

    #[test]
    fn systems_run_in_phase_then_order() {
        let counter = Arc::new(AtomicUsize::new(0));
        let presentation_slot = Arc::new(AtomicUsize::new(usize::MAX));
        let early_slot = Arc::new(AtomicUsize::new(usize::MAX));
        let late_slot = Arc::new(AtomicUsize::new(usize::MAX));

        let mut schedule = Schedule::new();
        // Registered out of phase/order to prove the plan re-sorts them.
        schedule.add_system(Presentation {
            shared: Recorder { order: counter.clone(), slot: presentation_slot.clone() },
        });
        schedule.add_system(LateUpdate {
            shared: Recorder { order: counter.clone(), slot: late_slot.clone() },
        });
        schedule.add_system(EarlyUpdate {
            shared: Recorder { order: counter.clone(), slot: early_slot.clone() },
        });

        let mut world = World::new();
        schedule.tick(&mut world).unwrap();

        assert_eq!(early_slot.load(Ordering::SeqCst), 0);
        assert_eq!(late_slot.load(Ordering::SeqCst), 1);
        assert_eq!(presentation_slot.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn profiler_tracks_frame_count_and_peak() {
        let counter = Arc::new(AtomicUsize::new(0));
        let slot = Arc::new(AtomicUsize::new(usize::MAX));
        let mut schedule = Schedule::new();
        let id = schedule.add_system(EarlyUpdate {
            shared: Recorder { order: counter, slot },
        });

        let mut world = World::new();
        schedule.tick(&mut world).unwrap();
        schedule.tick(&mut world).unwrap();

        let stats = schedule.stats(id).unwrap();
        assert_eq!(stats.frame_count, 2);
    }
}

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

//! The `System` trait and the phases systems run in.

use crate::error::Result;
use crate::world::World;

/// The three points in a tick a system may be scheduled at.
///
/// Systems run in `Phase` order; within a phase, by `System::ORDER`, then by
/// registration order for any remaining ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Update,
    PostUpdate,
    Presentation,
}

/// A unit of per-tick behavior over a [`World`].
///
/// `PHASE` and `ORDER` are associated constants rather than fields on a
/// registered instance: a system declares where it runs as part of its type,
/// read once at `Schedule::add_system` time rather than discovered through
/// runtime reflection.
pub trait System: Send + Sync {
    /// Phase this system runs in.
    const PHASE: Phase;

    /// Tie-break within `PHASE`; lower runs first.
    const ORDER: i32;

    /// Name used in profiling output and panic messages.
    fn name(&self) -> &'static str;

    /// Run one tick's worth of work.
    fn run(&mut self, world: &mut World) -> Result<()>;
}

/// A registered system, type-erased, carrying the phase/order it reported
/// at registration time plus its stable registration index.
pub struct SystemEntry {
    pub(crate) system: Box<dyn FnMut(&mut World) -> Result<()> + Send + Sync>,
    pub(crate) name: &'static str,
    pub(crate) phase: Phase,
    pub(crate) order: i32,
    pub(crate) registration_index: usize,
}

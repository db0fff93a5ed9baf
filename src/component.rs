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

//! Component type registry.
//!
//! Components are plain data attached to entities. Every distinct component
//! type is assigned a dense [`ComponentId`] the first time it is observed;
//! the id, its memory layout, and its drop policy are cached process-wide so
//! that any number of [`crate::world::World`]s in one process agree on what a
//! given `ComponentId` means.

use std::any::TypeId;
use std::sync::{Mutex, OnceLock};

use rustc_hash::FxHashMap;

/// Highest number of distinct component kinds a process may register.
///
/// The designed ceiling ("at least 256, ideally 1024"); raising this is a
/// constant change, not a format change.
pub const MAX_COMPONENT_KINDS: usize = 1024;

/// Marker trait for components.
///
/// Components must be `'static` (no borrowed data) and safe to move between
/// threads, even though the core itself runs single-threaded per tick.
pub trait Component: 'static + Send + Sync {}

impl<T: 'static + Send + Sync> Component for T {}

/// Dense, zero-based, process-wide identity for a component kind.
///
/// Allocated monotonically on first observation and never reused, even if
/// the owning `World` is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(pub(crate) u32);

impl ComponentId {
    /// Raw index, usable as a bitmask position or dense array index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Size, alignment, and drop policy for one component kind.
#[derive(Clone, Copy)]
pub struct ComponentLayout {
    pub size: usize,
    pub align: usize,
    pub drop_fn: Option<unsafe fn(*mut u8)>,
    pub name: &'static str,
}

struct RegistryInner {
    by_type: FxHashMap<TypeId, ComponentId>,
    layouts: Vec<ComponentLayout>,
}

impl RegistryInner {
    fn new() -> Self {
        Self {
            by_type: FxHashMap::default(),
            layouts: Vec::with_capacity(64),
        }
    }
}

fn global_registry() -> &'static Mutex<RegistryInner> {
    static REGISTRY: OnceLock<Mutex<RegistryInner>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(RegistryInner::new()))
}

/// Process-wide assignment of [`ComponentId`]s to component kinds.
///
/// Not per-`World`: `ComponentId` values must compare equal across any
/// number of worlds in the same process, so the allocator lives behind a
/// single global lock rather than inside `World`.
pub struct ComponentRegistry;

impl ComponentRegistry {
    /// Idempotently assign (or fetch) the [`ComponentId`] for `T`.
    ///
    /// The first call for a given `T` allocates the next free id and records
    /// `{size_of::<T>(), align_of::<T>(), drop_fn}`. Every subsequent call,
    /// from any `World`, returns the same id.
    ///
    /// # Panics
    /// Panics with a `ComponentRegistryFull` message once
    /// [`MAX_COMPONENT_KINDS`] distinct kinds have been observed.
    pub fn id_of<T: Component>() -> ComponentId {
        // A `static` local to a generic function is monomorphized along with
        // it, so this cache cell is per component kind -- the per-type
        // static the design notes describe.
        static CELL: OnceLock<ComponentId> = OnceLock::new();
        *CELL.get_or_init(|| {
            let type_id = TypeId::of::<T>();
            let mut inner = global_registry().lock().unwrap();
            if let Some(&id) = inner.by_type.get(&type_id) {
                return id;
            }
            let next = inner.layouts.len();
            assert!(
                next < MAX_COMPONENT_KINDS,
                "ComponentRegistryFull: exceeded {MAX_COMPONENT_KINDS} component kinds"
            );
            let id = ComponentId(next as u32);
            inner.layouts.push(ComponentLayout {
                size: std::mem::size_of::<T>(),
                align: std::mem::align_of::<T>(),
                drop_fn: if std::mem::needs_drop::<T>() {
                    Some(|ptr| unsafe { std::ptr::drop_in_place(ptr as *mut T) })
                } else {
                    None
                },
                name: std::any::type_name::<T>(),
            });
            inner.by_type.insert(type_id, id);
            id
        })
    }

    /// Layout and drop policy recorded for `id`.
    ///
    /// # Panics
    /// Panics if `id` was never allocated by this process (programmer error:
    /// ids only ever come from [`ComponentRegistry::id_of`]).
    pub fn layout(id: ComponentId) -> ComponentLayout {
        let inner = global_registry().lock().unwrap();
        inner.layouts[id.index()]
    }

    /// Number of distinct component kinds observed so far in this process.
    pub fn kind_count() -> usize {
        global_registry().lock().unwrap().layouts.len()
    }
}

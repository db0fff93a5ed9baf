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

//! Archetype storage: structure-of-arrays rows for one component signature.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

use rustc_hash::FxHashMap;

use crate::component::{Component, ComponentId, ComponentLayout, ComponentRegistry};
use crate::entity::EntityId;
use crate::error::{EcsError, Result};
use crate::signature::Signature;

/// Storage for every entity whose current component set is exactly one
/// signature. Owns a row-indexed entity list and one [`Column`] per
/// component id in the signature.
pub struct Archetype {
    signature: Signature,
    entities: Vec<EntityId>,
    columns: Vec<Column>,
    column_index: FxHashMap<ComponentId, usize>,
}

impl Archetype {
    /// Create storage for `signature`, allocating one (empty) column per id.
    pub fn new(signature: Signature) -> Self {
        let mut columns = Vec::with_capacity(signature.len());
        let mut column_index = FxHashMap::default();
        for id in signature.iter() {
            column_index.insert(id, columns.len());
            columns.push(Column::new(ComponentRegistry::layout(id)));
        }
        Self {
            signature,
            entities: Vec::new(),
            columns,
            column_index,
        }
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    fn column_of(&self, id: ComponentId) -> Option<&Column> {
        self.column_index.get(&id).map(|&idx| &self.columns[idx])
    }

    fn column_of_mut(&mut self, id: ComponentId) -> Option<&mut Column> {
        self.column_index.get(&id).map(|&idx| &mut self.columns[idx])
    }

    /// Append a fresh row for `entity`; every column gets an uninitialized
    /// slot which the caller must write before anyone reads it.
    pub fn add_entity(&mut self, entity: EntityId) -> usize {
        let row = self.entities.len();
        self.entities.push(entity);
        for column in &mut self.columns {
            column.push_uninit();
        }
        row
    }

    /// Write `value` into `row`'s `T` column (the row must already exist and
    /// not have had `T` written since `add_entity`, e.g. the just-added row).
    pub fn write_component<T: Component>(&mut self, row: usize, value: T) -> Result<()> {
        let id = ComponentRegistry::id_of::<T>();
        let column = self
            .column_of_mut(id)
            .ok_or(EcsError::ComponentNotInArchetype)?;
        // SAFETY: `row` is within bounds (checked by the column itself) and
        // the slot was reserved uninitialized by `add_entity`/`push_uninit`.
        unsafe { column.write::<T>(row, value) };
        Ok(())
    }

    pub fn read_component<T: Component>(&self, row: usize) -> Result<&T> {
        let id = ComponentRegistry::id_of::<T>();
        self.column_of(id)
            .and_then(|c| c.get::<T>(row))
            .ok_or(EcsError::ComponentNotInArchetype)
    }

    pub fn read_component_mut<T: Component>(&mut self, row: usize) -> Result<&mut T> {
        let id = ComponentRegistry::id_of::<T>();
        self.column_of_mut(id)
            .and_then(|c| c.get_mut::<T>(row))
            .ok_or(EcsError::ComponentNotInArchetype)
    }

    /// Whole `T` column for bulk iteration.
    pub fn column_span<T: Component>(&self) -> Option<&[T]> {
        let id = ComponentRegistry::id_of::<T>();
        self.column_of(id).map(|c| c.as_slice::<T>())
    }

    pub fn column_span_mut<T: Component>(&mut self) -> Option<&mut [T]> {
        let id = ComponentRegistry::id_of::<T>();
        self.column_of_mut(id).map(|c| c.as_slice_mut::<T>())
    }

    /// Raw component bytes for `id`, used by the snapshot encoder which does
    /// not know component types at compile time.
    pub fn column_bytes(&self, id: ComponentId) -> Option<(&[u8], usize)> {
        self.column_of(id).map(|c| (c.as_bytes(), c.layout.size))
    }

    /// Swap-remove `row`. Drops the removed value in every column. Returns
    /// the entity that was moved into `row` from the former last row, if
    /// any, so the caller can fix up its directory entry.
    pub fn remove_row(&mut self, row: usize) -> Option<EntityId> {
        if row >= self.entities.len() {
            return None;
        }
        self.entities.swap_remove(row);
        for column in &mut self.columns {
            column.swap_remove(row);
        }
        if row < self.entities.len() {
            Some(self.entities[row])
        } else {
            None
        }
    }

    /// Relocate `src_row` into a freshly-allocated row of `dest`: every
    /// component id both archetypes share transfers ownership (no drop, no
    /// double-copy); ids only `dest` carries get an uninitialized slot for
    /// the caller to fill; ids only `self` carries are dropped when `self`'s
    /// row is cleaned up below. Used by `add_component`/`remove_component`
    /// structural transitions.
    ///
    /// Returns `(new_row_in_dest, entity_swapped_into_src_row)` — the second
    /// element mirrors [`Archetype::remove_row`]'s return for the caller to
    /// fix up the swapped entity's directory entry.
    pub fn relocate_row(&mut self, src_row: usize, dest: &mut Archetype) -> (usize, Option<EntityId>) {
        let entity = self.entities[src_row];
        let dest_row = dest.entities.len();
        dest.entities.push(entity);

        for (&id, &dest_idx) in dest.column_index.clone().iter() {
            if let Some(&src_idx) = self.column_index.get(&id) {
                self.columns[src_idx].move_row_to(src_row, &mut dest.columns[dest_idx]);
            } else {
                dest.columns[dest_idx].push_uninit();
            }
        }

        self.entities.swap_remove(src_row);
        for (&id, &src_idx) in self.column_index.clone().iter() {
            if dest.column_index.contains_key(&id) {
                // Already relocated above; just fill the hole.
                self.columns[src_idx].forget_swap_remove(src_row);
            } else {
                self.columns[src_idx].swap_remove(src_row);
            }
        }

        let moved_entity = if src_row < self.entities.len() {
            Some(self.entities[src_row])
        } else {
            None
        };
        (dest_row, moved_entity)
    }
}

/// Type-erased, alignment-correct, growable column of one component kind's
/// values. Unlike a `Vec<u8>`, the backing buffer is allocated with the
/// component's own `size`/`align`, so every element sits at its natural
/// alignment regardless of byte offset.
pub struct Column {
    ptr: NonNull<u8>,
    len: usize,
    cap: usize,
    layout: ComponentLayout,
}

// SAFETY: `Column` is only ever touched from the single thread driving the
// owning `World`; the raw pointer carries no aliasing beyond what `Archetype`
// already enforces through `&`/`&mut` borrows.
unsafe impl Send for Column {}
unsafe impl Sync for Column {}

impl Column {
    pub fn new(layout: ComponentLayout) -> Self {
        Self {
            ptr: NonNull::dangling(),
            len: 0,
            cap: if layout.size == 0 { usize::MAX } else { 0 },
            layout,
        }
    }

    fn elem_layout(&self) -> Layout {
        Layout::from_size_align(self.layout.size, self.layout.align.max(1))
            .expect("component size/align must form a valid Layout")
    }

    fn array_layout(&self, cap: usize) -> Layout {
        let elem = self.elem_layout();
        Layout::from_size_align(elem.size() * cap, elem.align())
            .expect("component array size overflowed")
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn grow(&mut self) {
        if self.layout.size == 0 {
            return;
        }
        let new_cap = if self.cap == 0 { 4 } else { self.cap * 2 };
        let new_layout = self.array_layout(new_cap);
        let new_ptr = if self.cap == 0 {
            unsafe { alloc::alloc(new_layout) }
        } else {
            let old_layout = self.array_layout(self.cap);
            unsafe { alloc::realloc(self.ptr.as_ptr(), old_layout, new_layout.size()) }
        };
        self.ptr = NonNull::new(new_ptr).unwrap_or_else(|| alloc::handle_alloc_error(new_layout));
        self.cap = new_cap;
    }

    /// Reserve a fresh, uninitialized slot at the end and return its index.
    /// The caller must write a valid value before any read of this slot.
    pub fn push_uninit(&mut self) -> usize {
        if self.len == self.cap {
            self.grow();
        }
        let row = self.len;
        self.len += 1;
        row
    }

    fn ptr_at(&self, row: usize) -> *mut u8 {
        debug_assert!(row < self.len);
        if self.layout.size == 0 {
            self.ptr.as_ptr()
        } else {
            unsafe { self.ptr.as_ptr().add(row * self.layout.size) }
        }
    }

    /// # Safety
    /// `row` must be a slot reserved by `push_uninit` that has not yet been
    /// written (or whose previous value has already been dropped/moved out).
    pub unsafe fn write<T: Component>(&mut self, row: usize, value: T) {
        debug_assert_eq!(std::mem::size_of::<T>(), self.layout.size);
        std::ptr::write(self.ptr_at(row) as *mut T, value);
    }

    pub fn get<T: Component>(&self, row: usize) -> Option<&T> {
        if row >= self.len {
            return None;
        }
        Some(unsafe { &*(self.ptr_at(row) as *const T) })
    }

    pub fn get_mut<T: Component>(&mut self, row: usize) -> Option<&mut T> {
        if row >= self.len {
            return None;
        }
        Some(unsafe { &mut *(self.ptr_at(row) as *mut T) })
    }

    pub fn as_slice<T: Component>(&self) -> &[T] {
        if self.len == 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr() as *const T, self.len) }
    }

    pub fn as_slice_mut<T: Component>(&mut self) -> &mut [T] {
        if self.len == 0 {
            return &mut [];
        }
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr() as *mut T, self.len) }
    }

    fn as_bytes(&self) -> &[u8] {
        if self.len == 0 || self.layout.size == 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len * self.layout.size) }
    }

    /// Drop the value at `row`, then fill the hole with the current last
    /// element (constant-time eviction), mirroring how the owning
    /// `Archetype` swap-removes its entity list.
    pub fn swap_remove(&mut self, row: usize) {
        if row >= self.len {
            return;
        }
        unsafe {
            if let Some(drop_fn) = self.layout.drop_fn {
                drop_fn(self.ptr_at(row));
            }
            let last = self.len - 1;
            if row != last && self.layout.size > 0 {
                let src = self.ptr_at(last);
                let dst = self.ptr_at(row);
                std::ptr::copy_nonoverlapping(src, dst, self.layout.size);
            }
        }
        self.len -= 1;
    }

    /// Copy the value at `src_row` into a freshly-pushed row of `dest`.
    /// Ownership transfers to `dest`; `src_row` must be cleaned up in `self`
    /// afterward with [`Column::forget_swap_remove`], never `swap_remove`
    /// (which would double-drop the value this just handed off).
    pub fn move_row_to(&mut self, src_row: usize, dest: &mut Column) {
        debug_assert_eq!(self.layout.size, dest.layout.size);
        let dest_row = dest.push_uninit();
        if self.layout.size > 0 {
            unsafe {
                let src = self.ptr_at(src_row);
                let dst = dest.ptr_at(dest_row);
                std::ptr::copy_nonoverlapping(src, dst, self.layout.size);
            }
        }
    }

    /// Swap-remove `row` like [`Column::swap_remove`], but skip the drop —
    /// for a row whose value was already relocated via `move_row_to`.
    pub fn forget_swap_remove(&mut self, row: usize) {
        if row >= self.len {
            return;
        }
        let last = self.len - 1;
        if row != last && self.layout.size > 0 {
            unsafe {
                let src = self.ptr_at(last);
                let dst = self.ptr_at(row);
                std::ptr::copy_nonoverlapping(src, dst, self.layout.size);
            }
        }
        self.len -= 1;
    }
}

impl Drop for Column {
    fn drop(&mut self) {
        if let Some(drop_fn) = self.layout.drop_fn {
            for row in 0..self.len {
                unsafe { drop_fn(self.ptr_at(row)) };
            }
        }
        if self.cap > 0 && self.layout.size > 0 {
            let layout = self.array_layout(self.cap);
            unsafe { alloc::dealloc(self.ptr.as_ptr(), layout) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentRegistry;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[test]
    fn archetype_round_trips_component_values() {
        let id = ComponentRegistry::id_of::<Position>();
        let sig = Signature::empty().add(id);
        let mut arch = Archetype::new(sig);

        let e = EntityId { id: 0, version: 1 };
        let row = arch.add_entity(e);
        arch.write_component(row, Position { x: 1.0, y: 2.0 }).unwrap();

        assert_eq!(*arch.read_component::<Position>(row).unwrap(), Position { x: 1.0, y: 2.0 });
    }

    #[test]
    fn swap_remove_relocates_last_row() {
        let id = ComponentRegistry::id_of::<Position>();
        let sig = Signature::empty().add(id);
        let mut arch = Archetype::new(sig);

        let e0 = EntityId { id: 0, version: 1 };
        let e1 = EntityId { id: 1, version: 1 };

        let r0 = arch.add_entity(e0);
        arch.write_component(r0, Position { x: 0.0, y: 0.0 }).unwrap();
        let r1 = arch.add_entity(e1);
        arch.write_component(r1, Position { x: 9.0, y: 9.0 }).unwrap();

        let moved = arch.remove_row(r0);
        assert_eq!(moved, Some(e1));
        assert_eq!(arch.len(), 1);
        assert_eq!(*arch.read_component::<Position>(0).unwrap(), Position { x: 9.0, y: 9.0 });
    }

    #[test]
    fn zero_sized_components_are_supported() {
        #[derive(Clone, Copy)]
        struct Marker;
        let id = ComponentRegistry::id_of::<Marker>();
        let sig = Signature::empty().add(id);
        let mut arch = Archetype::new(sig);
        let e = EntityId { id: 0, version: 1 };
        let row = arch.add_entity(e);
        arch.write_component(row, Marker).unwrap();
        assert!(arch.read_component::<Marker>(row).is_ok());
    }
}

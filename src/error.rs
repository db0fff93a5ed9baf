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

//! Error types

use std::fmt;

/// ECS error type
#[derive(Debug, Clone)]
pub enum EcsError {
    /// A handle is stale (version mismatch) or was never allocated.
    EntityNotFound,

    /// Typed access for a component absent from the entity's current signature.
    ComponentNotInArchetype,

    /// The component id space is exhausted.
    ComponentRegistryFull,

    /// A snapshot declares a `format_version` newer than this crate understands.
    UnsupportedSnapshotVersion(u32),

    /// A snapshot's byte layout could not be parsed, or a payload referenced
    /// a component kind with no registered decoder.
    CorruptSnapshot(String),

    /// A boundary argument failed validation (e.g. a null bridge).
    InvalidArgument(String),

    /// IO error surfaced from snapshot read/write.
    IoError(String),
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::EntityNotFound => write!(f, "entity not found"),
            EcsError::ComponentNotInArchetype => write!(f, "component not in archetype"),
            EcsError::ComponentRegistryFull => write!(f, "component registry full"),
            EcsError::UnsupportedSnapshotVersion(v) => {
                write!(f, "unsupported snapshot format_version: {v}")
            }
            EcsError::CorruptSnapshot(msg) => write!(f, "corrupt snapshot: {msg}"),
            EcsError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            EcsError::IoError(msg) => write!(f, "io error: {msg}"),
        }
    }
}

impl std::error::Error for EcsError {}

impl From<std::io::Error> for EcsError {
    fn from(err: std::io::Error) -> Self {
        EcsError::IoError(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, EcsError>;

// Copyright 2025 eraflo
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

//! The mount table: ordered mount records plus the optional default filesystem.
//!
//! Writers serialize on an internal lock and publish a fresh immutable
//! [`MountSnapshot`] together with a bumped change counter. Readers grab the
//! current snapshot once and afterwards only compare the live counter with
//! the one the snapshot was published under.

use crate::path::{normalize_mount_point, FilenameRules};
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use stratum_core::vfs::FileSystem;

/// Identifier of a mount. Monotonic and never reused within one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MountId(u32);

impl MountId {
    /// Wraps a raw id, e.g. one parsed from an `N:/` request stem.
    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw id.
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for MountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One mounted filesystem.
pub(crate) struct MountRecord {
    pub id: MountId,
    /// Normalized prefix, with a trailing separator (empty for the root).
    pub mount_point: String,
    pub segments: Vec<String>,
    /// Chained hash of `segments`.
    pub hash: u64,
    pub file_system: Arc<dyn FileSystem>,
}

impl MountRecord {
    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

/// An immutable view of the table, published on every mutation.
#[derive(Clone, Default)]
pub(crate) struct MountSnapshot {
    /// In registration order, which is also resolution priority.
    pub mounts: Vec<Arc<MountRecord>>,
    pub default_file_system: Option<Arc<dyn FileSystem>>,
    /// The value of the change counter this snapshot was published under.
    pub change_id: u64,
}

impl MountSnapshot {
    pub fn find(&self, id: MountId) -> Option<&Arc<MountRecord>> {
        self.mounts.iter().find(|m| m.id == id)
    }
}

pub(crate) struct MountTable {
    rules: FilenameRules,
    current: RwLock<Arc<MountSnapshot>>,
    // Shared with cursors and walkers so they can check for staleness
    // without touching `current`.
    change_id: Arc<AtomicU64>,
    next_mount_id: AtomicU32,
}

impl MountTable {
    pub fn new(rules: FilenameRules) -> Self {
        Self {
            rules,
            current: RwLock::new(Arc::new(MountSnapshot::default())),
            change_id: Arc::new(AtomicU64::new(0)),
            next_mount_id: AtomicU32::new(1),
        }
    }

    pub fn rules(&self) -> &FilenameRules {
        &self.rules
    }

    pub fn snapshot(&self) -> Arc<MountSnapshot> {
        Arc::clone(&self.current.read())
    }

    pub fn change_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.change_id)
    }

    pub fn change_id(&self) -> u64 {
        self.change_id.load(Ordering::Acquire)
    }

    pub fn add(&self, prefix: &str, file_system: Arc<dyn FileSystem>) -> MountId {
        let (mount_point, segments) = normalize_mount_point(prefix, &self.rules);
        let hash = self.rules.hash_segments(segments.iter().map(String::as_str));

        self.mutate(|next, next_mount_id| {
            let id = MountId(next_mount_id.fetch_add(1, Ordering::Relaxed));
            next.mounts.push(Arc::new(MountRecord {
                id,
                mount_point,
                segments,
                hash,
                file_system,
            }));
            Some(id)
        })
        .unwrap_or(MountId(0))
    }

    pub fn remove(&self, id: MountId) -> bool {
        self.mutate(|next, _| {
            let index = next.mounts.iter().position(|m| m.id == id)?;
            next.mounts.remove(index);
            Some(())
        })
        .is_some()
    }

    pub fn set_default(&self, file_system: Option<Arc<dyn FileSystem>>) {
        self.mutate(|next, _| {
            next.default_file_system = file_system;
            Some(())
        });
    }

    /// Applies `edit` to a copy of the current snapshot and publishes it.
    ///
    /// Returning `None` from `edit` discards the copy: nothing is published
    /// and the counter is left alone.
    fn mutate<R>(
        &self,
        edit: impl FnOnce(&mut MountSnapshot, &AtomicU32) -> Option<R>,
    ) -> Option<R> {
        let mut current = self.current.write();
        let mut next = MountSnapshot::clone(&current);
        let result = edit(&mut next, &self.next_mount_id)?;
        // Bump before publishing: a reader that still holds the old snapshot
        // must already see a different live value.
        next.change_id = self.change_id.fetch_add(1, Ordering::AcqRel) + 1;
        *current = Arc::new(next);
        Some(result)
    }
}

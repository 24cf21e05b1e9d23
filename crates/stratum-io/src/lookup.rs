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

//! Lazy, invalidation-checked resolution of a logical path.

use crate::mount::{MountId, MountRecord, MountSnapshot};
use crate::path::{FilenameRules, ParsedRequest, RequestKind, ROOT_HASH_SEED};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use stratum_core::vfs::{FileSystem, Marker, TranslateResult};

/// How many per-segment prefix hashes a cursor keeps inline.
///
/// Mounts deeper than this still match; their deeper prefix hashes are
/// recomputed from the last memoized one on each test instead of cached.
pub const MEMOIZED_SEGMENTS: usize = 8;

/// One possible resolution of a logical path, before existence is verified.
#[derive(Clone)]
pub struct Candidate {
    /// The filesystem that accepted the path.
    pub file_system: Arc<dyn FileSystem>,
    /// The filesystem's descriptor for the path.
    pub marker: Marker,
    /// The mount point the candidate was reached through (empty for the default filesystem).
    pub mount_point: String,
    /// The mount the candidate came from; `None` for the default filesystem.
    pub mount_id: Option<MountId>,
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate")
            .field("mount_id", &self.mount_id)
            .field("mount_point", &self.mount_point)
            .field("marker_len", &self.marker.len())
            .finish()
    }
}

/// Result of advancing a [`LookupCursor`].
#[derive(Debug, Clone)]
pub enum LookupResult {
    /// The next candidate, in priority order.
    Success(Candidate),
    /// Every mount has been tried.
    NoCandidates,
    /// The mount table changed since the lookup began; start a new lookup.
    Invalidated,
}

/// A lazy cursor over the candidates for one request.
///
/// The cursor borrows the request text and must not outlive it. Advancing it
/// takes no lock: each advance compares the mount table's live change counter
/// with the value captured when the lookup began, and once they differ the
/// cursor reports [`LookupResult::Invalidated`] forever.
pub struct LookupCursor<'a> {
    request: Option<ParsedRequest<'a>>,
    snapshot: Arc<MountSnapshot>,
    live_change_id: Arc<AtomicU64>,
    rules: FilenameRules,
    next_mount: usize,
    yielded_any: bool,
    default_tried: bool,
    invalidated: bool,
    hashes: [u64; MEMOIZED_SEGMENTS],
    hashes_built: usize,
}

impl<'a> LookupCursor<'a> {
    pub(crate) fn new(
        request: &'a str,
        snapshot: Arc<MountSnapshot>,
        live_change_id: Arc<AtomicU64>,
        rules: FilenameRules,
    ) -> Self {
        let request = (!request.is_empty()).then(|| ParsedRequest::parse(request));
        Self {
            request,
            snapshot,
            live_change_id,
            rules,
            next_mount: 0,
            yielded_any: false,
            default_tried: false,
            invalidated: false,
            hashes: [0; MEMOIZED_SEGMENTS],
            hashes_built: 0,
        }
    }

    /// The change counter value this cursor was created under.
    pub fn change_id(&self) -> u64 {
        self.snapshot.change_id
    }

    /// Produces the next candidate.
    pub fn try_get_next(&mut self) -> LookupResult {
        if self.invalidated {
            return LookupResult::Invalidated;
        }
        if self.live_change_id.load(Ordering::Acquire) != self.snapshot.change_id {
            log::trace!("Lookup invalidated by a mount table change.");
            self.invalidated = true;
            return LookupResult::Invalidated;
        }

        let Some(kind) = self.request.as_ref().map(|r| r.kind) else {
            return LookupResult::NoCandidates;
        };
        let candidate = match kind {
            RequestKind::Normal => self.next_normal(),
            RequestKind::MountQualified(id) => self.next_qualified(Some(MountId::from_raw(id))),
            RequestKind::DefaultQualified => self.next_qualified(None),
            RequestKind::Malformed => None,
        };
        match candidate {
            Some(candidate) => {
                self.yielded_any = true;
                LookupResult::Success(candidate)
            }
            None => LookupResult::NoCandidates,
        }
    }

    fn next_normal(&mut self) -> Option<Candidate> {
        let snapshot = Arc::clone(&self.snapshot);
        while self.next_mount < snapshot.mounts.len() {
            let mount = &snapshot.mounts[self.next_mount];
            self.next_mount += 1;
            if let Some(candidate) = self.test_mount(mount) {
                return Some(candidate);
            }
        }

        // The default filesystem is the last resort, only consulted when no
        // mount accepted the request.
        if self.default_tried || self.yielded_any {
            return None;
        }
        self.default_tried = true;
        let request = self.request.as_ref()?;
        let file_system = snapshot.default_file_system.as_ref()?;
        translate(file_system, &request.remainder(0), String::new(), None)
    }

    fn test_mount(&mut self, mount: &MountRecord) -> Option<Candidate> {
        let depth = mount.depth();
        let segment_count = self.request.as_ref()?.segment_count();

        if depth != 0 {
            // A mount can only hold files strictly below its mount point.
            if depth >= segment_count || self.prefix_hash(depth) != mount.hash {
                return None;
            }
        }

        let remainder = self.request.as_ref()?.remainder(depth);
        translate(
            &mount.file_system,
            &remainder,
            mount.mount_point.clone(),
            Some(mount.id),
        )
    }

    fn next_qualified(&mut self, target: Option<MountId>) -> Option<Candidate> {
        if self.next_mount != 0 {
            return None;
        }
        self.next_mount = 1;
        let request = self.request.as_ref()?;

        match target {
            Some(id) => {
                let Some(mount) = self.snapshot.find(id) else {
                    log::debug!("Request names unknown mount {id}: {}", request.original);
                    return None;
                };
                translate(
                    &mount.file_system,
                    &request.remainder(0),
                    mount.mount_point.clone(),
                    Some(mount.id),
                )
            }
            None => {
                let file_system = self.snapshot.default_file_system.as_ref()?;
                translate(file_system, request.original, String::new(), None)
            }
        }
    }

    /// Chained hash of the first `depth` request segments (`depth >= 1`).
    fn prefix_hash(&mut self, depth: usize) -> u64 {
        let Some(request) = self.request.as_ref() else {
            return ROOT_HASH_SEED;
        };
        let memo_depth = depth.min(MEMOIZED_SEGMENTS);
        while self.hashes_built < memo_depth {
            let d = self.hashes_built;
            let seed = if d == 0 {
                ROOT_HASH_SEED
            } else {
                self.hashes[d - 1]
            };
            self.hashes[d] = self.rules.hash_segment(request.segment(d), seed);
            self.hashes_built += 1;
        }

        let mut hash = self.hashes[memo_depth - 1];
        for d in memo_depth..depth {
            hash = self.rules.hash_segment(request.segment(d), hash);
        }
        hash
    }
}

fn translate(
    file_system: &Arc<dyn FileSystem>,
    path: &str,
    mount_point: String,
    mount_id: Option<MountId>,
) -> Option<Candidate> {
    match file_system.try_translate(path) {
        TranslateResult::Success(marker) => Some(Candidate {
            file_system: Arc::clone(file_system),
            marker,
            mount_point,
            mount_id,
        }),
        TranslateResult::Pending | TranslateResult::Invalid => None,
    }
}

impl Iterator for LookupCursor<'_> {
    type Item = Candidate;

    /// Yields candidates until the cursor is exhausted or invalidated.
    ///
    /// Iteration cannot tell the two apart; use [`LookupCursor::try_get_next`]
    /// when invalidation has to be handled.
    fn next(&mut self) -> Option<Candidate> {
        match self.try_get_next() {
            LookupResult::Success(candidate) => Some(candidate),
            LookupResult::NoCandidates | LookupResult::Invalidated => None,
        }
    }
}

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

//! The mounting tree facade.

use crate::lookup::{Candidate, LookupCursor, LookupResult};
use crate::mount::{MountId, MountTable};
use crate::path::{is_separator, simplify_segments, FilenameRules};
use crate::walker::{FileSystemWalker, StartingFs};
use std::sync::Arc;
use stratum_core::vfs::{Blob, FileDesc, FileState, FileSystem, IoError};

/// A process-wide file namespace built from independently mounted filesystems.
///
/// Filesystems are mounted under logical prefixes; overlapping and even
/// identical prefixes are allowed. A lookup yields every filesystem that
/// might hold the requested path, in registration order, and leaves the
/// existence check to the caller. Mounting "loose" files before an archive at
/// the same prefix therefore lets the loose files override the packed ones.
///
/// Mounts may be added or removed at any time, including while lookups are
/// in flight on other threads; those lookups then report
/// [`LookupResult::Invalidated`] and should simply be restarted.
pub struct MountingTree {
    table: MountTable,
}

impl MountingTree {
    /// Creates an empty tree using `rules` to compare path segments.
    pub fn new(rules: FilenameRules) -> Self {
        Self {
            table: MountTable::new(rules),
        }
    }

    /// The filename rules this tree was created with.
    pub fn rules(&self) -> &FilenameRules {
        self.table.rules()
    }

    /// Mounts `file_system` under `mount_point` and returns its id.
    ///
    /// Later mounts have lower priority than earlier ones at the same prefix.
    pub fn mount(&self, mount_point: &str, file_system: Arc<dyn FileSystem>) -> MountId {
        let id = self.table.add(mount_point, file_system);
        log::info!("Mounted filesystem {id} at '{mount_point}'");
        id
    }

    /// Removes a mount. Unknown ids are ignored.
    pub fn unmount(&self, id: MountId) {
        if self.table.remove(id) {
            log::info!("Unmounted filesystem {id}");
        } else {
            log::debug!("Unmount of unknown mount {id} ignored");
        }
    }

    /// Replaces the filesystem used for absolute paths, drive-qualified paths,
    /// and requests no mount accepts.
    pub fn set_default_file_system(&self, file_system: Option<Arc<dyn FileSystem>>) {
        self.table.set_default(file_system);
    }

    /// The current default filesystem.
    pub fn default_file_system(&self) -> Option<Arc<dyn FileSystem>> {
        self.table.snapshot().default_file_system.clone()
    }

    /// The filesystem mounted as `id`, if it is still mounted.
    pub fn mounted_file_system(&self, id: MountId) -> Option<Arc<dyn FileSystem>> {
        self.table
            .snapshot()
            .find(id)
            .map(|m| Arc::clone(&m.file_system))
    }

    /// The normalized mount point of `id`, or an empty string for unknown ids.
    pub fn mount_point(&self, id: MountId) -> String {
        self.table
            .snapshot()
            .find(id)
            .map(|m| m.mount_point.clone())
            .unwrap_or_default()
    }

    /// Ids of every current mount, in priority order.
    pub fn mount_ids(&self) -> Vec<MountId> {
        self.table.snapshot().mounts.iter().map(|m| m.id).collect()
    }

    /// Number of current mounts.
    pub fn mount_count(&self) -> usize {
        self.table.snapshot().mounts.len()
    }

    /// The current value of the change counter.
    pub fn change_id(&self) -> u64 {
        self.table.change_id()
    }

    /// Begins a lazy lookup of `request`.
    ///
    /// The request text is borrowed for the lifetime of the cursor. Starting
    /// a lookup briefly takes the mount table's read lock to capture the
    /// current snapshot, so it can wait behind a concurrent mount or unmount;
    /// advancing the returned cursor never locks.
    pub fn lookup<'a>(&self, request: &'a str) -> LookupCursor<'a> {
        LookupCursor::new(
            request,
            self.table.snapshot(),
            self.table.change_counter(),
            *self.table.rules(),
        )
    }

    /// Begins a directory walk at `initial_sub_directory`.
    pub fn begin_walk(&self, initial_sub_directory: &str) -> FileSystemWalker {
        let snapshot = self.table.snapshot();
        let rules = *self.table.rules();
        let mut starting = Vec::new();

        if let Some(qualified) = qualified_walk_target(initial_sub_directory) {
            match qualified {
                QualifiedWalk::Mount(id, rest) => {
                    if let Some(mount) = snapshot.find(id) {
                        if mount.file_system.as_searchable().is_some() {
                            starting.push(StartingFs {
                                pending_directories: Vec::new(),
                                internal_point: simplify_segments(rest).join("/"),
                                file_system: Arc::clone(&mount.file_system),
                                mount_id: Some(mount.id),
                                mount_point: mount.mount_point.clone(),
                            });
                        }
                    }
                }
                QualifiedWalk::Default => {
                    if let Some(fs) = &snapshot.default_file_system {
                        if fs.as_searchable().is_some() {
                            starting.push(StartingFs {
                                pending_directories: Vec::new(),
                                internal_point: initial_sub_directory.to_owned(),
                                file_system: Arc::clone(fs),
                                mount_id: None,
                                mount_point: String::new(),
                            });
                        }
                    }
                }
            }
        } else {
            let split = simplify_segments(initial_sub_directory);
            for mount in &snapshot.mounts {
                if mount.file_system.as_searchable().is_none() {
                    continue;
                }
                let shared = mount.depth().min(split.len());
                let overlaps = (0..shared).all(|c| rules.segments_equal(split[c], &mount.segments[c]));
                if !overlaps {
                    continue;
                }

                let (pending_directories, internal_point) = if split.len() > mount.depth() {
                    (Vec::new(), split[shared..].join("/"))
                } else {
                    (mount.segments[shared..].to_vec(), String::new())
                };
                starting.push(StartingFs {
                    pending_directories,
                    internal_point,
                    file_system: Arc::clone(&mount.file_system),
                    mount_id: Some(mount.id),
                    mount_point: mount.mount_point.clone(),
                });
            }
        }

        FileSystemWalker::new(
            starting,
            rules,
            self.table.change_counter(),
            snapshot.change_id,
        )
    }

    /// Returns the first candidate for `request`, restarting on invalidation.
    pub fn try_translate(&self, request: &str) -> Option<Candidate> {
        self.first_accepted(request, |candidate| Some(candidate.clone()))
    }

    /// Describes the first candidate for `request` that exists.
    pub fn try_get_desc(&self, request: &str) -> FileDesc {
        self.first_accepted(request, |candidate| {
            let mut desc = candidate.file_system.try_get_desc(&candidate.marker);
            if desc.snapshot.state == FileState::DoesNotExist {
                return None;
            }
            desc.mounted_name = format!("{}{}", candidate.mount_point, desc.mounted_name);
            Some(desc)
        })
        .unwrap_or_else(FileDesc::missing)
    }

    /// Returns `true` if any candidate for `request` exists.
    pub fn does_file_exist(&self, request: &str) -> bool {
        self.try_get_desc(request).snapshot.state != FileState::DoesNotExist
    }

    /// Loads the first candidate for `request` that exists.
    ///
    /// Candidates reporting "not found" or "invalid" are skipped; any other
    /// error stops the search and is returned.
    pub fn try_load_file(&self, request: &str) -> Result<Blob, IoError> {
        self.first_accepted(request, |candidate| {
            match candidate.file_system.try_load(&candidate.marker) {
                Err(error) if error.is_not_found() => None,
                other => Some(other),
            }
        })
        .unwrap_or(Err(IoError::FileNotFound))
    }

    fn first_accepted<R>(
        &self,
        request: &str,
        mut accept: impl FnMut(&Candidate) -> Option<R>,
    ) -> Option<R> {
        let mut cursor = self.lookup(request);
        loop {
            match cursor.try_get_next() {
                LookupResult::Success(candidate) => {
                    if let Some(result) = accept(&candidate) {
                        return Some(result);
                    }
                }
                LookupResult::NoCandidates => return None,
                LookupResult::Invalidated => {
                    log::trace!("Restarting lookup of '{request}' after a mount change.");
                    cursor = self.lookup(request);
                }
            }
        }
    }
}

impl Default for MountingTree {
    fn default() -> Self {
        Self::new(FilenameRules::default())
    }
}

impl std::fmt::Debug for MountingTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountingTree")
            .field("mounts", &self.mount_count())
            .field("change_id", &self.change_id())
            .finish()
    }
}

enum QualifiedWalk<'a> {
    Mount(MountId, &'a str),
    Default,
}

/// Detects `N:…`, drive-qualified, and absolute walk roots.
fn qualified_walk_target(sub_directory: &str) -> Option<QualifiedWalk<'_>> {
    for (index, c) in sub_directory.char_indices() {
        if is_separator(c) {
            return (index == 0).then_some(QualifiedWalk::Default);
        }
        if c == ':' {
            return Some(match sub_directory[..index].parse::<u32>() {
                Ok(id) => QualifiedWalk::Mount(MountId::from_raw(id), &sub_directory[index + 1..]),
                Err(_) => QualifiedWalk::Default,
            });
        }
    }
    None
}

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

//! Directory enumeration across every mounted filesystem.
//!
//! A walk starts at a logical directory and presents the union of what all
//! overlapping mounts hold there. Mounts whose prefix is deeper than the
//! walked directory show up as synthetic subdirectories until the walk
//! reaches their mount point.

use crate::mount::MountId;
use crate::path::{file_name, FilenameRules, ROOT_HASH_SEED};
use std::cell::OnceCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use stratum_core::vfs::{FileDesc, FileState, FileSystem, Marker};
use thiserror::Error;

/// Reported by a walker once the mount table has changed since the walk began.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("mount table changed during the directory walk")]
pub struct Invalidated;

#[derive(Clone)]
pub(crate) struct StartingFs {
    /// Mount point segments still to be descended before reaching the mount.
    pub pending_directories: Vec<String>,
    /// Directory inside the filesystem, once the mount point has been reached.
    pub internal_point: String,
    pub file_system: Arc<dyn FileSystem>,
    pub mount_id: Option<MountId>,
    pub mount_point: String,
}

/// A file found by a walk.
#[derive(Clone)]
pub struct WalkedFile {
    /// File name without directories.
    pub name: String,
    /// Descriptor to hand back to `file_system`.
    pub marker: Marker,
    /// The filesystem holding the file.
    pub file_system: Arc<dyn FileSystem>,
    /// The mount the file was found through; `None` for the default filesystem.
    pub mount_id: Option<MountId>,
    /// Description, with `mounted_name` expressed as a logical path.
    pub desc: FileDesc,
}

impl std::fmt::Debug for WalkedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalkedFile")
            .field("name", &self.name)
            .field("mount_id", &self.mount_id)
            .field("desc", &self.desc)
            .finish()
    }
}

/// A subdirectory found by a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedDirectory {
    /// Directory name.
    pub name: String,
    /// Indices of the contributing filesystems, in registration order.
    sources: Vec<usize>,
}

impl WalkedDirectory {
    /// How many filesystems contribute to this directory.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }
}

/// One level of a directory walk.
pub struct FileSystemWalker {
    file_systems: Vec<StartingFs>,
    rules: FilenameRules,
    live_change_id: Arc<AtomicU64>,
    change_id: u64,
    files: OnceCell<Vec<WalkedFile>>,
    directories: OnceCell<Vec<(u64, WalkedDirectory)>>,
}

impl FileSystemWalker {
    pub(crate) fn new(
        file_systems: Vec<StartingFs>,
        rules: FilenameRules,
        live_change_id: Arc<AtomicU64>,
        change_id: u64,
    ) -> Self {
        Self {
            file_systems,
            rules,
            live_change_id,
            change_id,
            files: OnceCell::new(),
            directories: OnceCell::new(),
        }
    }

    /// Returns `true` once the mount table has changed since the walk began.
    pub fn is_invalidated(&self) -> bool {
        self.live_change_id.load(Ordering::Acquire) != self.change_id
    }

    fn check(&self) -> Result<(), Invalidated> {
        if self.is_invalidated() {
            log::trace!("Directory walk invalidated by a mount table change.");
            Err(Invalidated)
        } else {
            Ok(())
        }
    }

    /// Number of filesystems taking part in this level of the walk.
    pub fn file_system_count(&self) -> usize {
        self.file_systems.len()
    }

    /// Files directly inside the walked directory.
    ///
    /// When several filesystems hold a file of the same name, the one mounted
    /// first wins.
    pub fn files(&self) -> Result<&[WalkedFile], Invalidated> {
        self.check()?;
        Ok(self.files.get_or_init(|| self.find_files()))
    }

    /// Subdirectories of the walked directory, merged across filesystems and
    /// ordered by name hash.
    pub fn directories(&self) -> Result<Vec<&WalkedDirectory>, Invalidated> {
        self.check()?;
        let directories = self.directories.get_or_init(|| self.find_directories());
        Ok(directories.iter().map(|(_, d)| d).collect())
    }

    /// Descends into `name`. Unknown names produce an empty walker.
    pub fn recurse_to(&self, name: &str) -> Result<FileSystemWalker, Invalidated> {
        self.check()?;
        let hash = self.rules.hash_segment(name, ROOT_HASH_SEED);
        let directories = self.directories.get_or_init(|| self.find_directories());

        let mut next_step = Vec::new();
        if let Ok(index) = directories.binary_search_by_key(&hash, |(h, _)| *h) {
            for &source in &directories[index].1.sources {
                let mut fs = self.file_systems[source].clone();
                if fs.pending_directories.is_empty() {
                    if !fs.internal_point.is_empty() {
                        fs.internal_point.push('/');
                    }
                    fs.internal_point.push_str(&directories[index].1.name);
                } else {
                    fs.pending_directories.remove(0);
                }
                next_step.push(fs);
            }
        }

        Ok(FileSystemWalker::new(
            next_step,
            self.rules,
            Arc::clone(&self.live_change_id),
            self.change_id,
        ))
    }

    fn find_files(&self) -> Vec<WalkedFile> {
        let mut files: Vec<(u64, WalkedFile)> = Vec::new();

        for fs in &self.file_systems {
            if !fs.pending_directories.is_empty() {
                continue;
            }
            let Some(searchable) = fs.file_system.as_searchable() else {
                continue;
            };

            for marker in searchable.find_files(&fs.internal_point, "*") {
                let mut desc = fs.file_system.try_get_desc(&marker);
                if desc.snapshot.state != FileState::Normal {
                    log::warn!("Unexpected file state found while searching directory tree");
                    continue;
                }

                let name = file_name(&desc.mounted_name).to_owned();
                let hash = self.rules.hash_segment(&name, ROOT_HASH_SEED);
                if files.iter().any(|(h, _)| *h == hash) {
                    continue;
                }

                desc.mounted_name = format!("{}{}", fs.mount_point, desc.mounted_name);
                files.push((
                    hash,
                    WalkedFile {
                        name,
                        marker,
                        file_system: Arc::clone(&fs.file_system),
                        mount_id: fs.mount_id,
                        desc,
                    },
                ));
            }
        }

        files.into_iter().map(|(_, file)| file).collect()
    }

    fn find_directories(&self) -> Vec<(u64, WalkedDirectory)> {
        let mut directories: Vec<(u64, WalkedDirectory)> = Vec::new();

        for (index, fs) in self.file_systems.iter().enumerate() {
            let names = match fs.pending_directories.first() {
                Some(next) => vec![next.clone()],
                None => match fs.file_system.as_searchable() {
                    Some(searchable) => searchable.find_sub_directories(&fs.internal_point),
                    None => continue,
                },
            };

            for name in names {
                let hash = self.rules.hash_segment(&name, ROOT_HASH_SEED);
                match directories.binary_search_by_key(&hash, |(h, _)| *h) {
                    Ok(existing) => {
                        let sources = &mut directories[existing].1.sources;
                        if !sources.contains(&index) {
                            sources.push(index);
                        }
                    }
                    Err(insert_at) => directories.insert(
                        insert_at,
                        (
                            hash,
                            WalkedDirectory {
                                name,
                                sources: vec![index],
                            },
                        ),
                    ),
                }
            }
        }

        directories
    }
}

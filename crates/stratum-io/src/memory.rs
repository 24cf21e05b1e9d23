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

//! A purely virtual, in-memory filesystem.
//!
//! Useful for generated content, for overriding individual files at runtime,
//! and for exercising the mounting tree without touching the disk.

use crate::path::{file_name, path_marker, simplify_segments};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use stratum_core::vfs::{
    Blob, FileDesc, FileSnapshot, FileState, FileSystem, IoError, Marker,
    SearchableFileSystem, TranslateResult,
};

#[derive(Debug, Clone)]
struct MemoryFile {
    data: Blob,
    modification_time: u64,
}

/// A searchable filesystem whose files live in a map keyed by normalized path.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RwLock<BTreeMap<String, MemoryFile>>,
    clock: AtomicU64,
}

impl MemoryFileSystem {
    /// Creates an empty filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with_file(self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(path, contents);
        self
    }

    /// Creates or replaces a file. Each write advances its modification time.
    pub fn insert(&self, path: &str, contents: impl Into<Vec<u8>>) {
        let key = normalize(path);
        let modification_time = self.clock.fetch_add(1, Ordering::Relaxed) + 1;
        self.files.write().insert(
            key,
            MemoryFile {
                data: Arc::new(contents.into()),
                modification_time,
            },
        );
    }

    /// Removes a file. Returns `true` if it existed.
    pub fn remove(&self, path: &str) -> bool {
        self.files.write().remove(&normalize(path)).is_some()
    }

    /// Number of files stored.
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    /// Returns `true` if no files are stored.
    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

fn normalize(path: &str) -> String {
    simplify_segments(path).join("/")
}

fn marker_key(marker: &Marker) -> Option<&str> {
    std::str::from_utf8(marker).ok()
}

fn parent_of(key: &str) -> &str {
    key.rfind('/').map_or("", |index| &key[..index])
}

impl FileSystem for MemoryFileSystem {
    fn try_translate(&self, path: &str) -> TranslateResult {
        let marker = path_marker(path);
        if marker.is_empty() {
            TranslateResult::Invalid
        } else {
            TranslateResult::Success(marker)
        }
    }

    fn try_load(&self, marker: &Marker) -> Result<Blob, IoError> {
        let key = marker_key(marker).ok_or(IoError::Invalid)?;
        self.files
            .read()
            .get(key)
            .map(|file| Arc::clone(&file.data))
            .ok_or(IoError::FileNotFound)
    }

    fn try_get_desc(&self, marker: &Marker) -> FileDesc {
        let Some(key) = marker_key(marker) else {
            return FileDesc::missing();
        };
        match self.files.read().get(key) {
            Some(file) => FileDesc {
                natural_name: key.to_owned(),
                mounted_name: key.to_owned(),
                snapshot: FileSnapshot {
                    state: FileState::Normal,
                    modification_time: file.modification_time,
                },
                size: file.data.len() as u64,
            },
            None => FileDesc {
                natural_name: key.to_owned(),
                mounted_name: key.to_owned(),
                ..FileDesc::missing()
            },
        }
    }

    fn as_searchable(&self) -> Option<&dyn SearchableFileSystem> {
        Some(self)
    }
}

impl SearchableFileSystem for MemoryFileSystem {
    fn find_files(&self, base_directory: &str, pattern: &str) -> Vec<Marker> {
        let pattern = match glob::Pattern::new(pattern) {
            Ok(pattern) => pattern,
            Err(error) => {
                log::warn!("Ignoring invalid file pattern '{pattern}': {error}");
                return Vec::new();
            }
        };
        let base = normalize(base_directory);
        self.files
            .read()
            .keys()
            .filter(|key| parent_of(key) == base && pattern.matches(file_name(key)))
            .map(|key| key.as_bytes().to_vec())
            .collect()
    }

    fn find_sub_directories(&self, base_directory: &str) -> Vec<String> {
        let base = normalize(base_directory);
        let mut found: Vec<String> = Vec::new();
        for key in self.files.read().keys() {
            let rest = if base.is_empty() {
                key.as_str()
            } else {
                match key.strip_prefix(base.as_str()).and_then(|r| r.strip_prefix('/')) {
                    Some(rest) => rest,
                    None => continue,
                }
            };
            if let Some((directory, _)) = rest.split_once('/') {
                if !found.iter().any(|d| d == directory) {
                    found.push(directory.to_owned());
                }
            }
        }
        found
    }
}

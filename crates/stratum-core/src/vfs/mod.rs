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

//! The filesystem capability consumed by the mounting tree.
//!
//! A [`FileSystem`] is any backing store that can be mounted under a logical
//! path prefix: the OS filesystem, an archive, or a purely virtual store. The
//! mounting tree never opens anything itself; it only asks a filesystem to
//! translate a path into an opaque [`Marker`] and hands that marker back to
//! the same filesystem for every later operation.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// The opaque, filesystem-specific descriptor of a path.
///
/// Only the filesystem that produced a marker knows how to interpret it.
pub type Marker = Vec<u8>;

/// The full contents of a file, shared without copying.
pub type Blob = Arc<Vec<u8>>;

/// Outcome of asking a filesystem to translate a path into a [`Marker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslateResult {
    /// The path is addressable in this filesystem. It may still not exist.
    Success(Marker),
    /// The filesystem is still mounting; the path may become addressable later.
    Pending,
    /// The path can never be addressed by this filesystem.
    Invalid,
}

/// Existence state of a file at the time it was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FileState {
    /// Nothing exists at the path.
    DoesNotExist,
    /// A regular, readable file.
    Normal,
    /// The owning filesystem has not finished mounting.
    Pending,
}

/// A point-in-time observation of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileSnapshot {
    /// Existence state.
    pub state: FileState,
    /// Filesystem-defined modification stamp; only comparable within one filesystem.
    pub modification_time: u64,
}

impl FileSnapshot {
    /// The snapshot of a file that does not exist.
    pub const fn missing() -> Self {
        Self {
            state: FileState::DoesNotExist,
            modification_time: 0,
        }
    }
}

/// Description of a file object within a filesystem.
///
/// Some filesystems map several names onto one object (case-insensitive
/// stores, for example). `natural_name` is the form closest to how the
/// object is stored internally; `mounted_name` is the name as seen through
/// the mounting tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDesc {
    /// Name as stored by the filesystem.
    pub natural_name: String,
    /// Name as seen through the mount it was reached by.
    pub mounted_name: String,
    /// Existence and modification stamp.
    pub snapshot: FileSnapshot,
    /// Size in bytes.
    pub size: u64,
}

impl FileDesc {
    /// The description of a file that does not exist.
    pub fn missing() -> Self {
        Self {
            natural_name: String::new(),
            mounted_name: String::new(),
            snapshot: FileSnapshot::missing(),
            size: 0,
        }
    }
}

/// Errors reported by filesystem operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IoError {
    /// No file exists for the marker or path.
    #[error("file not found")]
    FileNotFound,
    /// The marker or path is not valid for this filesystem.
    #[error("invalid marker or path")]
    Invalid,
    /// The filesystem is still mounting.
    #[error("filesystem is still mounting")]
    Mounting,
    /// The file exists but cannot be accessed.
    #[error("access denied")]
    AccessDenied,
    /// Any other backing store failure.
    #[error("I/O failure: {0}")]
    Other(String),
}

impl IoError {
    /// Returns `true` for the outcomes that mean "try the next candidate".
    pub fn is_not_found(&self) -> bool {
        matches!(self, IoError::FileNotFound | IoError::Invalid)
    }
}

/// Interface for a mountable backing store.
pub trait FileSystem: Send + Sync {
    /// Translates a path, relative to the mount point, into a [`Marker`].
    ///
    /// Translation is cheap and must not perform existence checks that cost
    /// I/O: a successful translation only means the path is addressable.
    fn try_translate(&self, path: &str) -> TranslateResult;

    /// Loads the entire contents of the file identified by `marker`.
    fn try_load(&self, marker: &Marker) -> Result<Blob, IoError>;

    /// Describes the file identified by `marker`. Missing files are reported
    /// through [`FileState::DoesNotExist`] rather than an error.
    fn try_get_desc(&self, marker: &Marker) -> FileDesc;

    /// Returns the searchable facet of this filesystem, if it has one.
    fn as_searchable(&self) -> Option<&dyn SearchableFileSystem> {
        None
    }
}

/// Optional facet of a filesystem that supports directory enumeration.
pub trait SearchableFileSystem: Send + Sync {
    /// Finds files directly inside `base_directory` whose name matches
    /// `pattern`, a glob (`*`, `?`, `[...]`) applied to the bare file name.
    fn find_files(&self, base_directory: &str, pattern: &str) -> Vec<Marker>;

    /// Lists the names of the directories directly inside `base_directory`.
    fn find_sub_directories(&self, base_directory: &str) -> Vec<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_classification() {
        assert!(IoError::FileNotFound.is_not_found());
        assert!(IoError::Invalid.is_not_found());
        assert!(!IoError::AccessDenied.is_not_found());
    }
}

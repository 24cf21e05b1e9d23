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

//! # Stratum IO
//!
//! The virtual file namespace of the asset substrate. A [`MountingTree`]
//! resolves logical paths against several overlapping, independently
//! mounted filesystems. Lookups advance lazily and lock-free, reporting
//! invalidation instead of waiting on concurrent mounts.

#![warn(missing_docs)]

pub mod lookup;
pub mod memory;
pub mod mount;
pub mod path;
pub mod tree;
pub mod walker;

pub use lookup::{Candidate, LookupCursor, LookupResult, MEMOIZED_SEGMENTS};
pub use memory::MemoryFileSystem;
pub use mount::MountId;
pub use path::FilenameRules;
pub use tree::MountingTree;
pub use walker::{FileSystemWalker, Invalidated, WalkedDirectory, WalkedFile};

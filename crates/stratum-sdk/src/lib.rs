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

//! The public entry point of the stratum asset substrate.
//!
//! Re-exports the building blocks and adds the ambient pieces a host needs
//! to start them: RON configuration, logging bootstrap, and the
//! [`AssetServices`] container.

#![warn(missing_docs)]

pub mod config;
pub mod services;

pub use config::{ConfigError, MountConfig, MountSource, StratumConfig};
pub use services::AssetServices;

pub use stratum_core;
pub use stratum_data;
pub use stratum_io;

/// Commonly used types, for glob import.
pub mod prelude {
    pub use crate::{AssetServices, StratumConfig};
    pub use stratum_core::asset::{Asset, AssetHeap, AssetState, AssetUUID, TypeKey, UpdateRecord};
    pub use stratum_core::vfs::{FileDesc, FileState, FileSystem, IoError};
    pub use stratum_data::{AssetSetManager, Assets, FrameBarrierId};
    pub use stratum_io::{LookupResult, MemoryFileSystem, MountId, MountingTree};
}

/// Initializes `env_logger` with `default_filter` unless `RUST_LOG` is set.
///
/// Safe to call more than once; only the first call installs the logger.
pub fn init_logging(default_filter: &str) {
    use env_logger::{Builder, Env};

    if Builder::from_env(Env::default().default_filter_or(default_filter))
        .try_init()
        .is_err()
    {
        log::trace!("Logger already initialized.");
    }
}

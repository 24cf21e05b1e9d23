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

//! Start-up configuration of the asset substrate, stored as RON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stratum_core::vfs::FileSystem;
use stratum_data::AssetSetConfig;
use stratum_io::{FilenameRules, MemoryFileSystem};
use thiserror::Error;

/// Errors raised while loading or saving a [`StratumConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read or written.
    #[error("configuration file {path}: {source}")]
    Io {
        /// The offending path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The text is not a valid configuration.
    #[error("invalid configuration: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// The configuration could not be rendered as RON.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] ron::Error),
}

/// Where the files of a configured mount come from.
///
/// Only in-memory stores can be described in a configuration file; OS
/// directories and archives are mounted programmatically by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MountSource {
    /// An in-memory filesystem seeded with the given text files.
    Memory {
        /// Relative path to file contents.
        #[serde(default)]
        files: BTreeMap<String, String>,
    },
}

impl MountSource {
    /// Builds the filesystem this source describes.
    pub fn build(&self) -> Arc<dyn FileSystem> {
        match self {
            MountSource::Memory { files } => {
                let file_system = MemoryFileSystem::new();
                for (path, contents) in files {
                    file_system.insert(path, contents.as_bytes());
                }
                Arc::new(file_system)
            }
        }
    }
}

/// One mount to install at start-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountConfig {
    /// Logical prefix the filesystem is mounted under. Empty mounts at the root.
    pub prefix: String,
    /// The filesystem to mount.
    pub source: MountSource,
}

/// Top-level configuration of the asset substrate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StratumConfig {
    /// Filename comparison rules of the mounting tree.
    pub filename_rules: FilenameRules,
    /// Asset set manager tunables.
    pub asset_sets: AssetSetConfig,
    /// Mounts installed in order, so earlier entries win ties.
    pub mounts: Vec<MountConfig>,
    /// Filesystem consulted when no mount yields a candidate.
    pub default_file_system: Option<MountSource>,
}

impl StratumConfig {
    /// Parses a configuration from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Loads a configuration from a RON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ron_str(&text)?;
        log::debug!(
            "Loaded stratum configuration from {} ({} mount(s)).",
            path.display(),
            config.mounts.len()
        );
        Ok(config)
    }

    /// Renders the configuration as pretty-printed RON.
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        let pretty = ron::ser::PrettyConfig::default().indentor("  ".to_string());
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }

    /// Writes the configuration to a RON file.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_ron_string()?).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

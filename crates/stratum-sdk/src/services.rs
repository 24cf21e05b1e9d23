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

//! The top-level container owning the substrate's shared services.

use crate::config::{ConfigError, StratumConfig};
use std::path::Path;
use std::sync::Arc;
use stratum_core::ServiceRegistry;
use stratum_data::AssetSetManager;
use stratum_io::{MountId, MountingTree};

/// Builds and owns the mounting tree and the asset set manager.
///
/// Both are created explicitly from a [`StratumConfig`], shared as `Arc`s,
/// and registered in a [`ServiceRegistry`] so subsystems can look them up
/// by type. The thread calling [`AssetServices::new`] becomes the asset set
/// manager's home thread.
pub struct AssetServices {
    mounting_tree: Arc<MountingTree>,
    asset_sets: Arc<AssetSetManager>,
    registry: ServiceRegistry,
    configured_mounts: Vec<MountId>,
}

impl AssetServices {
    /// Creates the services and installs every configured mount, in order.
    pub fn new(config: &StratumConfig) -> Self {
        let mounting_tree = Arc::new(MountingTree::new(config.filename_rules));
        let configured_mounts = config
            .mounts
            .iter()
            .map(|mount| mounting_tree.mount(&mount.prefix, mount.source.build()))
            .collect::<Vec<_>>();
        if let Some(source) = &config.default_file_system {
            mounting_tree.set_default_file_system(Some(source.build()));
        }

        let asset_sets = Arc::new(AssetSetManager::new(config.asset_sets.clone()));

        let mut registry = ServiceRegistry::new();
        registry.insert(Arc::clone(&mounting_tree));
        registry.insert(Arc::clone(&asset_sets));

        log::info!(
            "Asset services started with {} configured mount(s){}.",
            configured_mounts.len(),
            if config.default_file_system.is_some() {
                " and a default filesystem"
            } else {
                ""
            }
        );

        Self {
            mounting_tree,
            asset_sets,
            registry,
            configured_mounts,
        }
    }

    /// Loads a RON configuration file and builds the services from it.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Ok(Self::new(&StratumConfig::from_file(path)?))
    }

    /// The shared mounting tree.
    pub fn mounting_tree(&self) -> &Arc<MountingTree> {
        &self.mounting_tree
    }

    /// The shared asset set manager.
    pub fn asset_sets(&self) -> &Arc<AssetSetManager> {
        &self.asset_sets
    }

    /// The registry both services are published in.
    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Ids of the mounts installed from the configuration, in order.
    pub fn configured_mounts(&self) -> &[MountId] {
        &self.configured_mounts
    }

    /// Runs one frame barrier pass of the asset set manager.
    pub fn on_frame_barrier(&self) -> anyhow::Result<()> {
        self.asset_sets.on_frame_barrier()?;
        Ok(())
    }

    /// Drops every asset heap and unmounts the configured mounts. Mounts
    /// added later by other code are left in place.
    pub fn shutdown(&self) {
        self.asset_sets.clear();
        for id in &self.configured_mounts {
            self.mounting_tree.unmount(*id);
        }
        log::info!("Asset services shut down.");
    }
}

impl Default for AssetServices {
    fn default() -> Self {
        Self::new(&StratumConfig::default())
    }
}

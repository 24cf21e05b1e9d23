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

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables of the asset set manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSetConfig {
    /// How long the home thread may wait on an asset before a stall warning
    /// is logged, in milliseconds.
    pub stall_threshold_ms: u64,
}

impl AssetSetConfig {
    /// The stall threshold as a [`Duration`].
    pub fn stall_threshold(&self) -> Duration {
        Duration::from_millis(self.stall_threshold_ms)
    }
}

impl Default for AssetSetConfig {
    fn default() -> Self {
        Self {
            stall_threshold_ms: 100,
        }
    }
}

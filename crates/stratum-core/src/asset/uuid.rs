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
use std::fmt;
use uuid::Uuid;

/// Stable identity of a single asset inside a heap.
///
/// Identities derived from an initializer string with [`AssetUUID::from_initializer`]
/// are deterministic, so the same logical request always maps onto the same
/// heap slot and the same key in update notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetUUID(Uuid);

impl AssetUUID {
    /// Derives a deterministic (version 5) `AssetUUID` from an initializer,
    /// typically the logical path the asset was requested with.
    pub fn from_initializer(initializer: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_URL, initializer.as_bytes()))
    }
}

impl fmt::Display for AssetUUID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initializer_ids_are_deterministic() {
        let a = AssetUUID::from_initializer("textures/grass.dds");
        let b = AssetUUID::from_initializer("textures/grass.dds");
        let c = AssetUUID::from_initializer("textures/stone.dds");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn display_is_the_hyphenated_uuid() {
        let id = AssetUUID::from_initializer("meshes/rock.obj");
        let text = id.to_string();
        assert_eq!(text.len(), 36);
        assert_eq!(text.matches('-').count(), 4);
    }
}

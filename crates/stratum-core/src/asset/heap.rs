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

//! The asset heap capability and the records it publishes.
//!
//! An asset heap is a per-type cache of live assets. The asset set manager
//! owns exactly one heap per type and never looks inside it beyond the
//! [`AssetHeap`] contract: binding to its update signal and asking it to
//! recompute its cached marker state.

use super::AssetUUID;
use crate::signal::SignalId;
use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use xxhash_rust::xxh3::Xxh3;

/// A stable, process-wide tag identifying an asset heap's type.
///
/// The key is the 64-bit hash of the type's [`TypeId`], so it is identical for
/// every caller in the process and can be carried around as a plain integer
/// (for example in marker hints issued from code that never names the type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeKey(u64);

impl TypeKey {
    /// Computes the key for `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        let mut hasher = Xxh3::new();
        TypeId::of::<T>().hash(&mut hasher);
        Self(hasher.finish())
    }

    /// Wraps a raw key value, e.g. one previously obtained with [`TypeKey::value`].
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw key value.
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// The lifecycle state of an asset as seen by its heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetState {
    /// Construction has been requested but has not completed.
    Pending,
    /// The asset is constructed and usable.
    Ready,
    /// Construction failed, or the asset was removed or invalidated.
    Invalid,
}

/// A snapshot of one asset slot in a heap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetHeapRecord {
    /// The human readable initializer the asset was requested with.
    pub initializer: String,
    /// Current state of the asset.
    pub state: AssetState,
    /// Key of the heap type that owns the asset.
    pub type_key: TypeKey,
    /// Identifier of the slot inside its heap.
    pub id_in_heap: u64,
    /// How many times the slot has been (re)initialized.
    pub initialization_count: u32,
}

/// One entry of an update batch: an asset and its new heap state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRecord {
    /// The asset that changed.
    pub asset_key: AssetUUID,
    /// Its new state.
    pub record: AssetHeapRecord,
}

/// Callback receiving ordered batches of [`UpdateRecord`]s.
pub type UpdateCallback = Box<dyn Fn(&[UpdateRecord]) + Send + Sync>;

/// The contract every per-type asset heap fulfils towards the asset set manager.
pub trait AssetHeap: Send + Sync + 'static {
    /// The key this heap is registered under, i.e. `TypeKey::of::<Self>()`.
    fn type_key(&self) -> TypeKey;

    /// A readable name for the asset type, used in logs and diagnostics.
    fn type_name(&self) -> &'static str;

    /// Subscribes to the heap's private update signal.
    ///
    /// Batches must be delivered in the order the heap produced them.
    fn bind_update_signal(&self, callback: UpdateCallback) -> SignalId;

    /// Removes a subscription made with [`AssetHeap::bind_update_signal`].
    fn unbind_update_signal(&self, id: SignalId);

    /// Recomputes the heap's cached marker/summary state.
    fn update_marker_states(&self);

    /// Drops every asset held by the heap.
    fn clear(&self);

    /// Returns a snapshot of every slot, for diagnostics.
    fn log_records(&self) -> Vec<AssetHeapRecord>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Texture;
    struct Mesh;

    #[test]
    fn type_keys_are_stable_and_distinct() {
        assert_eq!(TypeKey::of::<Texture>(), TypeKey::of::<Texture>());
        assert_ne!(TypeKey::of::<Texture>(), TypeKey::of::<Mesh>());
    }

    #[test]
    fn raw_round_trip() {
        let key = TypeKey::of::<Mesh>();
        assert_eq!(TypeKey::from_raw(key.value()), key);
    }
}

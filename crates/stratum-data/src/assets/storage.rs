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

//! A generic, type-safe heap of loaded asset handles.

use parking_lot::{ReentrantMutex, RwLock};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use stratum_core::asset::{
    Asset, AssetHandle, AssetHeap, AssetHeapRecord, AssetState, AssetUUID, TypeKey, UpdateCallback,
    UpdateRecord,
};
use stratum_core::{Signal, SignalId};

/// Cached per-state counts of a heap, refreshed by
/// [`AssetHeap::update_marker_states`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkerSummary {
    /// Slots holding a usable asset.
    pub ready: usize,
    /// Slots waiting for construction.
    pub pending: usize,
    /// Slots whose construction failed or that were invalidated.
    pub invalid: usize,
    /// Number of recomputes so far.
    pub generation: u64,
}

struct Slot<A: Asset> {
    handle: Option<AssetHandle<A>>,
    record: AssetHeapRecord,
}

/// A central, in-memory cache for a specific type of asset `A`.
///
/// Assets are keyed by the [`AssetUUID`] derived from their initializer, so
/// the same logical request always lands on the same slot. Every state change
/// is published as a one-record batch on the heap's update signal, after the
/// storage lock is released. Publication is serialized, so subscribers see
/// batches in the order the changes were applied.
pub struct Assets<A: Asset> {
    storage: RwLock<HashMap<AssetUUID, Slot<A>>>,
    updates: Signal<[UpdateRecord]>,
    /// Held from a state change until its batch is delivered. Reentrant so a
    /// subscriber may change the same heap.
    publish: ReentrantMutex<()>,
    summary: RwLock<MarkerSummary>,
    next_slot_id: AtomicU64,
    _marker: PhantomData<fn() -> A>,
}

impl<A: Asset> Assets<A> {
    /// Creates a new, empty heap.
    pub fn new() -> Self {
        Self {
            storage: RwLock::new(HashMap::new()),
            updates: Signal::new(),
            publish: ReentrantMutex::new(()),
            summary: RwLock::new(MarkerSummary::default()),
            next_slot_id: AtomicU64::new(0),
            _marker: PhantomData,
        }
    }

    /// Stores `asset` as the ready value for `initializer`, replacing any
    /// previous value, and returns its key.
    pub fn insert(&self, initializer: &str, asset: A) -> AssetUUID {
        self.transition(initializer, AssetState::Ready, Some(AssetHandle::new(asset)))
    }

    /// Records that `initializer` has been requested but is not built yet.
    pub fn mark_pending(&self, initializer: &str) -> AssetUUID {
        self.transition(initializer, AssetState::Pending, None)
    }

    /// Records that building `initializer` failed. Any previous value is dropped.
    pub fn mark_invalid(&self, initializer: &str) -> AssetUUID {
        self.transition(initializer, AssetState::Invalid, None)
    }

    fn transition(&self, initializer: &str, state: AssetState, handle: Option<AssetHandle<A>>) -> AssetUUID {
        let key = AssetUUID::from_initializer(initializer);
        let _publishing = self.publish.lock();
        let record = {
            let mut storage = self.storage.write();
            let slot = storage.entry(key).or_insert_with(|| Slot {
                handle: None,
                record: AssetHeapRecord {
                    initializer: initializer.to_owned(),
                    state: AssetState::Pending,
                    type_key: TypeKey::of::<Self>(),
                    id_in_heap: self.next_slot_id.fetch_add(1, Ordering::Relaxed),
                    initialization_count: 0,
                },
            });
            if state == AssetState::Ready {
                slot.record.initialization_count += 1;
            }
            slot.record.state = state;
            slot.handle = handle;
            slot.record.clone()
        };
        self.updates.invoke(&[UpdateRecord {
            asset_key: key,
            record,
        }]);
        key
    }

    /// Retrieves the ready asset stored under `uuid`.
    pub fn get(&self, uuid: &AssetUUID) -> Option<AssetHandle<A>> {
        self.storage.read().get(uuid).and_then(|slot| slot.handle.clone())
    }

    /// Retrieves the ready asset requested with `initializer`.
    pub fn get_by_initializer(&self, initializer: &str) -> Option<AssetHandle<A>> {
        self.get(&AssetUUID::from_initializer(initializer))
    }

    /// Returns the current state of the slot under `uuid`, if any.
    pub fn state(&self, uuid: &AssetUUID) -> Option<AssetState> {
        self.storage.read().get(uuid).map(|slot| slot.record.state)
    }

    /// Checks if a slot exists for `uuid`, whatever its state.
    pub fn contains(&self, uuid: &AssetUUID) -> bool {
        self.storage.read().contains_key(uuid)
    }

    /// Removes the slot under `uuid`, publishing it as [`AssetState::Invalid`].
    pub fn remove(&self, uuid: &AssetUUID) -> bool {
        let _publishing = self.publish.lock();
        let Some(slot) = self.storage.write().remove(uuid) else {
            return false;
        };
        let mut record = slot.record;
        record.state = AssetState::Invalid;
        self.updates.invoke(&[UpdateRecord {
            asset_key: *uuid,
            record,
        }]);
        true
    }

    /// Number of slots, whatever their state.
    pub fn len(&self) -> usize {
        self.storage.read().len()
    }

    /// Returns `true` if the heap holds no slot.
    pub fn is_empty(&self) -> bool {
        self.storage.read().is_empty()
    }

    /// The summary computed by the last marker recompute.
    pub fn marker_summary(&self) -> MarkerSummary {
        *self.summary.read()
    }
}

impl<A: Asset> Default for Assets<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Asset> AssetHeap for Assets<A> {
    fn type_key(&self) -> TypeKey {
        TypeKey::of::<Self>()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<A>()
    }

    fn bind_update_signal(&self, callback: UpdateCallback) -> SignalId {
        self.updates.bind(callback)
    }

    fn unbind_update_signal(&self, id: SignalId) {
        self.updates.unbind(id);
    }

    fn update_marker_states(&self) {
        let mut summary = MarkerSummary::default();
        for slot in self.storage.read().values() {
            match slot.record.state {
                AssetState::Ready => summary.ready += 1,
                AssetState::Pending => summary.pending += 1,
                AssetState::Invalid => summary.invalid += 1,
            }
        }
        let mut cached = self.summary.write();
        summary.generation = cached.generation + 1;
        *cached = summary;
    }

    fn clear(&self) {
        let cleared = std::mem::take(&mut *self.storage.write());
        log::debug!("Cleared {} '{}' asset(s).", cleared.len(), self.type_name());
    }

    fn log_records(&self) -> Vec<AssetHeapRecord> {
        let mut records: Vec<_> = self
            .storage
            .read()
            .values()
            .map(|slot| slot.record.clone())
            .collect();
        records.sort_by_key(|record| record.id_in_heap);
        records
    }
}

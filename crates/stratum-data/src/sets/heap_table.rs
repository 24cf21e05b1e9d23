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

//! The sorted type-key table behind the asset set manager.

use std::any::Any;
use std::sync::Arc;
use stratum_core::asset::{AssetHeap, TypeKey};
use stratum_core::SignalId;

/// One registered heap, kept both as a trait object for the manager's own
/// bookkeeping and as `Any` so typed lookups can hand back an `Arc<H>`.
#[derive(Clone)]
pub(crate) struct HeapSlot {
    pub heap: Arc<dyn AssetHeap>,
    pub typed: Arc<dyn Any + Send + Sync>,
    pub signal_id: SignalId,
}

/// Heaps sorted by type key. Heaps created while a frame barrier pass is
/// running go to `pending` and are merged into `live` by the pass itself.
#[derive(Default)]
pub(crate) struct HeapTable {
    live: Vec<(TypeKey, HeapSlot)>,
    pending: Vec<(TypeKey, HeapSlot)>,
}

fn search(table: &[(TypeKey, HeapSlot)], key: TypeKey) -> Result<usize, usize> {
    table.binary_search_by_key(&key, |(k, _)| *k)
}

impl HeapTable {
    /// Finds `key` in the live table, then in the pending one.
    pub fn find(&self, key: TypeKey) -> Option<&HeapSlot> {
        search(&self.live, key)
            .ok()
            .map(|index| &self.live[index].1)
            .or_else(|| search(&self.pending, key).ok().map(|index| &self.pending[index].1))
    }

    /// Inserts a heap for a key that [`find`](Self::find) just reported absent.
    pub fn insert(&mut self, key: TypeKey, slot: HeapSlot, staged: bool) {
        let table = if staged { &mut self.pending } else { &mut self.live };
        match search(table, key) {
            Ok(index) => table[index].1 = slot,
            Err(index) => table.insert(index, (key, slot)),
        }
    }

    pub fn merge_pending(&mut self) -> usize {
        let count = self.pending.len();
        if count == 0 {
            return 0;
        }
        self.live.append(&mut self.pending);
        self.live.sort_by_key(|(key, _)| *key);
        count
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn get(&self, index: usize) -> Option<&HeapSlot> {
        self.live.get(index).map(|(_, slot)| slot)
    }

    /// Every heap, live and pending.
    pub fn heaps(&self) -> Vec<Arc<dyn AssetHeap>> {
        self.live
            .iter()
            .chain(self.pending.iter())
            .map(|(_, slot)| Arc::clone(&slot.heap))
            .collect()
    }

    pub fn take_all(&mut self) -> Vec<HeapSlot> {
        self.live
            .drain(..)
            .chain(self.pending.drain(..))
            .map(|(_, slot)| slot)
            .collect()
    }
}

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

//! Registration tables for frame barrier callbacks.
//!
//! The scheduler itself is a plain data structure; the locking, the
//! `iterating` flag and the ordering of a pass live in the manager. While a
//! pass is running, registrations and deregistrations are staged here and
//! folded in by the manager at the end of the pass.

use std::fmt;
use std::sync::Arc;

/// Identifier returned when a frame barrier callback is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameBarrierId(u32);

impl FrameBarrierId {
    /// Returns the raw numeric value of the id.
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FrameBarrierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A callback run once per frame barrier pass on the home thread.
pub type FrameBarrierCallback = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

#[derive(Default)]
pub(crate) struct FrameBarrierScheduler {
    next_id: u32,
    live: Vec<(FrameBarrierId, FrameBarrierCallback)>,
    pending_add: Vec<(FrameBarrierId, FrameBarrierCallback)>,
    pending_remove: Vec<FrameBarrierId>,
}

impl FrameBarrierScheduler {
    pub fn register(&mut self, callback: FrameBarrierCallback, staged: bool) -> FrameBarrierId {
        self.next_id += 1;
        let id = FrameBarrierId(self.next_id);
        if staged {
            self.pending_add.push((id, callback));
        } else {
            self.live.push((id, callback));
        }
        id
    }

    /// Removes `id` right away, or marks it for removal at the end of the
    /// running pass. Returns the callback if it was dropped from the tables
    /// immediately, so the caller can release it outside any borrow.
    pub fn deregister(&mut self, id: FrameBarrierId, staged: bool) -> Option<FrameBarrierCallback> {
        if staged {
            // A callback registered and deregistered within the same pass never runs.
            if let Some(index) = self.pending_add.iter().position(|(i, _)| *i == id) {
                return Some(self.pending_add.remove(index).1);
            }
            if self.live.iter().any(|(i, _)| *i == id) && !self.pending_remove.contains(&id) {
                self.pending_remove.push(id);
            }
            None
        } else {
            let index = self.live.iter().position(|(i, _)| *i == id)?;
            Some(self.live.remove(index).1)
        }
    }

    /// The callbacks a pass starting now would run, in registration order.
    pub fn snapshot(&self) -> Vec<(FrameBarrierId, FrameBarrierCallback)> {
        self.live
            .iter()
            .map(|(id, callback)| (*id, Arc::clone(callback)))
            .collect()
    }

    pub fn is_pending_removal(&self, id: FrameBarrierId) -> bool {
        self.pending_remove.contains(&id)
    }

    pub fn merge_pending_adds(&mut self) -> usize {
        let count = self.pending_add.len();
        self.live.append(&mut self.pending_add);
        count
    }

    pub fn apply_pending_removals(&mut self) -> Vec<FrameBarrierCallback> {
        let pending = std::mem::take(&mut self.pending_remove);
        let mut removed = Vec::with_capacity(pending.len());
        self.live.retain(|(id, callback)| {
            if pending.contains(id) {
                removed.push(Arc::clone(callback));
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Empties every table, handing the callbacks back to the caller.
    pub fn take_all(&mut self) -> Vec<FrameBarrierCallback> {
        self.pending_remove.clear();
        self.live
            .drain(..)
            .chain(self.pending_add.drain(..))
            .map(|(_, callback)| callback)
            .collect()
    }
}

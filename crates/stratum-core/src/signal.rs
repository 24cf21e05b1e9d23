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

//! A generic multi-subscriber callback bus.
//!
//! [`Signal`] is the primitive behind per-heap update notifications, their
//! aggregation in the asset set manager, and any other "tell everyone who
//! cares" plumbing in the substrate. Subscribers are plain closures; binding
//! returns a [`SignalId`] that is later used to unbind.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Opaque identifier of a subscriber bound to a [`Signal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SignalId(u64);

impl SignalId {
    /// Returns the raw numeric value of the id.
    pub fn value(self) -> u64 {
        self.0
    }
}

type Slot<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A multi-subscriber callback bus carrying payloads of type `T`.
///
/// `T` may be unsized, so a signal can carry slices (`Signal<[Record]>`)
/// without forcing every invocation to allocate.
pub struct Signal<T: ?Sized> {
    next_id: AtomicU64,
    slots: Mutex<Vec<(SignalId, Slot<T>)>>,
}

impl<T: ?Sized> Signal<T> {
    /// Creates a signal with no subscribers.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            slots: Mutex::new(Vec::new()),
        }
    }

    /// Binds a new subscriber and returns the id used to unbind it.
    pub fn bind<F>(&self, callback: F) -> SignalId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SignalId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.slots.lock().push((id, Arc::new(callback)));
        id
    }

    /// Unbinds a subscriber. Unknown ids are ignored.
    ///
    /// Returns `true` if a subscriber was removed.
    pub fn unbind(&self, id: SignalId) -> bool {
        let mut slots = self.slots.lock();
        match slots.iter().position(|(slot_id, _)| *slot_id == id) {
            Some(index) => {
                slots.remove(index);
                true
            }
            None => false,
        }
    }

    /// Invokes every subscriber, in bind order, with `payload`.
    ///
    /// The subscriber list is snapshotted before the first call and the
    /// internal lock is not held while subscribers run, so a subscriber may
    /// bind or unbind (itself included) without deadlocking. Such changes take
    /// effect from the next invocation.
    pub fn invoke(&self, payload: &T) {
        let snapshot: Vec<Slot<T>> = self
            .slots
            .lock()
            .iter()
            .map(|(_, slot)| Arc::clone(slot))
            .collect();
        for slot in snapshot {
            slot(payload);
        }
    }

    /// Returns the number of currently bound subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.slots.lock().len()
    }

    /// Returns `true` if nobody is listening.
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}

impl<T> Signal<T>
where
    T: ToOwned + ?Sized,
    T::Owned: Send + 'static,
{
    /// Binds a subscriber that forwards an owned copy of every payload into a
    /// channel.
    ///
    /// The returned [`SignalId`] must still be unbound by the caller once the
    /// receiver is no longer wanted; until then payloads sent to a dropped
    /// receiver are discarded.
    pub fn subscribe(&self) -> (SignalId, flume::Receiver<T::Owned>) {
        let (sender, receiver) = flume::unbounded();
        let id = self.bind(move |payload: &T| {
            if sender.send(payload.to_owned()).is_err() {
                log::trace!("Signal payload dropped: receiver disconnected.");
            }
        });
        (id, receiver)
    }
}

impl<T: ?Sized> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

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

//! The asset set manager: one heap per asset type, and the frame barrier.

use super::config::AssetSetConfig;
use super::error::{AssetSetError, AssetSetResult};
use super::frame_barrier::{FrameBarrierCallback, FrameBarrierId, FrameBarrierScheduler};
use super::heap_table::{HeapSlot, HeapTable};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::any::{type_name, Any};
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use stratum_core::asset::{AssetHeap, AssetHeapRecord, TypeKey, UpdateRecord};
use stratum_core::{HomeThread, Signal, SignalId};

#[derive(Default)]
struct ManagerState {
    heaps: HeapTable,
    callbacks: FrameBarrierScheduler,
    /// Sorted and de-duplicated.
    marker_hints: Vec<TypeKey>,
    iterating: bool,
}

/// Owns one asset heap per type and drives the per-frame barrier.
///
/// All state sits behind a single reentrant lock. A heap constructor or a
/// frame barrier callback may therefore call back into the manager from the
/// thread that already holds it; mutations made while a frame barrier pass is
/// running are staged and applied when the pass ends.
///
/// Heap update batches from every registered heap are re-broadcast, in
/// order, on a single aggregate signal (see [`bind_update_signal`]).
///
/// [`bind_update_signal`]: AssetSetManager::bind_update_signal
pub struct AssetSetManager {
    state: ReentrantMutex<RefCell<ManagerState>>,
    update_propagation: Arc<Signal<[UpdateRecord]>>,
    home_thread: HomeThread,
    config: AssetSetConfig,
}

/// Holds the manager's lock, giving the current thread a consistent view
/// across several calls. Released on drop.
#[must_use = "the asset set lock is released as soon as the guard is dropped"]
pub struct AssetSetGuard<'a> {
    _guard: ReentrantMutexGuard<'a, RefCell<ManagerState>>,
}

/// Clears the `iterating` flag if a pass unwinds. A pass that completes
/// clears it itself, under the same lock as its final bookkeeping, and
/// disarms the reset.
struct IterationReset<'a> {
    manager: &'a AssetSetManager,
    armed: bool,
}

impl Drop for IterationReset<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let guard = self.manager.state.lock();
        if let Ok(mut state) = guard.try_borrow_mut() {
            state.iterating = false;
        };
    }
}

impl AssetSetManager {
    /// Creates a manager owned by the calling thread.
    pub fn new(config: AssetSetConfig) -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(ManagerState::default())),
            update_propagation: Arc::new(Signal::new()),
            home_thread: HomeThread::current(),
            config,
        }
    }

    /// The configuration the manager was created with.
    pub fn config(&self) -> &AssetSetConfig {
        &self.config
    }

    /// Returns the heap for `H`, default-constructing it on first use.
    pub fn get_or_create<H>(&self) -> AssetSetResult<Arc<H>>
    where
        H: AssetHeap + Default,
    {
        self.get_or_create_with(|| Ok(H::default()))
    }

    /// Returns the heap for `H`, building it with `construct` on first use.
    ///
    /// The constructor runs with the manager's lock held but no internal
    /// state borrowed, so it may itself call `get_or_create_with` for other
    /// heap types. Concurrent callers asking for the same type are serialized
    /// and observe the same instance; `construct` runs at most once per
    /// successful registration.
    ///
    /// A heap created while a frame barrier pass is running is visible to
    /// lookups immediately but only joins [`asset_set`](Self::asset_set)
    /// iteration after the pass.
    pub fn get_or_create_with<H, F>(&self, construct: F) -> AssetSetResult<Arc<H>>
    where
        H: AssetHeap,
        F: FnOnce() -> anyhow::Result<H>,
    {
        let key = TypeKey::of::<H>();
        let guard = self.state.lock();

        let existing = Self::find_typed::<H>(&guard.borrow(), key)?;
        if let Some(existing) = existing {
            return Ok(existing);
        }

        let heap = construct().map_err(|source| AssetSetError::HeapConstruction {
            type_name: type_name::<H>(),
            source,
        })?;
        let heap = Arc::new(heap);

        // The constructor may have re-entered and registered `H` already.
        let existing = Self::find_typed::<H>(&guard.borrow(), key)?;
        if let Some(existing) = existing {
            log::warn!(
                "Heap for '{}' was registered while it was being constructed; discarding the duplicate.",
                type_name::<H>()
            );
            return Ok(existing);
        }

        let aggregate = Arc::clone(&self.update_propagation);
        let signal_id =
            heap.bind_update_signal(Box::new(move |batch: &[UpdateRecord]| aggregate.invoke(batch)));

        let mut state = guard.borrow_mut();
        let staged = state.iterating;
        state.heaps.insert(
            key,
            HeapSlot {
                heap: Arc::clone(&heap) as Arc<dyn AssetHeap>,
                typed: Arc::clone(&heap) as Arc<dyn Any + Send + Sync>,
                signal_id,
            },
            staged,
        );
        log::debug!(
            "Registered asset heap '{}' ({}){}.",
            type_name::<H>(),
            key,
            if staged { " during a frame barrier pass" } else { "" }
        );
        Ok(heap)
    }

    fn find_typed<H: AssetHeap>(state: &ManagerState, key: TypeKey) -> AssetSetResult<Option<Arc<H>>> {
        let Some(slot) = state.heaps.find(key) else {
            return Ok(None);
        };
        Arc::clone(&slot.typed)
            .downcast::<H>()
            .map(Some)
            .map_err(|_| AssetSetError::TypeKeyCollision {
                key,
                type_name: type_name::<H>(),
            })
    }

    /// Number of heaps visible to index-based iteration.
    pub fn asset_set_count(&self) -> usize {
        self.state.lock().borrow().heaps.len()
    }

    /// The heap at `index` in type-key order, or `None` past the end.
    pub fn asset_set(&self, index: usize) -> Option<Arc<dyn AssetHeap>> {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.heaps.get(index).map(|slot| Arc::clone(&slot.heap))
    }

    /// Registers a callback to run on every frame barrier pass.
    ///
    /// Registering from inside a running pass defers the callback to the
    /// next pass.
    pub fn register_frame_barrier_callback<F>(&self, callback: F) -> FrameBarrierId
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let callback: FrameBarrierCallback = Arc::new(callback);
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        let staged = state.iterating;
        state.callbacks.register(callback, staged)
    }

    /// Removes a frame barrier callback. Unknown ids are ignored.
    ///
    /// From inside a running pass the callback will not be invoked again,
    /// not even later in the same pass.
    pub fn deregister_frame_barrier_callback(&self, id: FrameBarrierId) {
        let guard = self.state.lock();
        let removed = {
            let mut state = guard.borrow_mut();
            let staged = state.iterating;
            state.callbacks.deregister(id, staged)
        };
        // Dropped with no borrow held; its captures may call back into us.
        drop(removed);
    }

    /// Removes a frame barrier callback and hints that heap `type_key` needs
    /// its marker state recomputed, atomically.
    pub fn deregister_frame_barrier_callback_with_hint(&self, id: FrameBarrierId, type_key: TypeKey) {
        let _guard = self.state.lock();
        self.deregister_frame_barrier_callback(id);
        self.hint_marker_updated(type_key);
    }

    /// Marks heap `type_key` for a marker recompute at the end of the next
    /// frame barrier pass. Repeated hints collapse into one recompute.
    pub fn hint_marker_updated(&self, type_key: TypeKey) {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        if let Err(index) = state.marker_hints.binary_search(&type_key) {
            state.marker_hints.insert(index, type_key);
        }
    }

    /// Runs one frame barrier pass. Must be called on the home thread.
    ///
    /// Callbacks run in registration order with the manager's lock released.
    /// After the callbacks, staged heaps and callbacks are merged, hinted
    /// heaps recompute their marker state, and staged deregistrations are
    /// applied.
    ///
    /// If a callback fails, the remaining callbacks of this pass are skipped
    /// but the rest of the pass still runs, then the error is returned.
    ///
    /// # Panics
    ///
    /// Panics off the home thread, or when called from inside a pass.
    pub fn on_frame_barrier(&self) -> AssetSetResult<()> {
        assert!(
            self.home_thread.is_current(),
            "on_frame_barrier called off the asset set manager's home thread"
        );

        let callbacks = {
            let guard = self.state.lock();
            let mut state = guard.borrow_mut();
            assert!(!state.iterating, "on_frame_barrier re-entered during a frame barrier pass");
            state.iterating = true;
            state.callbacks.snapshot()
        };
        let mut reset = IterationReset {
            manager: self,
            armed: true,
        };

        let mut outcome = Ok(());
        for (id, callback) in callbacks {
            if self.state.lock().borrow().callbacks.is_pending_removal(id) {
                continue;
            }
            if let Err(source) = callback() {
                log::error!("Frame barrier callback {} failed: {:#}", id, source);
                outcome = Err(AssetSetError::FrameBarrierCallback { id, source });
                break;
            }
        }

        let guard = self.state.lock();
        let dirty = {
            let mut state = guard.borrow_mut();
            let heaps = state.heaps.merge_pending();
            let callbacks = state.callbacks.merge_pending_adds();
            if heaps + callbacks > 0 {
                log::trace!("Frame barrier merged {} heap(s) and {} callback(s).", heaps, callbacks);
            }
            let hints = std::mem::take(&mut state.marker_hints);
            let dirty: Vec<Arc<dyn AssetHeap>> = hints
                .into_iter()
                .filter_map(|key| state.heaps.find(key).map(|slot| Arc::clone(&slot.heap)))
                .collect();
            dirty
        };
        for heap in dirty {
            heap.update_marker_states();
        }
        let removed = {
            let mut state = guard.borrow_mut();
            let removed = state.callbacks.apply_pending_removals();
            state.iterating = false;
            removed
        };
        reset.armed = false;
        drop(guard);
        // Dropped unlocked; their captures may call back into us.
        drop(removed);

        outcome
    }

    /// Returns `true` while a frame barrier pass is running.
    pub fn is_in_frame_barrier(&self) -> bool {
        self.state.lock().borrow().iterating
    }

    /// Drops every heap, callback, pending entry and marker hint.
    ///
    /// # Panics
    ///
    /// Panics when called from inside a frame barrier pass.
    pub fn clear(&self) {
        let guard = self.state.lock();
        let (slots, callbacks) = {
            let mut state = guard.borrow_mut();
            assert!(!state.iterating, "AssetSetManager::clear called during a frame barrier pass");
            state.marker_hints.clear();
            (state.heaps.take_all(), state.callbacks.take_all())
        };
        for slot in &slots {
            slot.heap.unbind_update_signal(slot.signal_id);
        }
        log::debug!(
            "Cleared {} asset heap(s) and {} frame barrier callback(s).",
            slots.len(),
            callbacks.len()
        );
        drop(slots);
        drop(callbacks);
    }

    /// Acquires the manager's lock until the returned guard is dropped.
    ///
    /// The lock is reentrant: manager methods stay callable from the holding
    /// thread, while other threads block on their first manager call.
    pub fn lock(&self) -> AssetSetGuard<'_> {
        AssetSetGuard {
            _guard: self.state.lock(),
        }
    }

    /// Subscribes to update batches from every registered heap.
    ///
    /// Only batches produced after binding are delivered.
    pub fn bind_update_signal<F>(&self, callback: F) -> SignalId
    where
        F: Fn(&[UpdateRecord]) + Send + Sync + 'static,
    {
        self.update_propagation.bind(callback)
    }

    /// Removes a subscription made with [`bind_update_signal`](Self::bind_update_signal)
    /// or [`subscribe_updates`](Self::subscribe_updates).
    pub fn unbind_update_signal(&self, id: SignalId) -> bool {
        self.update_propagation.unbind(id)
    }

    /// Subscribes to update batches through a channel.
    pub fn subscribe_updates(&self) -> (SignalId, flume::Receiver<Vec<UpdateRecord>>) {
        self.update_propagation.subscribe()
    }

    /// Makes the calling thread the manager's home thread.
    pub fn bind_to_current_thread(&self) {
        self.home_thread.rebind_to_current();
        log::debug!("Asset set manager bound to thread {:?}.", self.home_thread.id());
    }

    /// Returns `true` on the manager's home thread.
    pub fn is_home_thread(&self) -> bool {
        self.home_thread.is_current()
    }

    /// Called by code waiting on an asset. On the home thread, once the wait
    /// started at `stall_start` exceeds the configured threshold, a warning
    /// is logged and `stall_start` is reset.
    ///
    /// Returns `true` if a warning was emitted.
    pub fn check_home_thread_stall(&self, stall_start: &mut Instant) -> bool {
        if !self.home_thread.is_current() {
            return false;
        }
        let elapsed = stall_start.elapsed();
        if elapsed <= self.config.stall_threshold() {
            return false;
        }
        log::warn!(
            "Home thread stalled for {} ms waiting on an asset.",
            elapsed.as_millis()
        );
        *stall_start = Instant::now();
        true
    }

    /// Snapshot of every slot of every heap, for diagnostics.
    pub fn log_records(&self) -> Vec<AssetHeapRecord> {
        let heaps = self.state.lock().borrow().heaps.heaps();
        heaps.iter().flat_map(|heap| heap.log_records()).collect()
    }
}

impl Default for AssetSetManager {
    fn default() -> Self {
        Self::new(AssetSetConfig::default())
    }
}

impl fmt::Debug for AssetSetManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.state.lock();
        let mut debug = f.debug_struct("AssetSetManager");
        match guard.try_borrow() {
            Ok(state) => debug
                .field("heaps", &state.heaps.len())
                .field("frame_barrier_callbacks", &state.callbacks.len())
                .field("iterating", &state.iterating),
            Err(_) => debug.field("state", &"<borrowed>"),
        };
        debug.field("home_thread", &self.home_thread.id()).finish()
    }
}

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

//! Thread identity helpers.

use parking_lot::RwLock;
use std::thread::{self, ThreadId};

/// Records the thread that owns a once-per-frame duty.
///
/// Some operations (the asset frame barrier, stall diagnostics) are only
/// meaningful on one designated thread. `HomeThread` remembers which one and
/// answers "am I it?" cheaply from any thread.
#[derive(Debug)]
pub struct HomeThread {
    id: RwLock<ThreadId>,
}

impl HomeThread {
    /// Binds to the calling thread.
    pub fn current() -> Self {
        Self {
            id: RwLock::new(thread::current().id()),
        }
    }

    /// Returns the bound thread's id.
    pub fn id(&self) -> ThreadId {
        *self.id.read()
    }

    /// Returns `true` if the calling thread is the bound thread.
    pub fn is_current(&self) -> bool {
        *self.id.read() == thread::current().id()
    }

    /// Moves the binding to the calling thread.
    pub fn rebind_to_current(&self) {
        *self.id.write() = thread::current().id();
    }
}

impl Default for HomeThread {
    fn default() -> Self {
        Self::current()
    }
}

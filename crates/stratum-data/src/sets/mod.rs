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

//! Asset set management: per-type heap registry and the frame barrier.

mod config;
mod error;
mod frame_barrier;
mod heap_table;
mod manager;

pub use config::AssetSetConfig;
pub use error::{AssetSetError, AssetSetResult};
pub use frame_barrier::{FrameBarrierCallback, FrameBarrierId};
pub use manager::{AssetSetGuard, AssetSetManager};

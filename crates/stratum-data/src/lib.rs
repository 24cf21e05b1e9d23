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

#![warn(missing_docs)]
//! Asset-side data structures of the substrate.
//!
//! - [`sets`]: the [`AssetSetManager`](sets::AssetSetManager), which owns one
//!   heap per asset type, aggregates their update notifications and runs the
//!   per-frame barrier.
//! - [`assets`]: [`Assets`](assets::Assets), a ready-made typed heap.

pub mod assets;
pub mod sets;

pub use assets::Assets;
pub use sets::{AssetSetConfig, AssetSetError, AssetSetManager, FrameBarrierId};

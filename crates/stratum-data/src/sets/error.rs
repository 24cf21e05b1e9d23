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

use crate::sets::frame_barrier::FrameBarrierId;
use stratum_core::asset::TypeKey;
use thiserror::Error;

/// Errors surfaced by the asset set manager.
///
/// Programmer errors (clearing or re-entering the frame barrier mid-pass,
/// running it off the home thread) are not represented here: they panic.
#[derive(Debug, Error)]
pub enum AssetSetError {
    /// The heap constructor passed to `get_or_create_with` failed. Nothing
    /// was registered.
    #[error("failed to construct the asset heap for {type_name}")]
    HeapConstruction {
        /// Name of the heap type.
        type_name: &'static str,
        /// The constructor's error.
        #[source]
        source: anyhow::Error,
    },

    /// Two distinct heap types hashed to the same type key.
    #[error("type key {key} is already bound to a heap other than {type_name}")]
    TypeKeyCollision {
        /// The contested key.
        key: TypeKey,
        /// Name of the type that was requested.
        type_name: &'static str,
    },

    /// A frame barrier callback failed. The pass was cut short, but the
    /// barrier's bookkeeping still ran and the manager is usable.
    #[error("frame barrier callback {id} failed")]
    FrameBarrierCallback {
        /// Id of the failing callback.
        id: FrameBarrierId,
        /// The callback's error.
        #[source]
        source: anyhow::Error,
    },
}

/// Result alias for asset set operations.
pub type AssetSetResult<T> = Result<T, AssetSetError>;

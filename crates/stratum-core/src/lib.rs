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

//! # Stratum Core
//!
//! Foundational crate containing the traits, core types, and interface
//! contracts of the asset substrate: the signal bus, the filesystem
//! capability consumed by the mounting tree, and the asset heap capability
//! consumed by the asset set manager.

#![warn(missing_docs)]

pub mod asset;
pub mod service_registry;
pub mod signal;
pub mod thread;
pub mod vfs;

pub use service_registry::ServiceRegistry;
pub use signal::{Signal, SignalId};
pub use thread::HomeThread;

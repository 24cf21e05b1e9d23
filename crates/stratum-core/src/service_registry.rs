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

//! A type-indexed registry of shared engine services.
//!
//! The asset substrate has no global singletons: a top-level container
//! constructs the mounting tree and the asset set manager explicitly and
//! registers them here so other subsystems can find them by type.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Stores one shared instance per service type.
#[derive(Default)]
pub struct ServiceRegistry {
    services: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ServiceRegistry {
    /// Creates an empty service registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    /// Registers a shared service, keyed by `T`'s [`TypeId`].
    ///
    /// If a service of the same type was already registered, it is replaced.
    pub fn insert<T: Send + Sync + 'static>(&mut self, service: Arc<T>) {
        self.services.insert(TypeId::of::<T>(), service);
    }

    /// Retrieves a previously registered service.
    ///
    /// Returns `None` if no service of type `T` has been registered.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.services
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|service| service.downcast::<T>().ok())
    }

    /// Returns `true` if a service of type `T` is registered.
    #[must_use]
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<T>())
    }

    /// Returns the number of registered services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` if no services are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.services.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Tree(&'static str);
    struct Sets;

    #[test]
    fn lookups_share_the_registered_instance() {
        let tree = Arc::new(Tree("main"));
        let mut registry = ServiceRegistry::new();
        registry.insert(Arc::clone(&tree));

        let first = registry.get::<Tree>().unwrap();
        let second = registry.get::<Tree>().unwrap();
        assert!(Arc::ptr_eq(&first, &tree));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(Arc::strong_count(&tree), 4);
    }

    #[test]
    fn services_are_keyed_by_type() {
        let mut registry = ServiceRegistry::default();
        assert!(registry.is_empty());
        assert!(registry.get::<Tree>().is_none());

        registry.insert(Arc::new(Sets));
        assert!(registry.contains::<Sets>());
        assert!(!registry.contains::<Tree>());

        registry.insert(Arc::new(Tree("old")));
        registry.insert(Arc::new(Tree("new")));
        assert_eq!(registry.len(), 2);
        assert_eq!(*registry.get::<Tree>().unwrap(), Tree("new"));
    }
}

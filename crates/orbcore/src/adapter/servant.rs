// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Servants and servant factories.

use crate::error::{Error, Result};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Object implementation hosted by an object adapter.
pub trait Servant: Send + Sync {
    /// Most-derived interface type id (e.g. `::Orb::Process`).
    fn interface_id(&self) -> &str;

    /// Downcast support.
    fn as_any(&self) -> &dyn Any;
}

/// Creates servants for a type id on demand.
pub trait ServantFactory: Send + Sync {
    fn create(&self, type_id: &str) -> Option<Arc<dyn Servant>>;

    /// Called once when the factory is removed or the runtime destroyed.
    fn destroy(&self) {}
}

/// Servant factories keyed by type id. The empty id is the fallback factory.
#[derive(Default)]
pub struct ServantFactoryManager {
    factories: RwLock<HashMap<String, Arc<dyn ServantFactory>>>,
}

impl ServantFactoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, factory: Arc<dyn ServantFactory>, type_id: &str) -> Result<()> {
        let mut factories = self.factories.write();
        if factories.contains_key(type_id) {
            return Err(Error::already_registered("servant factory", type_id));
        }
        factories.insert(type_id.to_string(), factory);
        Ok(())
    }

    pub fn remove(&self, type_id: &str) -> Result<()> {
        let factory = self
            .factories
            .write()
            .remove(type_id)
            .ok_or_else(|| Error::not_registered("servant factory", type_id))?;
        factory.destroy();
        Ok(())
    }

    pub fn find(&self, type_id: &str) -> Option<Arc<dyn ServantFactory>> {
        self.factories.read().get(type_id).cloned()
    }

    /// Create a servant through the factory for `type_id`, falling back to
    /// the default (empty id) factory.
    pub fn create(&self, type_id: &str) -> Option<Arc<dyn Servant>> {
        let factories = self.factories.read();
        factories
            .get(type_id)
            .and_then(|f| f.create(type_id))
            .or_else(|| factories.get("").and_then(|f| f.create(type_id)))
    }

    pub fn destroy(&self) {
        let factories = std::mem::take(&mut *self.factories.write());
        for factory in factories.into_values() {
            factory.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Hello;

    impl Servant for Hello {
        fn interface_id(&self) -> &str {
            "::Demo::Hello"
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Default)]
    struct HelloFactory {
        destroyed: AtomicUsize,
    }

    impl ServantFactory for HelloFactory {
        fn create(&self, type_id: &str) -> Option<Arc<dyn Servant>> {
            (type_id == "::Demo::Hello").then(|| Arc::new(Hello) as Arc<dyn Servant>)
        }
        fn destroy(&self) {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_add_find_remove() {
        let manager = ServantFactoryManager::new();
        let factory = Arc::new(HelloFactory::default());
        manager.add(factory.clone(), "::Demo::Hello").expect("add");
        assert!(matches!(
            manager.add(factory.clone(), "::Demo::Hello"),
            Err(Error::AlreadyRegistered { .. })
        ));
        assert!(manager.find("::Demo::Hello").is_some());

        let servant = manager.create("::Demo::Hello").expect("servant");
        assert!(servant.as_any().downcast_ref::<Hello>().is_some());
        assert!(manager.create("::Demo::Other").is_none());

        manager.remove("::Demo::Hello").expect("remove");
        assert_eq!(factory.destroyed.load(Ordering::SeqCst), 1);
        assert!(matches!(
            manager.remove("::Demo::Hello"),
            Err(Error::NotRegistered { .. })
        ));
    }

    #[test]
    fn test_default_factory_and_destroy() {
        let manager = ServantFactoryManager::new();
        let factory = Arc::new(HelloFactory::default());
        manager.add(factory.clone(), "").expect("add default");
        assert!(manager.create("::Demo::Hello").is_some());
        manager.destroy();
        assert_eq!(factory.destroyed.load(Ordering::SeqCst), 1);
        assert!(manager.find("").is_none());
    }
}

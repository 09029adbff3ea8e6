// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object adapter factory: creation, lookup and collective shutdown.

use super::ObjectAdapter;
use crate::core::generate_uuid;
use crate::error::{Error, Result};
use crate::proxy::ObjectPrx;
use crate::runtime::Runtime;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::{Arc, Weak};

#[derive(Default)]
struct State {
    shutdown: bool,
    adapters: HashMap<String, Arc<ObjectAdapter>>,
}

/// Owns every object adapter of a runtime.
pub struct ObjectAdapterFactory {
    runtime: Weak<Runtime>,
    state: Mutex<State>,
    shutdown_done: Condvar,
}

impl ObjectAdapterFactory {
    pub fn new(runtime: Weak<Runtime>) -> Self {
        Self {
            runtime,
            state: Mutex::new(State::default()),
            shutdown_done: Condvar::new(),
        }
    }

    /// Create adapter `name` configured from `<name>.*` properties. An empty
    /// name gets a generated one.
    pub fn create_object_adapter(
        &self,
        name: &str,
        router: Option<&ObjectPrx>,
    ) -> Result<Arc<ObjectAdapter>> {
        self.create(name, None, router)
    }

    /// Create adapter `name` listening on `endpoints` (overrides `<name>.Endpoints`).
    pub fn create_object_adapter_with_endpoints(
        &self,
        name: &str,
        endpoints: &str,
    ) -> Result<Arc<ObjectAdapter>> {
        self.create(name, Some(endpoints), None)
    }

    fn create(
        &self,
        name: &str,
        endpoints: Option<&str>,
        router: Option<&ObjectPrx>,
    ) -> Result<Arc<ObjectAdapter>> {
        let name = if name.is_empty() {
            generate_uuid()
        } else {
            name.to_string()
        };
        self.check_available(&name)?;

        let runtime = self.runtime.upgrade().ok_or(Error::CommunicatorDestroyed)?;
        let router = match router {
            Some(prx) => Some(runtime.router_manager()?.get(prx)),
            None => None,
        };
        let adapter = Arc::new(ObjectAdapter::new(&runtime, &name, endpoints, router)?);

        let mut state = self.state.lock();
        if state.shutdown {
            drop(state);
            adapter.destroy();
            return Err(Error::CommunicatorDestroyed);
        }
        if state.adapters.contains_key(&name) {
            drop(state);
            adapter.destroy();
            return Err(Error::already_registered("object adapter", name));
        }
        state.adapters.insert(name, Arc::clone(&adapter));
        Ok(adapter)
    }

    fn check_available(&self, name: &str) -> Result<()> {
        let state = self.state.lock();
        if state.shutdown {
            return Err(Error::CommunicatorDestroyed);
        }
        if state.adapters.contains_key(name) {
            return Err(Error::already_registered("object adapter", name));
        }
        Ok(())
    }

    pub fn find(&self, name: &str) -> Option<Arc<ObjectAdapter>> {
        self.state.lock().adapters.get(name).cloned()
    }

    /// Names of the live adapters, sorted.
    pub fn adapter_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().adapters.keys().cloned().collect();
        names.sort();
        names
    }

    pub(crate) fn remove_object_adapter(&self, adapter: &ObjectAdapter) {
        let mut state = self.state.lock();
        let registered = state
            .adapters
            .get(adapter.name())
            .is_some_and(|a| std::ptr::eq(a.as_ref(), adapter));
        if registered {
            state.adapters.remove(adapter.name());
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.state.lock().shutdown
    }

    /// Deactivate every adapter; no adapter may be created afterwards.
    pub fn shutdown(&self) {
        let adapters: Vec<Arc<ObjectAdapter>> = {
            let mut state = self.state.lock();
            if state.shutdown {
                return;
            }
            state.shutdown = true;
            self.shutdown_done.notify_all();
            state.adapters.values().cloned().collect()
        };
        for adapter in adapters {
            adapter.deactivate();
        }
        log::debug!("[adapter-factory] shutdown");
    }

    /// Block until [`shutdown`](Self::shutdown) and every adapter deactivation
    /// completed.
    pub fn wait_for_shutdown(&self) {
        let adapters: Vec<Arc<ObjectAdapter>> = {
            let mut state = self.state.lock();
            while !state.shutdown {
                self.shutdown_done.wait(&mut state);
            }
            state.adapters.values().cloned().collect()
        };
        for adapter in adapters {
            adapter.wait_for_deactivate();
        }
    }

    /// Destroy every adapter.
    pub fn destroy(&self) {
        let adapters: Vec<Arc<ObjectAdapter>> = {
            let mut state = self.state.lock();
            state.shutdown = true;
            self.shutdown_done.notify_all();
            state.adapters.drain().map(|(_, a)| a).collect()
        };
        for adapter in adapters {
            adapter.destroy();
        }
    }
}

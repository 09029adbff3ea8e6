// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Locator proxies and their cached adapter lookups.

use crate::config::TraceLevels;
use crate::core::Identity;
use crate::error::{Error, Result};
use crate::logging::Logger;
use crate::proxy::ObjectPrx;
use crate::transport::Endpoint;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Failure reported by a [`LocatorRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The registry has no server with this id.
    ServerNotFound,
    /// The registry has no adapter with this id.
    AdapterNotFound,
    /// Anything else (unreachable registry, rejected update, ...).
    Other(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::ServerNotFound => write!(f, "server not found"),
            RegistryError::AdapterNotFound => write!(f, "adapter not found"),
            RegistryError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Registry side of a locator: servers publish their adapters and process
/// proxy here.
pub trait LocatorRegistry: Send + Sync {
    /// Publish (or clear with `None`) the direct proxy of an adapter.
    fn set_adapter_direct_proxy(
        &self,
        adapter_id: &str,
        proxy: Option<&ObjectPrx>,
    ) -> std::result::Result<(), RegistryError>;

    /// Publish the `Process` admin facet of server `server_id`.
    fn set_server_process_proxy(
        &self,
        server_id: &str,
        proxy: &ObjectPrx,
    ) -> std::result::Result<(), RegistryError>;
}

/// Lookup side of a locator.
pub trait Locator: Send + Sync {
    /// Direct proxy for an adapter id, `None` if unknown.
    fn find_adapter_by_id(&self, adapter_id: &str) -> Result<Option<ObjectPrx>>;

    /// Registry of this locator, if it exposes one.
    fn registry(&self) -> Result<Option<Arc<dyn LocatorRegistry>>>;
}

type Cached = (Instant, Vec<Arc<dyn Endpoint>>);

/// A locator proxy plus the implementation bound to its identity.
pub struct LocatorInfo {
    locator: ObjectPrx,
    implementation: RwLock<Option<Arc<dyn Locator>>>,
    table: Mutex<HashMap<String, Cached>>,
    logger: Arc<dyn Logger>,
    trace_level: i32,
}

impl LocatorInfo {
    pub fn locator(&self) -> &ObjectPrx {
        &self.locator
    }

    /// True once an implementation has been bound to the locator identity.
    pub fn is_bound(&self) -> bool {
        self.implementation.read().is_some()
    }

    fn bind(&self, implementation: Option<Arc<dyn Locator>>) {
        *self.implementation.write() = implementation;
    }

    /// Registry of the locator; `None` when it has none or nothing is bound.
    pub fn registry(&self) -> Result<Option<Arc<dyn LocatorRegistry>>> {
        let implementation = self.implementation.read().clone();
        match implementation {
            Some(locator) => locator.registry(),
            None => {
                log::debug!(
                    "[locator] no implementation bound for `{}'",
                    self.locator.identity()
                );
                Ok(None)
            }
        }
    }

    /// Endpoints of `adapter_id`.
    ///
    /// `ttl` follows `LocatorCacheTimeout`: `-1` caches forever, `0` never
    /// caches, `n > 0` caches for `n` seconds.
    pub fn find_adapter_endpoints(
        &self,
        adapter_id: &str,
        ttl: i32,
    ) -> Result<Vec<Arc<dyn Endpoint>>> {
        if ttl != 0 {
            if let Some((at, endpoints)) = self.table.lock().get(adapter_id) {
                let fresh = ttl < 0 || at.elapsed() < Duration::from_secs(ttl as u64);
                if fresh {
                    return Ok(endpoints.clone());
                }
            }
        }

        let implementation = self.implementation.read().clone();
        let locator = implementation.ok_or_else(|| {
            Error::Registry(format!(
                "no locator implementation bound for `{}'",
                self.locator.identity()
            ))
        })?;
        let proxy = locator
            .find_adapter_by_id(adapter_id)?
            .ok_or_else(|| Error::not_registered("object adapter", adapter_id))?;
        let endpoints = proxy.endpoints().to_vec();

        if self.trace_level >= 1 {
            let list: Vec<String> = endpoints.iter().map(|e| e.to_string()).collect();
            self.logger.trace(
                TraceLevels::LOCATION_CAT,
                &format!(
                    "retrieved endpoints from locator, adding to locator table\nadapter = {}\nendpoints = {}",
                    adapter_id,
                    list.join(":")
                ),
            );
        }

        self.table
            .lock()
            .insert(adapter_id.to_string(), (Instant::now(), endpoints.clone()));
        Ok(endpoints)
    }

    /// Forget the cached endpoints of `adapter_id`.
    pub fn clear_cache(&self, adapter_id: &str) {
        self.table.lock().remove(adapter_id);
    }

    fn destroy(&self) {
        self.table.lock().clear();
        self.bind(None);
    }
}

impl fmt::Debug for LocatorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocatorInfo")
            .field("locator", &self.locator.to_string())
            .field("bound", &self.is_bound())
            .finish()
    }
}

#[derive(Default)]
struct ManagerState {
    infos: HashMap<Identity, Arc<LocatorInfo>>,
    implementations: HashMap<Identity, Arc<dyn Locator>>,
}

/// One [`LocatorInfo`] per locator identity.
pub struct LocatorManager {
    state: Mutex<ManagerState>,
    logger: Arc<dyn Logger>,
    trace_level: i32,
}

impl LocatorManager {
    pub fn new(logger: Arc<dyn Logger>, traces: &TraceLevels) -> Self {
        Self {
            state: Mutex::new(ManagerState::default()),
            logger,
            trace_level: traces.location,
        }
    }

    /// Shared info for `locator`.
    pub fn get(&self, locator: &ObjectPrx) -> Arc<LocatorInfo> {
        let mut state = self.state.lock();
        let identity = locator.identity().clone();
        if let Some(info) = state.infos.get(&identity) {
            return Arc::clone(info);
        }
        let info = Arc::new(LocatorInfo {
            locator: locator.clone(),
            implementation: RwLock::new(state.implementations.get(&identity).cloned()),
            table: Mutex::new(HashMap::new()),
            logger: Arc::clone(&self.logger),
            trace_level: self.trace_level,
        });
        state.infos.insert(identity, Arc::clone(&info));
        info
    }

    /// Bind a local implementation to every locator proxy with `identity`.
    pub fn register_locator(&self, identity: Identity, locator: Arc<dyn Locator>) {
        let mut state = self.state.lock();
        if let Some(info) = state.infos.get(&identity) {
            info.bind(Some(Arc::clone(&locator)));
        }
        state.implementations.insert(identity, locator);
    }

    pub fn destroy(&self) {
        let mut state = self.state.lock();
        for info in state.infos.values() {
            info.destroy();
        }
        state.infos.clear();
        state.implementations.clear();
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object adapters: servant tables bound to listening endpoints.
//!
//! ## States
//!
//! ```text
//! Holding --activate()--> Active --deactivate()--> Deactivated --destroy()--> Destroyed
//!    \_________________________deactivate()______________/
//! ```
//!
//! ## Configuration (`<name>.*`)
//!
//! | Property | Meaning |
//! |----------|---------|
//! | `Endpoints` | endpoints to listen on, `:`-separated |
//! | `PublishedEndpoints` | endpoints put in proxies instead of the bound ones |
//! | `AdapterId` | id published to the locator registry on activation |
//! | `Locator` | locator proxy, overrides the default locator |
//!
//! The runtime lock is always taken before an adapter's own lock; adapter
//! code never calls a runtime accessor while holding its lock.

mod factory;
mod servant;

pub use factory::ObjectAdapterFactory;
pub use servant::{Servant, ServantFactory, ServantFactoryManager};

use crate::config::TraceLevels;
use crate::core::Identity;
use crate::error::{Error, Result};
use crate::location::{LocatorInfo, RegistryError, RouterInfo};
use crate::proxy::{ObjectPrx, ReferenceFactory};
use crate::runtime::Runtime;
use crate::transport::{Acceptor, Endpoint};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

/// Adapter lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AdapterState {
    Holding,
    Active,
    Deactivated,
    Destroyed,
}

struct Inner {
    state: AdapterState,
    activating: bool,
    servants: HashMap<Identity, HashMap<String, Arc<dyn Servant>>>,
    acceptors: Vec<Box<dyn Acceptor>>,
    published: Vec<Arc<dyn Endpoint>>,
}

/// Hosts servants and listens on its endpoints once activated.
pub struct ObjectAdapter {
    name: String,
    runtime: Weak<Runtime>,
    endpoints: Vec<Arc<dyn Endpoint>>,
    configured_published: Vec<Arc<dyn Endpoint>>,
    adapter_id: String,
    locator: Option<Arc<LocatorInfo>>,
    router: Option<Arc<RouterInfo>>,
    inner: Mutex<Inner>,
    state_changed: Condvar,
}

impl ObjectAdapter {
    /// Build an adapter from the `<name>.*` properties (endpoints given
    /// explicitly take precedence over `<name>.Endpoints`).
    pub(crate) fn new(
        runtime: &Arc<Runtime>,
        name: &str,
        endpoints: Option<&str>,
        router: Option<Arc<RouterInfo>>,
    ) -> Result<Self> {
        let props = runtime.properties();
        let manager = runtime.endpoint_factory_manager()?;
        let parse = |list: &str| -> Result<Vec<Arc<dyn Endpoint>>> {
            split_endpoint_list(list)
                .into_iter()
                .map(|ep| manager.create(ep, true))
                .collect()
        };

        let endpoints = match endpoints {
            Some(list) => parse(list)?,
            None => parse(&props.get_with_default(&format!("{}.Endpoints", name), ""))?,
        };
        let configured_published =
            parse(&props.get_with_default(&format!("{}.PublishedEndpoints", name), ""))?;
        let adapter_id = props.get_with_default(&format!("{}.AdapterId", name), "");

        let locator = match runtime
            .proxy_factory()?
            .property_to_proxy(&format!("{}.Locator", name))?
        {
            Some(prx) => Some(runtime.locator_manager()?.get(&prx)),
            None => runtime.reference_factory()?.default_locator().cloned(),
        };

        if let Some(ref router) = router {
            router.set_adapter(Some(name.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            runtime: Arc::downgrade(runtime),
            endpoints,
            configured_published,
            adapter_id,
            locator,
            router,
            inner: Mutex::new(Inner {
                state: AdapterState::Holding,
                activating: false,
                servants: HashMap::new(),
                acceptors: Vec::new(),
                published: Vec::new(),
            }),
            state_changed: Condvar::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn adapter_id(&self) -> &str {
        &self.adapter_id
    }

    pub fn state(&self) -> AdapterState {
        self.inner.lock().state
    }

    pub fn is_deactivated(&self) -> bool {
        self.state() >= AdapterState::Deactivated
    }

    pub fn locator(&self) -> Option<&Arc<LocatorInfo>> {
        self.locator.as_ref()
    }

    fn runtime(&self) -> Result<Arc<Runtime>> {
        self.runtime.upgrade().ok_or(Error::CommunicatorDestroyed)
    }

    fn check_not_deactivated(&self, inner: &Inner) -> Result<()> {
        if inner.state >= AdapterState::Deactivated {
            Err(Error::AdapterDeactivated(self.name.clone()))
        } else {
            Ok(())
        }
    }

    /// Register `servant` as `facet` of `identity`; returns its proxy.
    pub fn add_facet(
        &self,
        servant: Arc<dyn Servant>,
        identity: Identity,
        facet: &str,
    ) -> Result<ObjectPrx> {
        self.insert_facet(servant, identity.clone(), facet)?;
        Ok(self.create_proxy(identity)?.with_facet(facet))
    }

    /// Register without building a proxy. Only takes the adapter lock, so
    /// the runtime may call it under its own lock.
    pub(crate) fn insert_facet(
        &self,
        servant: Arc<dyn Servant>,
        identity: Identity,
        facet: &str,
    ) -> Result<()> {
        let mut inner = self.inner.lock();
        self.check_not_deactivated(&inner)?;
        let facets = inner.servants.entry(identity.clone()).or_default();
        if facets.contains_key(facet) {
            let mut id = identity.to_string();
            if !facet.is_empty() {
                id.push_str(" -f ");
                id.push_str(facet);
            }
            return Err(Error::already_registered("servant", id));
        }
        facets.insert(facet.to_string(), servant);
        Ok(())
    }

    /// Register `servant` as the default facet of `identity`.
    pub fn add(&self, servant: Arc<dyn Servant>, identity: Identity) -> Result<ObjectPrx> {
        self.add_facet(servant, identity, "")
    }

    /// Unregister a facet, returning its servant.
    pub fn remove_facet(&self, identity: &Identity, facet: &str) -> Result<Arc<dyn Servant>> {
        let mut inner = self.inner.lock();
        self.check_not_deactivated(&inner)?;
        let facets = inner
            .servants
            .get_mut(identity)
            .ok_or_else(|| Error::not_registered("servant", identity.to_string()))?;
        let servant = facets
            .remove(facet)
            .ok_or_else(|| Error::not_registered("servant", format!("{} -f {}", identity, facet)))?;
        if facets.is_empty() {
            inner.servants.remove(identity);
        }
        Ok(servant)
    }

    pub fn find_facet(&self, identity: &Identity, facet: &str) -> Option<Arc<dyn Servant>> {
        self.inner
            .lock()
            .servants
            .get(identity)
            .and_then(|facets| facets.get(facet).cloned())
    }

    /// Every facet registered for `identity`.
    pub fn find_all_facets(&self, identity: &Identity) -> HashMap<String, Arc<dyn Servant>> {
        self.inner
            .lock()
            .servants
            .get(identity)
            .cloned()
            .unwrap_or_default()
    }

    /// Proxy for `identity`: indirect when an adapter id is configured,
    /// otherwise direct with the published endpoints.
    pub fn create_proxy(&self, identity: Identity) -> Result<ObjectPrx> {
        let factory = self.runtime()?.reference_factory()?;
        let reference = if self.adapter_id.is_empty() {
            self.direct_reference(&factory, identity)?
        } else {
            factory
                .create_indirect(identity, &self.adapter_id)?
                .with_locator(self.locator.clone())
        };
        Ok(ObjectPrx::new(Arc::new(reference)))
    }

    /// Proxy with the published endpoints even when an adapter id is set.
    pub fn create_direct_proxy(&self, identity: Identity) -> Result<ObjectPrx> {
        let factory = self.runtime()?.reference_factory()?;
        Ok(ObjectPrx::new(Arc::new(
            self.direct_reference(&factory, identity)?,
        )))
    }

    fn direct_reference(
        &self,
        factory: &ReferenceFactory,
        identity: Identity,
    ) -> Result<crate::proxy::Reference> {
        factory.create_direct(identity, self.published_endpoints())
    }

    /// Endpoints put in direct proxies.
    pub fn published_endpoints(&self) -> Vec<Arc<dyn Endpoint>> {
        if !self.configured_published.is_empty() {
            return self.configured_published.clone();
        }
        let inner = self.inner.lock();
        if inner.published.is_empty() {
            self.endpoints.clone()
        } else {
            inner.published.clone()
        }
    }

    /// Bind every endpoint and start accepting. Binding failures close what
    /// was already bound and leave the adapter holding.
    pub fn activate(&self) -> Result<()> {
        {
            let mut inner = self.inner.lock();
            self.check_not_deactivated(&inner)?;
            if inner.state == AdapterState::Active || inner.activating {
                return Ok(());
            }
            inner.activating = true;
        }

        let result = self.bind_endpoints();
        let mut inner = self.inner.lock();
        inner.activating = false;
        let (acceptors, published) = match result {
            Ok(bound) => bound,
            Err(e) => {
                self.state_changed.notify_all();
                return Err(e);
            }
        };
        if inner.state >= AdapterState::Deactivated {
            drop(inner);
            for mut acceptor in acceptors {
                acceptor.close();
            }
            return Err(Error::AdapterDeactivated(self.name.clone()));
        }
        inner.acceptors = acceptors;
        inner.published = published;
        inner.state = AdapterState::Active;
        self.state_changed.notify_all();
        drop(inner);

        self.update_locator_registry(true)
    }

    fn bind_endpoints(&self) -> Result<(Vec<Box<dyn Acceptor>>, Vec<Arc<dyn Endpoint>>)> {
        let runtime = self.runtime()?;
        if !self.endpoints.is_empty() {
            // incoming dispatch runs on the server pool
            runtime.server_thread_pool()?;
        }
        let resolver = runtime.endpoint_host_resolver()?;
        let traces = runtime.trace_levels();

        let mut acceptors: Vec<Box<dyn Acceptor>> = Vec::new();
        let mut published = Vec::new();
        let fail = |acceptors: Vec<Box<dyn Acceptor>>, ep: &Arc<dyn Endpoint>, cause: String| {
            for mut acceptor in acceptors {
                acceptor.close();
            }
            Error::AdapterActivation(format!(
                "object adapter `{}': cannot listen on `{}': {}",
                self.name, ep, cause
            ))
        };

        for ep in &self.endpoints {
            let addrs = match resolver.resolve(ep.host(), ep.port(), true) {
                Ok(addrs) => addrs,
                Err(e) => return Err(fail(acceptors, ep, e.to_string())),
            };
            let Some(addr) = addrs.first().copied() else {
                return Err(fail(acceptors, ep, "no address".to_string()));
            };
            match ep.listen(addr) {
                Ok(acceptor) => {
                    let port = acceptor.local_addr().map(|a| a.port()).unwrap_or(ep.port());
                    if traces.network >= 1 {
                        runtime.logger().trace(
                            TraceLevels::NETWORK_CAT,
                            &format!("accepting {} connections at {}", ep.protocol(), addr),
                        );
                    }
                    published.push(ep.with_port(port));
                    acceptors.push(acceptor);
                }
                Err(e) => return Err(fail(acceptors, ep, e.to_string())),
            }
        }
        Ok((acceptors, published))
    }

    /// Publish (or clear) this adapter's direct proxy in the locator registry.
    fn update_locator_registry(&self, publish: bool) -> Result<()> {
        if self.adapter_id.is_empty() {
            return Ok(());
        }
        let Some(ref locator) = self.locator else {
            return Ok(());
        };
        let Some(registry) = locator.registry()? else {
            return Ok(());
        };

        let proxy = if publish {
            Some(self.create_direct_proxy(Identity::new("", "dummy"))?)
        } else {
            None
        };
        match registry.set_adapter_direct_proxy(&self.adapter_id, proxy.as_ref()) {
            Ok(()) => {
                locator.clear_cache(&self.adapter_id);
                Ok(())
            }
            Err(RegistryError::AdapterNotFound) => Err(Error::Initialization(format!(
                "Locator knows nothing about adapter '{}'",
                self.adapter_id
            ))),
            Err(e) => Err(Error::Registry(e.to_string())),
        }
    }

    /// Stop accepting new requests but keep the endpoints bound.
    pub fn hold(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        self.check_not_deactivated(&inner)?;
        inner.state = AdapterState::Holding;
        Ok(())
    }

    /// Close the endpoints. Idempotent.
    pub fn deactivate(&self) {
        let (acceptors, was_active) = {
            let mut inner = self.inner.lock();
            if inner.state >= AdapterState::Deactivated {
                return;
            }
            let was_active = inner.state == AdapterState::Active;
            inner.state = AdapterState::Deactivated;
            self.state_changed.notify_all();
            (std::mem::take(&mut inner.acceptors), was_active)
        };

        for mut acceptor in acceptors {
            acceptor.close();
        }
        if was_active {
            if let Err(e) = self.update_locator_registry(false) {
                log::debug!("[adapter] `{}' unregister failed: {}", self.name, e);
            }
        }
        if let Some(ref router) = self.router {
            router.set_adapter(None);
        }
        log::debug!("[adapter] `{}' deactivated", self.name);
    }

    /// Block until [`deactivate`](Self::deactivate) was called.
    pub fn wait_for_deactivate(&self) {
        let mut inner = self.inner.lock();
        while inner.state < AdapterState::Deactivated {
            self.state_changed.wait(&mut inner);
        }
    }

    /// Deactivate, drop every servant and unregister from the factory.
    pub fn destroy(&self) {
        self.deactivate();
        {
            let mut inner = self.inner.lock();
            if inner.state == AdapterState::Destroyed {
                return;
            }
            inner.servants.clear();
            inner.published.clear();
            inner.state = AdapterState::Destroyed;
            self.state_changed.notify_all();
        }
        if let Ok(factory) = self.runtime().and_then(|rt| rt.object_adapter_factory()) {
            factory.remove_object_adapter(self);
        }
    }
}

impl fmt::Debug for ObjectAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectAdapter")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}

/// Split `a:b:c` on `:` outside double quotes, dropping blanks.
fn split_endpoint_list(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    for (i, c) in list.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ':' if !quoted => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts.retain(|p| !p.trim().is_empty());
    parts
}

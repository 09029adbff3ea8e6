// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object references and their factory.
//!
//! ## Stringified form
//!
//! ```text
//! identity [-f facet] [-t|-o|-O|-d|-D] [-s] [:endpoint]*
//! identity [-f facet] [-t|-o|-O|-d|-D] [-s] @ adapter-id
//! ```
//!
//! Tokens containing whitespace, `:` or `@` are double-quoted.

use crate::config::{DefaultsAndOverrides, EndpointSelection, Properties};
use crate::core::Identity;
use crate::error::{Error, Result};
use crate::location::{LocatorInfo, LocatorManager, RouterInfo, RouterManager};
use crate::runtime::Runtime;
use crate::transport::{Endpoint, EndpointFactoryManager};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Invocation mode carried by a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceMode {
    #[default]
    Twoway,
    Oneway,
    BatchOneway,
    Datagram,
    BatchDatagram,
}

impl ReferenceMode {
    fn flag(self) -> &'static str {
        match self {
            Self::Twoway => "-t",
            Self::Oneway => "-o",
            Self::BatchOneway => "-O",
            Self::Datagram => "-d",
            Self::BatchDatagram => "-D",
        }
    }

    fn from_flag(flag: &str) -> Option<Self> {
        match flag {
            "-t" => Some(Self::Twoway),
            "-o" => Some(Self::Oneway),
            "-O" => Some(Self::BatchOneway),
            "-d" => Some(Self::Datagram),
            "-D" => Some(Self::BatchDatagram),
            _ => None,
        }
    }
}

/// Everything needed to reach one object.
#[derive(Clone)]
pub struct Reference {
    runtime: Weak<Runtime>,
    identity: Identity,
    facet: String,
    mode: ReferenceMode,
    secure: bool,
    endpoints: Vec<Arc<dyn Endpoint>>,
    adapter_id: String,
    locator: Option<Arc<LocatorInfo>>,
    router: Option<Arc<RouterInfo>>,
    locator_cache_timeout: i32,
    endpoint_selection: EndpointSelection,
    collocation_optimized: bool,
}

impl Reference {
    /// Reference with fixed endpoints and default settings, not tied to a runtime.
    pub fn direct(identity: Identity, endpoints: Vec<Arc<dyn Endpoint>>) -> Self {
        Self {
            runtime: Weak::new(),
            identity,
            facet: String::new(),
            mode: ReferenceMode::Twoway,
            secure: false,
            endpoints,
            adapter_id: String::new(),
            locator: None,
            router: None,
            locator_cache_timeout: -1,
            endpoint_selection: EndpointSelection::Random,
            collocation_optimized: true,
        }
    }

    /// Reference resolved through a locator by adapter id.
    pub fn indirect(identity: Identity, adapter_id: impl Into<String>) -> Self {
        Self {
            adapter_id: adapter_id.into(),
            ..Self::direct(identity, Vec::new())
        }
    }

    pub(crate) fn runtime(&self) -> Option<Arc<Runtime>> {
        self.runtime.upgrade()
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn facet(&self) -> &str {
        &self.facet
    }

    pub fn mode(&self) -> ReferenceMode {
        self.mode
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    pub fn endpoints(&self) -> &[Arc<dyn Endpoint>] {
        &self.endpoints
    }

    pub fn adapter_id(&self) -> &str {
        &self.adapter_id
    }

    pub fn locator(&self) -> Option<&Arc<LocatorInfo>> {
        self.locator.as_ref()
    }

    pub fn router(&self) -> Option<&Arc<RouterInfo>> {
        self.router.as_ref()
    }

    pub fn locator_cache_timeout(&self) -> i32 {
        self.locator_cache_timeout
    }

    pub fn endpoint_selection(&self) -> EndpointSelection {
        self.endpoint_selection
    }

    pub fn collocation_optimized(&self) -> bool {
        self.collocation_optimized
    }

    pub fn with_identity(&self, identity: Identity) -> Self {
        Self {
            identity,
            ..self.clone()
        }
    }

    pub fn with_facet(&self, facet: impl Into<String>) -> Self {
        Self {
            facet: facet.into(),
            ..self.clone()
        }
    }

    pub fn with_mode(&self, mode: ReferenceMode) -> Self {
        Self {
            mode,
            ..self.clone()
        }
    }

    pub fn with_locator(&self, locator: Option<Arc<LocatorInfo>>) -> Self {
        Self {
            locator,
            ..self.clone()
        }
    }

    pub fn with_router(&self, router: Option<Arc<RouterInfo>>) -> Self {
        Self {
            router,
            ..self.clone()
        }
    }

    pub fn with_locator_cache_timeout(&self, timeout: i32) -> Self {
        Self {
            locator_cache_timeout: timeout,
            ..self.clone()
        }
    }

    pub fn with_endpoint_selection(&self, selection: EndpointSelection) -> Self {
        Self {
            endpoint_selection: selection,
            ..self.clone()
        }
    }

    pub fn with_collocation_optimized(&self, enabled: bool) -> Self {
        Self {
            collocation_optimized: enabled,
            ..self.clone()
        }
    }

    /// Endpoints to try, in order. Indirect references go through the locator.
    pub fn resolve_endpoints(&self) -> Result<Vec<Arc<dyn Endpoint>>> {
        let mut endpoints = if !self.endpoints.is_empty() {
            self.endpoints.clone()
        } else if !self.adapter_id.is_empty() {
            let locator = self.locator.as_ref().ok_or_else(|| {
                Error::Connection(format!(
                    "no locator configured to resolve adapter `{}'",
                    self.adapter_id
                ))
            })?;
            locator.find_adapter_endpoints(&self.adapter_id, self.locator_cache_timeout)?
        } else {
            return Err(Error::Connection(format!(
                "no endpoints for `{}'",
                self.identity
            )));
        };

        if self.endpoint_selection == EndpointSelection::Random {
            fastrand::shuffle(&mut endpoints);
        }
        Ok(endpoints)
    }
}

fn needs_quotes(s: &str) -> bool {
    s.is_empty() || s.chars().any(|c| c.is_whitespace() || c == ':' || c == '@' || c == '"')
}

fn write_token(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    if needs_quotes(s) {
        write!(f, "\"{}\"", s)
    } else {
        f.write_str(s)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_token(f, &self.identity.to_string())?;
        if !self.facet.is_empty() {
            f.write_str(" -f ")?;
            write_token(f, &self.facet)?;
        }
        write!(f, " {}", self.mode.flag())?;
        if self.secure {
            f.write_str(" -s")?;
        }
        if !self.endpoints.is_empty() {
            for ep in &self.endpoints {
                write!(f, ":{}", ep)?;
            }
        } else if !self.adapter_id.is_empty() {
            f.write_str(" @ ")?;
            write_token(f, &self.adapter_id)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reference({})", self)
    }
}

/// Read one token: either `"quoted"` or up to whitespace, `:` or `@`.
fn next_token<'a>(s: &'a str, whole: &str) -> Result<(String, &'a str)> {
    if let Some(quoted) = s.strip_prefix('"') {
        let end = quoted
            .find('"')
            .ok_or_else(|| Error::ProxyParse(format!("mismatched quotes in `{}'", whole)))?;
        return Ok((quoted[..end].to_string(), &quoted[end + 1..]));
    }
    let end = s
        .find(|c: char| c.is_whitespace() || c == ':' || c == '@')
        .unwrap_or(s.len());
    if end == 0 {
        return Err(Error::ProxyParse(format!("missing token in `{}'", whole)));
    }
    Ok((s[..end].to_string(), &s[end..]))
}

/// Split endpoint list on `:` outside quotes.
fn split_endpoints<'a>(s: &'a str, whole: &str) -> Result<Vec<&'a str>> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ':' if !quoted => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if quoted {
        return Err(Error::ProxyParse(format!("mismatched quotes in `{}'", whole)));
    }
    parts.push(&s[start..]);
    Ok(parts)
}

/// Builds references, applying the runtime defaults and the default
/// locator and router.
pub struct ReferenceFactory {
    runtime: Weak<Runtime>,
    endpoint_factories: Arc<EndpointFactoryManager>,
    locator_manager: Arc<LocatorManager>,
    router_manager: Arc<RouterManager>,
    properties: Arc<Properties>,
    defaults: DefaultsAndOverrides,
    default_locator: Option<Arc<LocatorInfo>>,
    default_router: Option<Arc<RouterInfo>>,
    destroyed: Arc<AtomicBool>,
}

impl ReferenceFactory {
    pub fn new(
        runtime: Weak<Runtime>,
        endpoint_factories: Arc<EndpointFactoryManager>,
        locator_manager: Arc<LocatorManager>,
        router_manager: Arc<RouterManager>,
        properties: Arc<Properties>,
        defaults: DefaultsAndOverrides,
    ) -> Self {
        Self {
            runtime,
            endpoint_factories,
            locator_manager,
            router_manager,
            properties,
            defaults,
            default_locator: None,
            default_router: None,
            destroyed: Arc::new(AtomicBool::new(false)),
        }
    }

    fn check(&self) -> Result<()> {
        if self.destroyed.load(Ordering::Acquire) {
            Err(Error::CommunicatorDestroyed)
        } else {
            Ok(())
        }
    }

    pub fn default_locator(&self) -> Option<&Arc<LocatorInfo>> {
        self.default_locator.as_ref()
    }

    pub fn default_router(&self) -> Option<&Arc<RouterInfo>> {
        self.default_router.as_ref()
    }

    /// Copy of this factory with another default locator.
    pub fn with_default_locator(&self, locator: Option<&crate::proxy::ObjectPrx>) -> Arc<Self> {
        Arc::new(Self {
            default_locator: locator.map(|prx| self.locator_manager.get(prx)),
            ..self.clone_inner()
        })
    }

    /// Copy of this factory with another default router.
    pub fn with_default_router(&self, router: Option<&crate::proxy::ObjectPrx>) -> Arc<Self> {
        Arc::new(Self {
            default_router: router.map(|prx| self.router_manager.get(prx)),
            ..self.clone_inner()
        })
    }

    fn clone_inner(&self) -> Self {
        Self {
            runtime: self.runtime.clone(),
            endpoint_factories: Arc::clone(&self.endpoint_factories),
            locator_manager: Arc::clone(&self.locator_manager),
            router_manager: Arc::clone(&self.router_manager),
            properties: Arc::clone(&self.properties),
            defaults: self.defaults.clone(),
            default_locator: self.default_locator.clone(),
            default_router: self.default_router.clone(),
            destroyed: Arc::clone(&self.destroyed),
        }
    }

    fn with_defaults(&self, mut reference: Reference) -> Reference {
        reference.runtime = self.runtime.clone();
        reference.locator = self.default_locator.clone();
        reference.router = self.default_router.clone();
        reference.locator_cache_timeout = self.defaults.default_locator_cache_timeout;
        reference.endpoint_selection = self.defaults.default_endpoint_selection;
        reference.collocation_optimized = self.defaults.default_collocation_optimized;
        reference.secure = self.defaults.override_secure;
        reference
    }

    /// Direct reference with the runtime defaults.
    pub fn create_direct(
        &self,
        identity: Identity,
        endpoints: Vec<Arc<dyn Endpoint>>,
    ) -> Result<Reference> {
        self.check()?;
        Ok(self.with_defaults(Reference::direct(identity, endpoints)))
    }

    /// Indirect reference with the runtime defaults.
    pub fn create_indirect(&self, identity: Identity, adapter_id: &str) -> Result<Reference> {
        self.check()?;
        Ok(self.with_defaults(Reference::indirect(identity, adapter_id)))
    }

    /// Parse a stringified proxy. An empty string yields `None`.
    pub fn create_from_string(&self, s: &str) -> Result<Option<Reference>> {
        self.check()?;
        let whole = s;
        let s = s.trim();
        if s.is_empty() {
            return Ok(None);
        }

        let (identity, mut rest) = next_token(s, whole)?;
        let identity = Identity::parse(&identity)?;

        let mut facet = String::new();
        let mut mode = ReferenceMode::Twoway;
        let mut secure = false;
        let mut endpoints = Vec::new();
        let mut adapter_id = String::new();

        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }
            if let Some(list) = rest.strip_prefix(':') {
                for ep in split_endpoints(list, whole)? {
                    endpoints.push(self.endpoint_factories.create(ep, false)?);
                }
                break;
            }
            if let Some(adapter) = rest.strip_prefix('@') {
                let (id, tail) = next_token(adapter.trim_start(), whole)?;
                if !tail.trim().is_empty() {
                    return Err(Error::ProxyParse(format!(
                        "unexpected text after adapter id in `{}'",
                        whole
                    )));
                }
                if id.is_empty() {
                    return Err(Error::ProxyParse(format!("empty adapter id in `{}'", whole)));
                }
                adapter_id = id;
                break;
            }

            let (option, tail) = next_token(rest, whole)?;
            rest = tail;
            match option.as_str() {
                "-f" => {
                    let (value, tail) = next_token(rest.trim_start(), whole).map_err(|_| {
                        Error::ProxyParse(format!(
                            "no argument provided for -f option in `{}'",
                            whole
                        ))
                    })?;
                    facet = value;
                    rest = tail;
                }
                "-s" => secure = true,
                flag => {
                    mode = ReferenceMode::from_flag(flag).ok_or_else(|| {
                        Error::ProxyParse(format!("unknown option `{}' in `{}'", flag, whole))
                    })?;
                }
            }
        }

        let mut reference = if adapter_id.is_empty() {
            self.create_direct(identity, endpoints)?
        } else {
            self.create_indirect(identity, &adapter_id)?
        };
        reference.facet = facet;
        reference.mode = mode;
        reference.secure = reference.secure || secure;
        Ok(Some(reference))
    }

    /// Parse the proxy stored in property `prefix`, then apply its
    /// `.Locator`, `.Router`, `.LocatorCacheTimeout`, `.EndpointSelection`
    /// and `.CollocationOptimization` sub-properties.
    pub fn create_from_properties(&self, prefix: &str) -> Result<Option<Reference>> {
        let Some(value) = self.properties.get(prefix) else {
            return Ok(None);
        };
        let Some(mut reference) = self.create_from_string(&value)? else {
            return Ok(None);
        };

        let key = format!("{}.Locator", prefix);
        if let Some(locator) = self.create_from_properties(&key)? {
            let prx = crate::proxy::ObjectPrx::new(Arc::new(locator));
            reference.locator = Some(self.locator_manager.get(&prx));
        }

        let key = format!("{}.Router", prefix);
        if let Some(router) = self.create_from_properties(&key)? {
            let prx = crate::proxy::ObjectPrx::new(Arc::new(router));
            reference.router = Some(self.router_manager.get(&prx));
        }

        let key = format!("{}.LocatorCacheTimeout", prefix);
        reference.locator_cache_timeout = self
            .properties
            .get_as_int_with_default(&key, reference.locator_cache_timeout);

        let key = format!("{}.EndpointSelection", prefix);
        if let Some(selection) = self.properties.get(&key) {
            reference.endpoint_selection = EndpointSelection::parse(&selection)?;
        }

        let key = format!("{}.CollocationOptimization", prefix);
        reference.collocation_optimized = self
            .properties
            .get_as_int_with_default(&key, i32::from(reference.collocation_optimized))
            > 0;

        Ok(Some(reference))
    }

    /// Refuse further references from this factory and all its copies.
    pub fn destroy(&self) {
        self.destroyed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TraceLevels;
    use crate::logging::LogFacadeLogger;
    use crate::transport::{TcpEndpointFactory, UdpEndpointFactory};

    fn factory(props: Properties) -> ReferenceFactory {
        let endpoints = Arc::new(EndpointFactoryManager::new("tcp"));
        endpoints
            .add(Arc::new(TcpEndpointFactory::new(None)))
            .expect("tcp");
        endpoints
            .add(Arc::new(UdpEndpointFactory::new(None)))
            .expect("udp");
        let defaults = DefaultsAndOverrides::from_properties(&props).expect("defaults");
        ReferenceFactory::new(
            Weak::new(),
            endpoints,
            Arc::new(LocatorManager::new(
                Arc::new(LogFacadeLogger::default()),
                &TraceLevels::default(),
            )),
            Arc::new(RouterManager::new()),
            Arc::new(props),
            defaults,
        )
    }

    #[test]
    fn test_direct_proxy_string() {
        let f = factory(Properties::new());
        let r = f
            .create_from_string("hello -f admin -o:tcp -h 127.0.0.1 -p 10000 -t 1000:udp -h 127.0.0.1 -p 10001 -t 1000")
            .expect("parse")
            .expect("some");
        assert_eq!(r.identity(), &Identity::new("", "hello"));
        assert_eq!(r.facet(), "admin");
        assert_eq!(r.mode(), ReferenceMode::Oneway);
        assert_eq!(r.endpoints().len(), 2);
        assert_eq!(
            r.to_string(),
            "hello -f admin -o:tcp -h 127.0.0.1 -p 10000 -t 1000:udp -h 127.0.0.1 -p 10001 -t 1000"
        );
    }

    #[test]
    fn test_indirect_and_quoting() {
        let f = factory(Properties::new());
        let r = f
            .create_from_string("\"my object\" -s @ \"Adapter One\"")
            .expect("parse")
            .expect("some");
        assert_eq!(r.identity().name, "my object");
        assert_eq!(r.adapter_id(), "Adapter One");
        assert!(r.secure());
        assert_eq!(r.to_string(), "\"my object\" -t -s @ \"Adapter One\"");

        assert!(f.create_from_string("   ").expect("empty").is_none());
    }

    #[test]
    fn test_parse_errors() {
        let f = factory(Properties::new());
        assert!(matches!(
            f.create_from_string("hello -x"),
            Err(Error::ProxyParse(_))
        ));
        assert!(matches!(
            f.create_from_string("hello -f"),
            Err(Error::ProxyParse(_))
        ));
        assert!(matches!(
            f.create_from_string("\"hello"),
            Err(Error::ProxyParse(_))
        ));
        assert!(matches!(
            f.create_from_string("hello @ a b"),
            Err(Error::ProxyParse(_))
        ));
        assert!(matches!(
            f.create_from_string("hello:bogus -p 1"),
            Err(Error::EndpointParse(_))
        ));
    }

    #[test]
    fn test_property_sub_keys() {
        let props = Properties::new();
        props.set("Hello.Proxy", "hello @ HelloAdapter");
        props.set("Hello.Proxy.Locator", "IceGrid/Locator:tcp -h 127.0.0.1 -p 4061");
        props.set("Hello.Proxy.LocatorCacheTimeout", "30");
        props.set("Hello.Proxy.EndpointSelection", "Ordered");
        props.set("Hello.Proxy.CollocationOptimization", "0");
        let f = factory(props);

        let r = f
            .create_from_properties("Hello.Proxy")
            .expect("parse")
            .expect("some");
        let locator = r.locator().expect("locator");
        assert_eq!(locator.locator().identity(), &Identity::new("IceGrid", "Locator"));
        assert_eq!(r.locator_cache_timeout(), 30);
        assert_eq!(r.endpoint_selection(), EndpointSelection::Ordered);
        assert!(!r.collocation_optimized());

        assert!(f.create_from_properties("Missing.Proxy").expect("none").is_none());
    }

    #[test]
    fn test_destroyed_factory() {
        let f = factory(Properties::new());
        let copy = f.with_default_router(None);
        f.destroy();
        assert!(matches!(
            copy.create_from_string("hello"),
            Err(Error::CommunicatorDestroyed)
        ));
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object references, proxies and their factories.

mod factory;
mod reference;

pub use factory::ProxyFactory;
pub use reference::{Reference, ReferenceFactory, ReferenceMode};

use crate::connection::Connection;
use crate::core::Identity;
use crate::error::{Error, Result};
use crate::transport::Endpoint;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Untyped proxy: a shared, immutable [`Reference`].
#[derive(Clone)]
pub struct ObjectPrx {
    reference: Arc<Reference>,
}

impl ObjectPrx {
    pub fn new(reference: Arc<Reference>) -> Self {
        Self { reference }
    }

    pub fn reference(&self) -> &Arc<Reference> {
        &self.reference
    }

    pub fn identity(&self) -> &Identity {
        self.reference.identity()
    }

    pub fn facet(&self) -> &str {
        self.reference.facet()
    }

    pub fn adapter_id(&self) -> &str {
        self.reference.adapter_id()
    }

    pub fn endpoints(&self) -> &[Arc<dyn Endpoint>] {
        self.reference.endpoints()
    }

    /// Same object, another facet.
    pub fn with_facet(&self, facet: impl Into<String>) -> Self {
        Self::new(Arc::new(self.reference.with_facet(facet)))
    }

    /// Another object reached the same way.
    pub fn with_identity(&self, identity: Identity) -> Self {
        Self::new(Arc::new(self.reference.with_identity(identity)))
    }

    pub fn with_mode(&self, mode: ReferenceMode) -> Self {
        Self::new(Arc::new(self.reference.with_mode(mode)))
    }

    /// Connection used to reach this object, opened through the runtime's
    /// outgoing connection factory.
    pub fn connection(&self) -> Result<Arc<Connection>> {
        let runtime = self.reference.runtime().ok_or(Error::CommunicatorDestroyed)?;
        let endpoints = self.reference.resolve_endpoints()?;
        runtime.outgoing_connection_factory()?.create(&endpoints)
    }
}

impl fmt::Display for ObjectPrx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.reference, f)
    }
}

impl fmt::Debug for ObjectPrx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectPrx({})", self.reference)
    }
}

impl PartialEq for ObjectPrx {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.reference, &other.reference)
            || self.reference.to_string() == other.reference.to_string()
    }
}

impl Eq for ObjectPrx {}

impl Hash for ObjectPrx {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.reference.to_string().hash(state);
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Registry of endpoint factories, keyed by transport type id.

use super::{Endpoint, EndpointFactory};
use crate::error::{Error, Result};
use parking_lot::RwLock;
use std::sync::Arc;

/// Endpoint factories known to one runtime.
pub struct EndpointFactoryManager {
    factories: RwLock<Vec<Arc<dyn EndpointFactory>>>,
    default_protocol: String,
}

impl EndpointFactoryManager {
    /// Empty manager; `default_protocol` replaces the `default` keyword.
    pub fn new(default_protocol: impl Into<String>) -> Self {
        Self {
            factories: RwLock::new(Vec::new()),
            default_protocol: default_protocol.into(),
        }
    }

    /// Register a factory. A second factory for the same type id is rejected.
    pub fn add(&self, factory: Arc<dyn EndpointFactory>) -> Result<()> {
        let mut factories = self.factories.write();
        if factories.iter().any(|f| f.type_id() == factory.type_id()) {
            return Err(Error::already_registered(
                "endpoint factory",
                factory.protocol().to_string(),
            ));
        }
        log::debug!(
            "[orbcore] endpoint factory `{}' registered (type {})",
            factory.protocol(),
            factory.type_id()
        );
        factories.push(factory);
        Ok(())
    }

    /// Factory for transport `type_id`.
    pub fn get(&self, type_id: i16) -> Option<Arc<dyn EndpointFactory>> {
        self.factories
            .read()
            .iter()
            .find(|f| f.type_id() == type_id)
            .cloned()
    }

    /// Parse a complete endpoint string (`protocol options...`).
    pub fn create(&self, s: &str, server: bool) -> Result<Arc<dyn Endpoint>> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::EndpointParse("value has no non-whitespace characters".into()));
        }

        let (protocol, args) = match s.find(char::is_whitespace) {
            Some(pos) => (&s[..pos], &s[pos..]),
            None => (s, ""),
        };
        let protocol = if protocol == "default" {
            self.default_protocol.as_str()
        } else {
            protocol
        };

        let factory = self
            .factories
            .read()
            .iter()
            .find(|f| f.protocol() == protocol)
            .cloned()
            .ok_or_else(|| Error::EndpointParse(format!("unknown transport `{}'", protocol)))?;
        factory.create(args, server)
    }

    /// Destroy and forget every factory.
    pub fn destroy(&self) {
        let factories = std::mem::take(&mut *self.factories.write());
        for factory in factories {
            factory.destroy();
        }
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Admin object, admin facets and the runtime-wide defaults that replace
//! the reference factory.

use super::{Lifecycle, Runtime, Slot};
use crate::adapter::{ObjectAdapter, Servant};
use crate::admin::PROCESS_FACET;
use crate::config::TraceLevels;
use crate::core::{generate_uuid, Identity};
use crate::error::{Error, Result};
use crate::location::RegistryError;
use crate::proxy::ObjectPrx;
use std::sync::Arc;

/// Name of the object adapter hosting the admin facets.
pub const ADMIN_ADAPTER_NAME: &str = "Orb.Admin";

enum AdminLookup {
    Existing(Arc<ObjectAdapter>, Identity),
    Create(Identity),
}

impl Runtime {
    fn check_not_destroyed(&self, lifecycle: Lifecycle) -> Result<()> {
        if lifecycle == Lifecycle::Destroyed {
            Err(Error::CommunicatorDestroyed)
        } else {
            Ok(())
        }
    }

    /// Proxy of the admin object, creating and activating the admin adapter
    /// on first call.
    ///
    /// `Ok(None)` when `Orb.Admin.Endpoints` is not set. The admin identity
    /// is `admin/<Orb.Admin.InstanceName>` (a generated name when unset) and
    /// never changes once assigned. An activation failure destroys the
    /// adapter; the buffered facets it held are lost.
    pub fn get_admin(&self) -> Result<Option<ObjectPrx>> {
        let _creation = self.admin_creation.lock();

        let lookup = {
            let mut state = self.state.lock();
            self.check_not_destroyed(state.lifecycle)?;
            match (state.admin.adapter.clone(), state.admin.identity.clone()) {
                (Some(adapter), Some(identity)) => AdminLookup::Existing(adapter, identity),
                _ => {
                    if self
                        .properties
                        .get_with_default(&format!("{}.Endpoints", ADMIN_ADAPTER_NAME), "")
                        .is_empty()
                    {
                        return Ok(None);
                    }
                    let identity = state
                        .admin
                        .identity
                        .get_or_insert_with(|| {
                            let instance_name = match self
                                .properties
                                .get_with_default("Orb.Admin.InstanceName", "")
                            {
                                name if name.is_empty() => generate_uuid(),
                                name => name,
                            };
                            Identity::new("admin", instance_name)
                        })
                        .clone();
                    AdminLookup::Create(identity)
                }
            }
        };

        let identity = match lookup {
            AdminLookup::Existing(adapter, identity) => {
                return adapter.create_proxy(identity).map(Some)
            }
            AdminLookup::Create(identity) => identity,
        };

        let adapter = self
            .object_adapter_factory()?
            .create_object_adapter(ADMIN_ADAPTER_NAME, None)?;
        let moved = {
            let mut state = self.state.lock();
            if state.lifecycle == Lifecycle::Destroyed {
                drop(state);
                adapter.destroy();
                return Err(Error::CommunicatorDestroyed);
            }
            let facets = std::mem::take(&mut state.admin.facets);
            let mut moved = Ok(());
            for (name, servant) in facets {
                if state.admin.is_excluded(&name) {
                    state.admin.facets.insert(name, servant);
                } else if moved.is_ok() {
                    moved = adapter.insert_facet(servant, identity.clone(), &name);
                }
            }
            state.admin.adapter = Some(Arc::clone(&adapter));
            moved
        };

        if let Err(e) = moved.and_then(|()| adapter.activate()) {
            adapter.destroy();
            self.state.lock().admin.adapter = None;
            return Err(e);
        }
        log::debug!("[orbcore] admin adapter activated for `{}'", identity);

        let admin = adapter.create_proxy(identity)?;
        self.register_process_proxy(&admin)?;
        Ok(Some(admin))
    }

    /// Publish the `Process` facet of `admin` to the default locator's
    /// registry when `Orb.Admin.ServerId` is set.
    fn register_process_proxy(&self, admin: &ObjectPrx) -> Result<()> {
        let server_id = self.properties.get_with_default("Orb.Admin.ServerId", "");
        if server_id.is_empty() {
            return Ok(());
        }
        let Some(locator) = self.reference_factory()?.default_locator().cloned() else {
            return Ok(());
        };
        let Some(registry) = locator.registry()? else {
            return Ok(());
        };

        let trace = self.trace_levels.location >= 1;
        let process = admin.with_facet(PROCESS_FACET);
        match registry.set_server_process_proxy(&server_id, &process) {
            Ok(()) => {
                if trace {
                    self.logger.trace(
                        TraceLevels::LOCATION_CAT,
                        &format!("registered server `{}' with the locator registry", server_id),
                    );
                }
                Ok(())
            }
            Err(RegistryError::ServerNotFound) => {
                if trace {
                    self.logger.trace(
                        TraceLevels::LOCATION_CAT,
                        &format!(
                            "couldn't register server `{}' with the locator registry:\n\
                             the server is not known to the locator registry",
                            server_id
                        ),
                    );
                }
                Err(Error::Initialization(format!(
                    "Locator knows nothing about server '{}'",
                    server_id
                )))
            }
            Err(e) => {
                if trace {
                    self.logger.trace(
                        TraceLevels::LOCATION_CAT,
                        &format!(
                            "couldn't register server `{}' with the locator registry:\n{}",
                            server_id, e
                        ),
                    );
                }
                Err(Error::Registry(e.to_string()))
            }
        }
    }

    /// Add an admin facet. Goes to the live admin adapter unless the facet
    /// is filtered out by `Orb.Admin.Facets` or no adapter exists yet, in
    /// which case it is buffered.
    pub fn add_admin_facet(&self, servant: Arc<dyn Servant>, facet: &str) -> Result<()> {
        let mut state = self.state.lock();
        self.check_not_destroyed(state.lifecycle)?;
        let live = match (&state.admin.adapter, &state.admin.identity) {
            (Some(adapter), Some(identity)) if !state.admin.is_excluded(facet) => {
                Some((Arc::clone(adapter), identity.clone()))
            }
            _ => None,
        };
        match live {
            Some((adapter, identity)) => adapter.insert_facet(servant, identity, facet),
            None => {
                if state.admin.facets.contains_key(facet) {
                    return Err(Error::already_registered("facet", facet));
                }
                state.admin.facets.insert(facet.to_string(), servant);
                Ok(())
            }
        }
    }

    /// Remove an admin facet from wherever [`add_admin_facet`](Self::add_admin_facet)
    /// put it.
    pub fn remove_admin_facet(&self, facet: &str) -> Result<Arc<dyn Servant>> {
        let mut state = self.state.lock();
        self.check_not_destroyed(state.lifecycle)?;
        let live = match (&state.admin.adapter, &state.admin.identity) {
            (Some(adapter), Some(identity)) if !state.admin.is_excluded(facet) => {
                Some((Arc::clone(adapter), identity.clone()))
            }
            _ => None,
        };
        match live {
            Some((adapter, identity)) => adapter.remove_facet(&identity, facet),
            None => state
                .admin
                .facets
                .remove(facet)
                .ok_or_else(|| Error::not_registered("facet", facet)),
        }
    }

    /// Admin identity, once assigned by [`get_admin`](Self::get_admin).
    pub fn admin_identity(&self) -> Option<Identity> {
        self.state.lock().admin.identity.clone()
    }

    /// Replace the default locator of every reference created from now on.
    pub fn set_default_locator(&self, locator: Option<&ObjectPrx>) -> Result<()> {
        let mut state = self.state.lock();
        self.check_not_destroyed(state.lifecycle)?;
        let factory = state.reference_factory.get("reference factory")?;
        state.reference_factory = Slot::Ready(factory.with_default_locator(locator));
        Ok(())
    }

    /// Replace the default router of every reference created from now on.
    pub fn set_default_router(&self, router: Option<&ObjectPrx>) -> Result<()> {
        let mut state = self.state.lock();
        self.check_not_destroyed(state.lifecycle)?;
        let factory = state.reference_factory.get("reference factory")?;
        state.reference_factory = Slot::Ready(factory.with_default_router(router));
        Ok(())
    }

    /// Flush queued batch requests on every outgoing connection.
    pub fn flush_batch_requests(&self) -> Result<()> {
        self.outgoing_connection_factory()?.flush_batch_requests();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::InitializationData;
    use super::*;
    use crate::admin::{ProcessAdmin, PropertiesAdmin, PROPERTIES_FACET};
    use crate::config::Properties;
    use std::any::Any;

    struct Metrics;

    impl Servant for Metrics {
        fn interface_id(&self) -> &str {
            "::Demo::Metrics"
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn runtime(props: &[(&str, &str)]) -> Arc<Runtime> {
        let properties = Arc::new(Properties::new());
        for (k, v) in props {
            properties.set(k, v);
        }
        let runtime = Runtime::new(InitializationData {
            properties: Some(properties),
            ..Default::default()
        })
        .expect("runtime");
        runtime.finish_setup(&mut Vec::new()).expect("setup");
        runtime
    }

    #[test]
    fn test_no_admin_without_endpoints() {
        let runtime = runtime(&[]);
        assert!(runtime.get_admin().expect("get_admin").is_none());
        assert!(runtime.admin_identity().is_none());
        assert!(runtime.destroy());
        assert!(matches!(
            runtime.get_admin(),
            Err(Error::CommunicatorDestroyed)
        ));
    }

    #[test]
    fn test_builtin_facets_buffered() {
        let runtime = runtime(&[]);
        let props = runtime.remove_admin_facet(PROPERTIES_FACET).expect("properties");
        assert!(props.as_any().downcast_ref::<PropertiesAdmin>().is_some());
        let process = runtime.remove_admin_facet(PROCESS_FACET).expect("process");
        assert!(process.as_any().downcast_ref::<ProcessAdmin>().is_some());
        assert!(matches!(
            runtime.remove_admin_facet(PROCESS_FACET),
            Err(Error::NotRegistered { .. })
        ));
        assert!(runtime.destroy());
    }

    #[test]
    fn test_duplicate_buffered_facet_rejected() {
        let runtime = runtime(&[]);
        runtime.add_admin_facet(Arc::new(Metrics), "Metrics").expect("add");
        assert!(matches!(
            runtime.add_admin_facet(Arc::new(Metrics), "Metrics"),
            Err(Error::AlreadyRegistered { kind: "facet", .. })
        ));
        assert!(runtime.destroy());
    }

    #[test]
    fn test_admin_identity_is_stable() {
        let runtime = runtime(&[
            ("Orb.Admin.Endpoints", "tcp -h 127.0.0.1 -p 0"),
            ("Orb.Admin.InstanceName", "demo"),
        ]);
        let first = runtime.get_admin().expect("admin").expect("proxy");
        let second = runtime.get_admin().expect("admin").expect("proxy");
        assert_eq!(first.identity(), &Identity::new("admin", "demo"));
        assert_eq!(first, second);
        assert_eq!(runtime.admin_identity(), Some(Identity::new("admin", "demo")));
        assert!(runtime.destroy());
    }

    #[test]
    fn test_set_default_locator_replaces_reference_factory() {
        let runtime = runtime(&[]);
        let before = runtime.reference_factory().expect("factory");
        assert!(before.default_locator().is_none());

        let locator = runtime
            .proxy_factory()
            .expect("proxy factory")
            .string_to_proxy("Demo/Locator:tcp -h 127.0.0.1 -p 4061")
            .expect("parse")
            .expect("proxy");
        runtime.set_default_locator(Some(&locator)).expect("set");
        let after = runtime.reference_factory().expect("factory");
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(
            after.default_locator().map(|l| l.locator().identity().clone()),
            Some(Identity::new("Demo", "Locator"))
        );
        assert!(runtime.flush_batch_requests().is_ok());
        assert!(runtime.destroy());
        assert!(matches!(
            runtime.set_default_router(None),
            Err(Error::CommunicatorDestroyed)
        ));
    }
}

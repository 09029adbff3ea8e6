// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Application entry point.

use crate::adapter::{ObjectAdapter, Servant};
use crate::config::Properties;
use crate::core::{Identity, ImplicitContext};
use crate::error::Result;
use crate::logging::Logger;
use crate::plugin::PluginManager;
use crate::proxy::ObjectPrx;
use crate::runtime::{InitializationData, Runtime};
use std::fmt;
use std::sync::Arc;

/// Handle on one runtime. Dropping it destroys the runtime.
pub struct Communicator {
    runtime: Arc<Runtime>,
}

impl Communicator {
    /// Create and set up a runtime.
    pub fn initialize(init: InitializationData) -> Result<Self> {
        Self::initialize_with_args(&mut Vec::new(), init)
    }

    /// Like [`initialize`](Self::initialize), also consuming `--Orb.*` and
    /// plugin options from `args`. Options given on the command line
    /// override properties passed in `init`.
    pub fn initialize_with_args(
        args: &mut Vec<String>,
        mut init: InitializationData,
    ) -> Result<Self> {
        let properties = match init.properties.take() {
            Some(props) => {
                *args = props.parse_command_line(crate::config::RUNTIME_PREFIX, args);
                props
            }
            None => Arc::new(Properties::from_args(args)?),
        };
        init.properties = Some(properties);

        let runtime = Runtime::new(init)?;
        if let Err(e) = runtime.finish_setup(args) {
            runtime.destroy();
            return Err(e);
        }
        Ok(Self { runtime })
    }

    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    /// Destroy the runtime. Later calls do nothing.
    pub fn destroy(&self) {
        self.runtime.destroy();
    }

    /// Deactivate every object adapter.
    pub fn shutdown(&self) -> Result<()> {
        self.runtime.object_adapter_factory()?.shutdown();
        Ok(())
    }

    /// Block until [`shutdown`](Self::shutdown) completed.
    pub fn wait_for_shutdown(&self) -> Result<()> {
        self.runtime.object_adapter_factory()?.wait_for_shutdown();
        Ok(())
    }

    /// True once shut down or destroyed.
    pub fn is_shutdown(&self) -> bool {
        match self.runtime.object_adapter_factory() {
            Ok(factory) => factory.is_shutdown(),
            Err(_) => true,
        }
    }

    pub fn string_to_proxy(&self, s: &str) -> Result<Option<ObjectPrx>> {
        self.runtime.proxy_factory()?.string_to_proxy(s)
    }

    pub fn proxy_to_string(&self, proxy: Option<&ObjectPrx>) -> Result<String> {
        Ok(self.runtime.proxy_factory()?.proxy_to_string(proxy))
    }

    pub fn property_to_proxy(&self, prefix: &str) -> Result<Option<ObjectPrx>> {
        self.runtime.proxy_factory()?.property_to_proxy(prefix)
    }

    pub fn string_to_identity(&self, s: &str) -> Result<Identity> {
        Identity::parse(s)
    }

    pub fn identity_to_string(&self, identity: &Identity) -> String {
        identity.to_string()
    }

    pub fn create_object_adapter(&self, name: &str) -> Result<Arc<ObjectAdapter>> {
        self.runtime
            .object_adapter_factory()?
            .create_object_adapter(name, None)
    }

    pub fn create_object_adapter_with_endpoints(
        &self,
        name: &str,
        endpoints: &str,
    ) -> Result<Arc<ObjectAdapter>> {
        self.runtime
            .object_adapter_factory()?
            .create_object_adapter_with_endpoints(name, endpoints)
    }

    /// Adapter whose proxies are routed through `router`.
    pub fn create_object_adapter_with_router(
        &self,
        name: &str,
        router: &ObjectPrx,
    ) -> Result<Arc<ObjectAdapter>> {
        self.runtime
            .object_adapter_factory()?
            .create_object_adapter(name, Some(router))
    }

    pub fn get_admin(&self) -> Result<Option<ObjectPrx>> {
        self.runtime.get_admin()
    }

    pub fn add_admin_facet(&self, servant: Arc<dyn Servant>, facet: &str) -> Result<()> {
        self.runtime.add_admin_facet(servant, facet)
    }

    pub fn remove_admin_facet(&self, facet: &str) -> Result<Arc<dyn Servant>> {
        self.runtime.remove_admin_facet(facet)
    }

    pub fn set_default_router(&self, router: Option<&ObjectPrx>) -> Result<()> {
        self.runtime.set_default_router(router)
    }

    pub fn set_default_locator(&self, locator: Option<&ObjectPrx>) -> Result<()> {
        self.runtime.set_default_locator(locator)
    }

    pub fn default_router(&self) -> Result<Option<ObjectPrx>> {
        Ok(self
            .runtime
            .reference_factory()?
            .default_router()
            .map(|info| info.router().clone()))
    }

    pub fn default_locator(&self) -> Result<Option<ObjectPrx>> {
        Ok(self
            .runtime
            .reference_factory()?
            .default_locator()
            .map(|info| info.locator().clone()))
    }

    pub fn flush_batch_requests(&self) -> Result<()> {
        self.runtime.flush_batch_requests()
    }

    pub fn implicit_context(&self) -> Option<&Arc<ImplicitContext>> {
        self.runtime.implicit_context()
    }

    pub fn properties(&self) -> &Arc<Properties> {
        self.runtime.properties()
    }

    pub fn logger(&self) -> &Arc<dyn Logger> {
        self.runtime.logger()
    }

    pub fn plugin_manager(&self) -> Result<Arc<PluginManager>> {
        self.runtime.plugin_manager()
    }
}

impl Drop for Communicator {
    fn drop(&mut self) {
        self.runtime.destroy();
    }
}

impl fmt::Debug for Communicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Communicator")
            .field("runtime", &self.runtime)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_command_line_overrides_properties() {
        let props = Arc::new(Properties::new());
        props.set("Orb.MessageSizeMax", "4");
        let mut args = vec![
            "app".to_string(),
            "--Orb.MessageSizeMax=8".to_string(),
            "positional".to_string(),
        ];
        let communicator = Communicator::initialize_with_args(
            &mut args,
            InitializationData {
                properties: Some(props),
                ..Default::default()
            },
        )
        .expect("initialize");
        assert_eq!(args, vec!["app", "positional"]);
        assert_eq!(communicator.runtime().message_size_max(), 8 * 1024);
    }

    #[test]
    fn test_identity_helpers() {
        let communicator = Communicator::initialize(InitializationData::default()).expect("init");
        let id = communicator.string_to_identity("cat/name").expect("parse");
        assert_eq!(communicator.identity_to_string(&id), "cat/name");
        assert!(matches!(
            communicator.string_to_identity(""),
            Err(Error::IdentityParse(_))
        ));
    }

    #[test]
    fn test_drop_destroys_runtime() {
        let communicator = Communicator::initialize(InitializationData::default()).expect("init");
        let runtime = Arc::clone(communicator.runtime());
        assert!(!communicator.is_shutdown());
        drop(communicator);
        assert!(runtime.is_destroyed());
    }
}

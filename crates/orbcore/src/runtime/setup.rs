// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime construction and the finish-setup phase.

use super::{process, AdminState, Runtime, Slot, State};
use crate::adapter::{ObjectAdapterFactory, Servant, ServantFactoryManager};
use crate::admin::{ProcessAdmin, PropertiesAdmin, PROCESS_FACET, PROPERTIES_FACET};
use crate::config::{self, DefaultsAndOverrides, Properties, TraceLevels};
use crate::connection::{ConnectionMonitor, OutgoingConnectionFactory};
use crate::core::{ImplicitContext, ThreadNotification, ThreadOptions, ThreadPriority};
use crate::error::{Error, Result};
use crate::location::{LocatorManager, RouterManager};
use crate::logging::{logger_from_properties, Logger};
use crate::plugin::PluginManager;
use crate::proxy::{ProxyFactory, ReferenceFactory};
use crate::rt::{RetryQueue, ThreadPool, Timer};
use crate::transport::{
    EndpointFactoryManager, EndpointHostResolver, TcpEndpointFactory, UdpEndpointFactory,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// What a runtime is created from. Unset fields get their defaults: empty
/// properties, a logger chosen from the properties, no thread hook.
#[derive(Clone, Default)]
pub struct InitializationData {
    pub properties: Option<Arc<Properties>>,
    pub logger: Option<Arc<dyn Logger>>,
    pub thread_hook: Option<Arc<dyn ThreadNotification>>,
}

impl Runtime {
    /// Build the configuration snapshot and every non-thread subsystem.
    ///
    /// Thread-owning subsystems start in [`finish_setup`](Self::finish_setup).
    /// If anything fails once subsystems exist, the runtime is destroyed
    /// before the error is returned.
    pub fn new(init: InitializationData) -> Result<Arc<Self>> {
        let properties = init.properties.unwrap_or_default();

        process::redirect_stdio(&properties)?;

        let logger = match init.logger {
            Some(logger) => logger,
            None => logger_from_properties(&properties)?,
        };
        let trace_levels = TraceLevels::from_properties(&properties);
        let defaults = DefaultsAndOverrides::from_properties(&properties)?;
        let message_size_max = config::message_size_max(&properties);
        let client_acm = config::client_acm(&properties);
        let server_acm = config::server_acm(&properties);
        let implicit_context =
            ImplicitContext::create(&properties.get_with_default("Orb.ImplicitContext", ""))?;
        let protocol_support = config::protocol_support(&properties)?;
        let priority = match properties.get_with_default("Orb.ThreadPriority", "").as_str() {
            "" => None,
            value => Some(ThreadPriority::parse(value)?),
        };
        let thread_options = ThreadOptions {
            hook: init.thread_hook,
            priority,
            stack_size: None,
        };

        let runtime = Arc::new_cyclic(|weak| Runtime {
            self_ref: weak.clone(),
            properties,
            logger,
            thread_options,
            trace_levels,
            defaults,
            message_size_max,
            client_acm,
            server_acm,
            protocol_support,
            implicit_context,
            state: Mutex::new(State::default()),
            admin_creation: Mutex::new(()),
        });

        if let Err(e) = runtime.create_subsystems() {
            runtime.destroy();
            return Err(e);
        }
        log::debug!(
            "[orbcore] runtime created (message size max {} bytes)",
            runtime.message_size_max
        );
        Ok(runtime)
    }

    fn create_subsystems(&self) -> Result<()> {
        let weak = self.self_ref.clone();
        let props = &self.properties;

        let router_manager = Arc::new(RouterManager::new());
        let locator_manager = Arc::new(LocatorManager::new(
            Arc::clone(&self.logger),
            &self.trace_levels,
        ));
        let endpoint_factory_manager = Arc::new(EndpointFactoryManager::new(
            self.defaults.default_protocol.clone(),
        ));
        let reference_factory = Arc::new(ReferenceFactory::new(
            weak.clone(),
            Arc::clone(&endpoint_factory_manager),
            Arc::clone(&locator_manager),
            Arc::clone(&router_manager),
            Arc::clone(props),
            self.defaults.clone(),
        ));
        let proxy_factory = Arc::new(ProxyFactory::new(weak.clone(), props, &self.logger));

        let default_host = self.defaults.default_host.clone();
        endpoint_factory_manager.add(Arc::new(TcpEndpointFactory::new(default_host.clone())))?;
        endpoint_factory_manager.add(Arc::new(UdpEndpointFactory::new(default_host)))?;

        let plugin_manager = Arc::new(PluginManager::new(weak.clone()));
        let outgoing_connection_factory = Arc::new(OutgoingConnectionFactory::new(weak.clone()));
        let servant_factory_manager = Arc::new(ServantFactoryManager::new());
        let object_adapter_factory = Arc::new(ObjectAdapterFactory::new(weak.clone()));

        let mut facets: BTreeMap<String, Arc<dyn Servant>> = BTreeMap::new();
        facets.insert(
            PROPERTIES_FACET.to_string(),
            Arc::new(PropertiesAdmin::new(Arc::clone(props))),
        );
        facets.insert(PROCESS_FACET.to_string(), Arc::new(ProcessAdmin::new(weak)));
        let admin = AdminState {
            adapter: None,
            identity: None,
            facets,
            facet_filter: props.get_as_list("Orb.Admin.Facets").into_iter().collect(),
        };

        let mut state = self.state.lock();
        state.router_manager = Slot::Ready(router_manager);
        state.locator_manager = Slot::Ready(locator_manager);
        state.reference_factory = Slot::Ready(reference_factory);
        state.proxy_factory = Slot::Ready(proxy_factory);
        state.endpoint_factory_manager = Slot::Ready(endpoint_factory_manager);
        state.plugin_manager = Slot::Ready(plugin_manager);
        state.outgoing_connection_factory = Slot::Ready(outgoing_connection_factory);
        state.servant_factory_manager = Slot::Ready(servant_factory_manager);
        state.object_adapter_factory = Slot::Ready(object_adapter_factory);
        state.admin = admin;
        Ok(())
    }

    /// Load plugins, start the runtime threads, resolve the default router
    /// and locator, start connection monitoring, initialize plugins and
    /// create the admin object.
    ///
    /// `args` loses the options consumed by plugins. On error the caller
    /// destroys the runtime.
    pub fn finish_setup(&self, args: &mut Vec<String>) -> Result<()> {
        let plugin_manager = self.plugin_manager()?;
        plugin_manager.load_plugins(args)?;

        let timer = Timer::start(&self.thread_options)
            .map(Arc::new)
            .inspect_err(|e| {
                self.logger
                    .error(&format!("cannot create thread for timer:\n{}", e))
            })?;
        self.install(|s| &mut s.timer, &timer, Timer::destroy)?;
        let retry_queue = Arc::new(RetryQueue::new(
            Arc::clone(&timer),
            Arc::clone(&self.logger),
            &self.trace_levels,
        ));
        self.install(|s| &mut s.retry_queue, &retry_queue, RetryQueue::destroy)?;

        let resolver = EndpointHostResolver::start(
            self.protocol_support,
            Arc::clone(&self.logger),
            &self.trace_levels,
            &self.thread_options,
        )
        .map(Arc::new)
        .inspect_err(|e| {
            self.logger.error(&format!(
                "cannot create thread for endpoint host resolver:\n{}",
                e
            ))
        })?;
        self.install(|s| &mut s.endpoint_host_resolver, &resolver, |r| {
            r.destroy();
            r.join_with_thread();
        })?;

        let client_pool = Arc::new(ThreadPool::new(
            "Orb.ThreadPool.Client",
            &self.properties,
            &self.thread_options,
            &self.logger,
            &self.trace_levels,
            None,
        )?);
        self.install(|s| &mut s.client_thread_pool, &client_pool, |p| {
            p.destroy();
            p.join_with_all_threads();
        })?;

        // Default proxies may use endpoint factories installed by plugins.
        let proxy_factory = self.proxy_factory()?;
        if let Some(router) = proxy_factory.property_to_proxy("Orb.Default.Router")? {
            self.set_default_router(Some(&router))?;
        }
        if let Some(locator) = proxy_factory.property_to_proxy("Orb.Default.Locator")? {
            self.set_default_locator(Some(&locator))?;
        }

        if self.properties.get_as_int("Orb.PrintProcessId") > 0 {
            process::print_process_id_once();
        }

        let interval = self.properties.get_as_int("Orb.MonitorConnections");
        let monitor = Arc::new(ConnectionMonitor::new(
            self.self_ref.clone(),
            Arc::clone(&timer),
            interval,
        )?);
        self.install(|s| &mut s.connection_monitor, &monitor, ConnectionMonitor::destroy)?;
        monitor.check_interval_for_acm(self.client_acm)?;
        monitor.check_interval_for_acm(self.server_acm)?;

        if self.properties.get_as_int_with_default("Orb.InitPlugins", 1) > 0 {
            plugin_manager.initialize_plugins()?;
        }

        // Last: the admin adapter accepts remote calls as soon as it is
        // registered with the locator.
        if self
            .properties
            .get_as_int_with_default("Orb.Admin.DelayCreation", 0)
            <= 0
        {
            self.get_admin()?;
        }
        log::debug!("[orbcore] runtime setup finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn init(props: &[(&str, &str)]) -> InitializationData {
        let properties = Arc::new(Properties::new());
        for (k, v) in props {
            properties.set(k, v);
        }
        InitializationData {
            properties: Some(properties),
            ..Default::default()
        }
    }

    #[test]
    fn test_invalid_configuration_rejected() {
        assert!(matches!(
            Runtime::new(init(&[("Orb.IPv4", "0"), ("Orb.IPv6", "0")])),
            Err(Error::Initialization(_))
        ));
        assert!(matches!(
            Runtime::new(init(&[("Orb.ImplicitContext", "Bogus")])),
            Err(Error::Initialization(_))
        ));
        assert!(matches!(
            Runtime::new(init(&[("Orb.ThreadPriority", "Urgent")])),
            Err(Error::Initialization(_))
        ));
    }

    #[test]
    fn test_builtin_endpoint_factories_registered() {
        let runtime = Runtime::new(init(&[])).expect("runtime");
        let manager = runtime.endpoint_factory_manager().expect("manager");
        assert!(manager.get(crate::transport::TCP_ENDPOINT_TYPE).is_some());
        assert!(manager.get(crate::transport::UDP_ENDPOINT_TYPE).is_some());
        assert!(runtime.destroy());
    }

    #[test]
    fn test_finish_setup_starts_threads_with_hook() {
        #[derive(Default)]
        struct Hook {
            started: AtomicUsize,
            stopped: AtomicUsize,
        }
        impl ThreadNotification for Hook {
            fn start(&self) {
                self.started.fetch_add(1, Ordering::SeqCst);
            }
            fn stop(&self) {
                self.stopped.fetch_add(1, Ordering::SeqCst);
            }
        }

        let hook = Arc::new(Hook::default());
        let mut data = init(&[("Orb.ThreadPool.Client.Size", "2")]);
        data.thread_hook = Some(hook.clone());
        let runtime = Runtime::new(data).expect("runtime");
        runtime.finish_setup(&mut Vec::new()).expect("setup");
        assert!(runtime.timer().is_ok());
        assert!(runtime.retry_queue().is_ok());
        assert_eq!(runtime.client_thread_pool().expect("pool").size(), 2);

        assert!(runtime.destroy());
        // timer + resolver + 2 client workers, all joined by destroy
        assert_eq!(hook.started.load(Ordering::SeqCst), 4);
        assert_eq!(hook.stopped.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_connection_monitor_interval_follows_acm() {
        let runtime = Runtime::new(init(&[
            ("Orb.MonitorConnections", "120"),
            ("Orb.ACM.Client", "45"),
            ("Orb.ACM.Server", "90"),
        ]))
        .expect("runtime");
        runtime.finish_setup(&mut Vec::new()).expect("setup");
        let monitor = runtime.connection_monitor().expect("monitor");
        assert_eq!(monitor.interval(), std::time::Duration::from_secs(45));
        assert!(runtime.destroy());
    }
}

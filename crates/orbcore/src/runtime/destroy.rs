// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime teardown.

use super::{Lifecycle, Runtime};
use std::sync::Arc;

impl Runtime {
    /// Tear the runtime down.
    ///
    /// Returns false, doing nothing, unless the runtime is `Active`.
    /// Otherwise shuts the adapters down, drains outgoing connections,
    /// releases every subsystem in reverse dependency order and joins the
    /// runtime threads. Blocks the caller until all of that is done.
    pub fn destroy(&self) -> bool {
        let (adapter_factory, connection_factory, retry_queue) = {
            let mut state = self.state.lock();
            if state.lifecycle != Lifecycle::Active {
                return false;
            }
            // Not Destroyed yet: adapters being deactivated still need the
            // connection factory and friends.
            state.lifecycle = Lifecycle::DestroyInProgress;
            (
                state.object_adapter_factory.ready(),
                state.outgoing_connection_factory.ready(),
                state.retry_queue.ready(),
            )
        };
        log::debug!("[orbcore] destroying runtime");

        if let Some(ref factory) = adapter_factory {
            factory.shutdown();
        }
        if let Some(ref factory) = connection_factory {
            factory.destroy();
        }
        if let Some(ref factory) = adapter_factory {
            factory.destroy();
        }
        if let Some(ref factory) = connection_factory {
            factory.wait_until_finished();
        }
        if let Some(ref queue) = retry_queue {
            queue.destroy();
        }
        drop((adapter_factory, connection_factory, retry_queue));

        let mut state = self.state.lock();
        state.object_adapter_factory.take();
        state.outgoing_connection_factory.take();
        state.retry_queue.take();
        let connection_monitor = state.connection_monitor.take();
        let server_thread_pool = state.server_thread_pool.take();
        let client_thread_pool = state.client_thread_pool.take();
        let async_io_thread = state.async_io_thread.take();
        let endpoint_host_resolver = state.endpoint_host_resolver.take();
        let timer = state.timer.take();
        let servant_factory_manager = state.servant_factory_manager.take();
        let reference_factory = state.reference_factory.take();
        state.proxy_factory.take();
        let router_manager = state.router_manager.take();
        let locator_manager = state.locator_manager.take();
        let endpoint_factory_manager = state.endpoint_factory_manager.take();
        let plugin_manager = state.plugin_manager.take();
        let admin_adapter = state.admin.adapter.take();
        let admin_facets = std::mem::take(&mut state.admin.facets);
        drop(state);

        if let Some(ref monitor) = connection_monitor {
            monitor.destroy();
        }
        if let Some(ref pool) = server_thread_pool {
            pool.destroy();
        }
        if let Some(ref pool) = client_thread_pool {
            pool.destroy();
        }
        if let Some(ref io) = async_io_thread {
            io.destroy();
        }
        if let Some(ref resolver) = endpoint_host_resolver {
            resolver.destroy();
        }
        if let Some(ref timer) = timer {
            timer.destroy();
        }
        if let Some(ref manager) = servant_factory_manager {
            manager.destroy();
        }
        if let Some(ref factory) = reference_factory {
            factory.destroy();
        }
        if let Some(ref manager) = router_manager {
            manager.destroy();
        }
        if let Some(ref manager) = locator_manager {
            manager.destroy();
        }
        if let Some(ref manager) = endpoint_factory_manager {
            manager.destroy();
        }
        if let Some(ref manager) = plugin_manager {
            manager.destroy();
        }
        drop((admin_adapter, admin_facets));

        self.state.lock().lifecycle = Lifecycle::Destroyed;

        join_pool(client_thread_pool);
        join_pool(server_thread_pool);
        if let Some(io) = async_io_thread {
            io.join_with_thread();
        }
        if let Some(resolver) = endpoint_host_resolver {
            resolver.join_with_thread();
        }

        self.warn_unused_properties();
        log::debug!("[orbcore] runtime destroyed");
        true
    }

    fn warn_unused_properties(&self) {
        if self.properties.get_as_int("Orb.Warn.UnusedProperties") <= 0 {
            return;
        }
        let unused = self.properties.unused_properties();
        if unused.is_empty() {
            return;
        }
        let mut message = String::from("The following properties were set but never read:");
        for key in unused {
            message.push_str("\n  ");
            message.push_str(&key);
        }
        self.logger.warning(&message);
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        if self.lifecycle() == Lifecycle::Active {
            log::debug!("[orbcore] runtime dropped without destroy");
            self.destroy();
        }
    }
}

fn join_pool(pool: Option<Arc<crate::rt::ThreadPool>>) {
    if let Some(pool) = pool {
        pool.join_with_all_threads();
    }
}

#[cfg(test)]
mod tests {
    use super::super::InitializationData;
    use super::*;
    use crate::config::Properties;
    use crate::error::Error;
    use crate::logging::Logger;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CapturingLogger {
        warnings: Mutex<Vec<String>>,
    }

    impl Logger for CapturingLogger {
        fn print(&self, _message: &str) {}
        fn trace(&self, _category: &str, _message: &str) {}
        fn warning(&self, message: &str) {
            self.warnings.lock().push(message.to_string());
        }
        fn error(&self, _message: &str) {}
    }

    fn runtime(props: &[(&str, &str)], logger: Arc<CapturingLogger>) -> Arc<Runtime> {
        let properties = Arc::new(Properties::new());
        for (k, v) in props {
            properties.set(k, v);
        }
        let runtime = Runtime::new(InitializationData {
            properties: Some(properties),
            logger: Some(logger),
            thread_hook: None,
        })
        .expect("runtime");
        runtime.finish_setup(&mut Vec::new()).expect("setup");
        runtime
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let runtime = runtime(&[], Arc::new(CapturingLogger::default()));
        assert!(runtime.destroy());
        assert!(!runtime.destroy());
        assert_eq!(runtime.lifecycle(), Lifecycle::Destroyed);
        assert!(matches!(
            runtime.object_adapter_factory(),
            Err(Error::CommunicatorDestroyed)
        ));
        assert!(matches!(
            runtime.plugin_manager(),
            Err(Error::CommunicatorDestroyed)
        ));
    }

    #[test]
    fn test_unused_properties_warning() {
        let logger = Arc::new(CapturingLogger::default());
        let runtime = runtime(
            &[("Orb.Warn.UnusedProperties", "1"), ("Demo.Unread", "x")],
            Arc::clone(&logger),
        );
        assert!(runtime.destroy());
        let warnings = logger.warnings.lock();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Demo.Unread"));
    }

    #[test]
    fn test_no_warning_when_disabled() {
        let logger = Arc::new(CapturingLogger::default());
        let runtime = runtime(&[("Demo.Unread", "x")], Arc::clone(&logger));
        assert!(runtime.destroy());
        assert!(logger.warnings.lock().is_empty());
    }

    #[test]
    fn test_concurrent_destroy_runs_once() {
        let runtime = runtime(&[], Arc::new(CapturingLogger::default()));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let rt = Arc::clone(&runtime);
                std::thread::spawn(move || rt.destroy())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().expect("join"))
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The runtime core: one per communicator.
//!
//! [`Runtime`] owns every subsystem and arbitrates their lifetime:
//!
//! ```text
//!   Runtime::new()            finish_setup()              destroy()
//!  ┌──────────────────┐     ┌───────────────────┐     ┌──────────────────────┐
//!  │ config snapshot  │ ──► │ plugins loaded    │ ──► │ adapters shut down   │
//!  │ managers,        │     │ timer, resolver,  │     │ connections drained  │
//!  │ factories        │     │ client pool,      │     │ handles released     │
//!  │ admin facets     │     │ monitor, admin    │     │ threads joined       │
//!  └──────────────────┘     └───────────────────┘     └──────────────────────┘
//!        Active                   Active             DestroyInProgress → Destroyed
//! ```
//!
//! ## Locking
//!
//! A single mutex guards the lifecycle state and every subsystem handle. It
//! is held for inspection and handle swaps only, never across a subsystem's
//! own shutdown, destroy or join. Accessors fail with
//! [`Error::CommunicatorDestroyed`] once the state is `Destroyed`; during
//! `DestroyInProgress` they still succeed so that subsystems being torn down
//! can reach each other.

mod admin;
mod destroy;
pub(crate) mod process;
mod setup;

pub use admin::ADMIN_ADAPTER_NAME;
pub use setup::InitializationData;

use crate::adapter::{ObjectAdapter, ObjectAdapterFactory, Servant, ServantFactoryManager};
use crate::config::{DefaultsAndOverrides, Properties, TraceLevels};
use crate::connection::{ConnectionMonitor, OutgoingConnectionFactory};
use crate::core::{Identity, ImplicitContext, ThreadNotification, ThreadOptions};
use crate::error::{Error, Result};
use crate::location::{LocatorManager, RouterManager};
use crate::logging::Logger;
use crate::plugin::PluginManager;
use crate::proxy::{ProxyFactory, ReferenceFactory};
use crate::rt::{AsyncIoThread, RetryQueue, ThreadPool, Timer};
use crate::transport::{EndpointFactoryManager, EndpointHostResolver, ProtocolSupport};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Runtime lifecycle. Transitions are forward-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Lifecycle {
    Active,
    DestroyInProgress,
    Destroyed,
}

/// Subsystem handle: not yet created, live, or released by destroy.
pub(crate) enum Slot<T: ?Sized> {
    Unset,
    Ready(Arc<T>),
    Released,
}

impl<T: ?Sized> Default for Slot<T> {
    fn default() -> Self {
        Slot::Unset
    }
}

impl<T: ?Sized> Slot<T> {
    fn get(&self, what: &'static str) -> Result<Arc<T>> {
        match self {
            Slot::Ready(handle) => Ok(Arc::clone(handle)),
            Slot::Unset => Err(Error::NotInitialized(what)),
            Slot::Released => Err(Error::CommunicatorDestroyed),
        }
    }

    fn ready(&self) -> Option<Arc<T>> {
        match self {
            Slot::Ready(handle) => Some(Arc::clone(handle)),
            _ => None,
        }
    }

    /// Release the handle; the slot stays `Released` for good.
    fn take(&mut self) -> Option<Arc<T>> {
        match std::mem::replace(self, Slot::Released) {
            Slot::Ready(handle) => Some(handle),
            _ => None,
        }
    }
}

/// Admin adapter and the facets waiting for it.
#[derive(Default)]
pub(crate) struct AdminState {
    adapter: Option<Arc<ObjectAdapter>>,
    identity: Option<Identity>,
    facets: BTreeMap<String, Arc<dyn Servant>>,
    facet_filter: HashSet<String>,
}

impl AdminState {
    /// A facet is excluded when a filter is set and does not name it.
    fn is_excluded(&self, facet: &str) -> bool {
        !self.facet_filter.is_empty() && !self.facet_filter.contains(facet)
    }
}

pub(crate) struct State {
    lifecycle: Lifecycle,
    router_manager: Slot<RouterManager>,
    locator_manager: Slot<LocatorManager>,
    reference_factory: Slot<ReferenceFactory>,
    proxy_factory: Slot<ProxyFactory>,
    outgoing_connection_factory: Slot<OutgoingConnectionFactory>,
    connection_monitor: Slot<ConnectionMonitor>,
    servant_factory_manager: Slot<ServantFactoryManager>,
    object_adapter_factory: Slot<ObjectAdapterFactory>,
    client_thread_pool: Slot<ThreadPool>,
    server_thread_pool: Slot<ThreadPool>,
    async_io_thread: Slot<AsyncIoThread>,
    endpoint_host_resolver: Slot<EndpointHostResolver>,
    timer: Slot<Timer>,
    retry_queue: Slot<RetryQueue>,
    endpoint_factory_manager: Slot<EndpointFactoryManager>,
    plugin_manager: Slot<PluginManager>,
    admin: AdminState,
}

impl Default for State {
    fn default() -> Self {
        Self {
            lifecycle: Lifecycle::Active,
            router_manager: Slot::Unset,
            locator_manager: Slot::Unset,
            reference_factory: Slot::Unset,
            proxy_factory: Slot::Unset,
            outgoing_connection_factory: Slot::Unset,
            connection_monitor: Slot::Unset,
            servant_factory_manager: Slot::Unset,
            object_adapter_factory: Slot::Unset,
            client_thread_pool: Slot::Unset,
            server_thread_pool: Slot::Unset,
            async_io_thread: Slot::Unset,
            endpoint_host_resolver: Slot::Unset,
            timer: Slot::Unset,
            retry_queue: Slot::Unset,
            endpoint_factory_manager: Slot::Unset,
            plugin_manager: Slot::Unset,
            admin: AdminState::default(),
        }
    }
}

/// Per-communicator runtime core.
pub struct Runtime {
    self_ref: Weak<Runtime>,

    // Configuration snapshot, immutable after construction.
    properties: Arc<Properties>,
    logger: Arc<dyn Logger>,
    thread_options: ThreadOptions,
    trace_levels: TraceLevels,
    defaults: DefaultsAndOverrides,
    message_size_max: usize,
    client_acm: i32,
    server_acm: i32,
    protocol_support: ProtocolSupport,
    implicit_context: Option<Arc<ImplicitContext>>,

    state: Mutex<State>,
    // Serializes admin adapter creation; taken before `state`.
    admin_creation: Mutex<()>,
}

impl Runtime {
    // ========================================================================
    // Configuration snapshot (no locking, valid after destroy)
    // ========================================================================

    pub fn properties(&self) -> &Arc<Properties> {
        &self.properties
    }

    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    pub fn thread_hook(&self) -> Option<&Arc<dyn ThreadNotification>> {
        self.thread_options.hook.as_ref()
    }

    /// Options every runtime-owned thread is spawned with.
    pub fn thread_options(&self) -> &ThreadOptions {
        &self.thread_options
    }

    pub fn trace_levels(&self) -> &TraceLevels {
        &self.trace_levels
    }

    pub fn defaults_and_overrides(&self) -> &DefaultsAndOverrides {
        &self.defaults
    }

    /// Maximum message size in bytes (`Orb.MessageSizeMax` is in KB).
    pub fn message_size_max(&self) -> usize {
        self.message_size_max
    }

    /// Client idle timeout in seconds; 0 disables it.
    pub fn client_acm(&self) -> i32 {
        self.client_acm
    }

    /// Server idle timeout in seconds; 0 disables it.
    pub fn server_acm(&self) -> i32 {
        self.server_acm
    }

    pub fn protocol_support(&self) -> ProtocolSupport {
        self.protocol_support
    }

    pub fn implicit_context(&self) -> Option<&Arc<ImplicitContext>> {
        self.implicit_context.as_ref()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub fn lifecycle(&self) -> Lifecycle {
        self.state.lock().lifecycle
    }

    pub fn is_destroyed(&self) -> bool {
        self.lifecycle() == Lifecycle::Destroyed
    }

    // ========================================================================
    // Subsystem accessors
    // ========================================================================

    fn handle<T: ?Sized>(
        &self,
        what: &'static str,
        slot: fn(&State) -> &Slot<T>,
    ) -> Result<Arc<T>> {
        let state = self.state.lock();
        if state.lifecycle == Lifecycle::Destroyed {
            return Err(Error::CommunicatorDestroyed);
        }
        slot(&*state).get(what)
    }

    pub fn router_manager(&self) -> Result<Arc<RouterManager>> {
        self.handle("router manager", |s| &s.router_manager)
    }

    pub fn locator_manager(&self) -> Result<Arc<LocatorManager>> {
        self.handle("locator manager", |s| &s.locator_manager)
    }

    pub fn reference_factory(&self) -> Result<Arc<ReferenceFactory>> {
        self.handle("reference factory", |s| &s.reference_factory)
    }

    pub fn proxy_factory(&self) -> Result<Arc<ProxyFactory>> {
        self.handle("proxy factory", |s| &s.proxy_factory)
    }

    pub fn outgoing_connection_factory(&self) -> Result<Arc<OutgoingConnectionFactory>> {
        self.handle("outgoing connection factory", |s| {
            &s.outgoing_connection_factory
        })
    }

    pub fn connection_monitor(&self) -> Result<Arc<ConnectionMonitor>> {
        self.handle("connection monitor", |s| &s.connection_monitor)
    }

    pub fn servant_factory_manager(&self) -> Result<Arc<ServantFactoryManager>> {
        self.handle("servant factory manager", |s| &s.servant_factory_manager)
    }

    pub fn object_adapter_factory(&self) -> Result<Arc<ObjectAdapterFactory>> {
        self.handle("object adapter factory", |s| &s.object_adapter_factory)
    }

    pub fn client_thread_pool(&self) -> Result<Arc<ThreadPool>> {
        self.handle("client thread pool", |s| &s.client_thread_pool)
    }

    pub fn endpoint_host_resolver(&self) -> Result<Arc<EndpointHostResolver>> {
        self.handle("endpoint host resolver", |s| &s.endpoint_host_resolver)
    }

    pub fn timer(&self) -> Result<Arc<Timer>> {
        self.handle("timer", |s| &s.timer)
    }

    pub fn retry_queue(&self) -> Result<Arc<RetryQueue>> {
        self.handle("retry queue", |s| &s.retry_queue)
    }

    pub fn endpoint_factory_manager(&self) -> Result<Arc<EndpointFactoryManager>> {
        self.handle("endpoint factory manager", |s| &s.endpoint_factory_manager)
    }

    pub fn plugin_manager(&self) -> Result<Arc<PluginManager>> {
        self.handle("plugin manager", |s| &s.plugin_manager)
    }

    /// Server thread pool, created on first use.
    ///
    /// With `Orb.ServerIdleTime > 0` the pool shuts every adapter down once
    /// it has been idle that many seconds.
    pub fn server_thread_pool(&self) -> Result<Arc<ThreadPool>> {
        let mut state = self.state.lock();
        if state.lifecycle == Lifecycle::Destroyed {
            return Err(Error::CommunicatorDestroyed);
        }
        match state.server_thread_pool {
            Slot::Ready(ref pool) => return Ok(Arc::clone(pool)),
            Slot::Released => return Err(Error::CommunicatorDestroyed),
            Slot::Unset => {}
        }

        let idle_secs = self.properties.get_as_int("Orb.ServerIdleTime");
        let idle = if idle_secs > 0 {
            let runtime = self.self_ref.clone();
            let on_idle: crate::rt::IdleCallback = Arc::new(move || {
                if let Some(factory) = runtime
                    .upgrade()
                    .and_then(|rt| rt.object_adapter_factory().ok())
                {
                    factory.shutdown();
                }
            });
            Some((Duration::from_secs(idle_secs as u64), on_idle))
        } else {
            None
        };

        let pool = Arc::new(ThreadPool::new(
            "Orb.ThreadPool.Server",
            &self.properties,
            &self.thread_options,
            &self.logger,
            &self.trace_levels,
            idle,
        )?);
        state.server_thread_pool = Slot::Ready(Arc::clone(&pool));
        Ok(pool)
    }

    /// Async I/O thread, started on first use.
    pub fn async_io_thread(&self) -> Result<Arc<AsyncIoThread>> {
        let mut state = self.state.lock();
        if state.lifecycle == Lifecycle::Destroyed {
            return Err(Error::CommunicatorDestroyed);
        }
        match state.async_io_thread {
            Slot::Ready(ref io) => return Ok(Arc::clone(io)),
            Slot::Released => return Err(Error::CommunicatorDestroyed),
            Slot::Unset => {}
        }
        let io = Arc::new(AsyncIoThread::start(&self.thread_options)?);
        state.async_io_thread = Slot::Ready(Arc::clone(&io));
        Ok(io)
    }

    /// Store a handle created outside the lock. Once destroy has started
    /// nothing is stored and `release` tears the handle down, after the
    /// lock is dropped.
    fn install<T: ?Sized>(
        &self,
        slot: fn(&mut State) -> &mut Slot<T>,
        handle: &Arc<T>,
        release: impl FnOnce(&T),
    ) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.lifecycle == Lifecycle::Active {
                *slot(&mut *state) = Slot::Ready(Arc::clone(handle));
                return Ok(());
            }
        }
        release(handle);
        Err(Error::CommunicatorDestroyed)
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("lifecycle", &self.lifecycle())
            .field("message_size_max", &self.message_size_max)
            .field("client_acm", &self.client_acm)
            .field("server_acm", &self.server_acm)
            .field("protocol_support", &self.protocol_support)
            .finish()
    }
}

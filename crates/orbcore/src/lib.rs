// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # orbcore - runtime core of an object-oriented RPC middleware
//!
//! One [`Runtime`] exists per [`Communicator`]. It owns every subsystem a
//! distributed-object runtime needs and decides, under a single lock, whether
//! the runtime is still usable: concurrent callers, background threads and
//! the multi-phase shutdown all agree on that answer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use orbcore::{Communicator, InitializationData, Result};
//!
//! fn main() -> Result<()> {
//!     let mut args: Vec<String> = std::env::args().collect();
//!     let init = InitializationData::default();
//!     let communicator = Communicator::initialize_with_args(&mut args, init)?;
//!
//!     let adapter =
//!         communicator.create_object_adapter_with_endpoints("Hello", "tcp -h 127.0.0.1 -p 0")?;
//!     adapter.activate()?;
//!
//!     let proxy = communicator.string_to_proxy("hello:tcp -h 127.0.0.1 -p 10000")?;
//!     println!("{}", communicator.proxy_to_string(proxy.as_ref())?);
//!
//!     communicator.shutdown()?;
//!     communicator.destroy();
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                      Communicator / Runtime                         |
//! |   config snapshot | lifecycle | admin facets | plugin manager       |
//! +---------------------------------------------------------------------+
//! |                    Identity & proxy layer                           |
//! |   ReferenceFactory | ProxyFactory | LocatorManager | RouterManager  |
//! +---------------------------------------------------------------------+
//! |                       Object hosting                                |
//! |   ObjectAdapterFactory | ObjectAdapter | ServantFactoryManager      |
//! +---------------------------------------------------------------------+
//! |                         Transport                                   |
//! |   EndpointFactoryManager (tcp, udp) | OutgoingConnectionFactory     |
//! |   ConnectionMonitor | EndpointHostResolver                          |
//! +---------------------------------------------------------------------+
//! |                         Execution                                   |
//! |   ThreadPool (client, server) | AsyncIoThread | Timer | RetryQueue  |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Communicator`] | Application handle; dropping it destroys the runtime |
//! | [`Runtime`] | Subsystem owner, lifecycle state machine |
//! | [`Properties`] | Configuration (`Orb.*` keys, command line, config files) |
//! | [`ObjectAdapter`] | Servants bound to listening endpoints |
//! | [`ObjectPrx`] | Stringifiable reference to a remote object |
//!
//! ## Modules Overview
//!
//! - [`runtime`] - lifecycle, accessors, admin object (start here)
//! - [`config`] - properties, trace levels, defaults and overrides
//! - [`transport`] - endpoints, endpoint factories, host resolution
//! - [`connection`] - outgoing connections and idle monitoring
//! - [`proxy`] - references and proxies
//! - [`adapter`] - object adapters and servants
//! - [`rt`] - thread pools, timer, retry queue

// Clippy: No blanket suppressions. Fix issues properly or use inline #[allow] with justification.

/// Object adapters, servants and servant factories.
pub mod adapter;
/// Built-in admin facets (`Properties`, `Process`).
pub mod admin;
/// Application entry point.
pub mod communicator;
/// Properties, trace levels, defaults and overrides.
pub mod config;
/// Outgoing connections, connection factory and ACM monitor.
pub mod connection;
/// Identities, implicit context and runtime thread spawning.
pub mod core;
/// Error type and result alias.
pub mod error;
/// Locators and routers.
pub mod location;
/// Runtime logger trait and backends.
pub mod logging;
/// Plugins and the plugin manager.
pub mod plugin;
/// References, proxies and their factories.
pub mod proxy;
/// Worker threads: thread pools, async I/O thread, timer, retry queue.
pub mod rt;
/// The per-communicator runtime core.
pub mod runtime;
/// Endpoints, endpoint factories and host resolution.
pub mod transport;

pub use adapter::{ObjectAdapter, Servant, ServantFactory};
pub use communicator::Communicator;
pub use config::Properties;
pub use crate::core::{Identity, ImplicitContext, ThreadNotification};
pub use error::{Error, Result};
pub use location::{Locator, LocatorRegistry, RegistryError};
pub use logging::Logger;
pub use plugin::{register_plugin_factory, Plugin, PluginFactory, PluginManager};
pub use proxy::ObjectPrx;
pub use runtime::{InitializationData, Lifecycle, Runtime};

/// orbcore version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

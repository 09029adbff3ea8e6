// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests panic on failure
#![allow(clippy::too_many_lines)] // Scenario tests

//! Runtime lifecycle integration tests
//!
//! Drives a communicator through setup, serving, shutdown and destroy and
//! checks that every subsystem accessor follows the lifecycle.

use orbcore::transport::ProtocolSupport;
use orbcore::{
    Communicator, Error, Identity, InitializationData, Lifecycle, Properties, Runtime, Servant,
};
use std::any::Any;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

struct Hello;

impl Servant for Hello {
    fn interface_id(&self) -> &str {
        "::Demo::Hello"
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

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

fn assert_destroyed<T>(what: &str, result: orbcore::Result<T>) {
    match result {
        Err(Error::CommunicatorDestroyed) => {}
        Err(e) => panic!("{}: expected CommunicatorDestroyed, got {:?}", what, e),
        Ok(_) => panic!("{}: expected CommunicatorDestroyed, got a handle", what),
    }
}

#[test]
fn test_serve_shutdown_destroy() {
    let communicator = Communicator::initialize(init(&[])).expect("initialize");
    assert_eq!(communicator.runtime().lifecycle(), Lifecycle::Active);

    let adapter = communicator
        .create_object_adapter_with_endpoints("Hello", "tcp -h 127.0.0.1 -p 0")
        .expect("adapter");
    let proxy = adapter
        .add(Arc::new(Hello), Identity::new("", "hello"))
        .expect("add servant");
    adapter.activate().expect("activate");

    let published = adapter.published_endpoints();
    assert_eq!(published.len(), 1);
    assert_ne!(published[0].port(), 0);

    let stringified = communicator.proxy_to_string(Some(&proxy)).expect("stringify");
    let parsed = communicator
        .string_to_proxy(&stringified)
        .expect("parse")
        .expect("non-null proxy");
    assert_eq!(parsed.identity(), &Identity::new("", "hello"));

    assert!(!communicator.is_shutdown());
    communicator.shutdown().expect("shutdown");
    communicator.wait_for_shutdown().expect("wait");
    assert!(communicator.is_shutdown());
    assert!(adapter.is_deactivated());
    assert!(matches!(
        communicator.create_object_adapter("Late"),
        Err(Error::CommunicatorDestroyed)
    ));

    communicator.destroy();
    assert!(communicator.runtime().is_destroyed());
    assert_destroyed("string_to_proxy", communicator.string_to_proxy("hello:tcp -p 1"));
}

#[test]
fn test_every_accessor_rejects_after_destroy() {
    let communicator = Communicator::initialize(init(&[("Orb.MessageSizeMax", "64")]))
        .expect("initialize");
    let runtime: Arc<Runtime> = Arc::clone(communicator.runtime());

    // warm the lazy handles so both paths are covered
    runtime.server_thread_pool().expect("server pool");
    runtime.async_io_thread().expect("async io");

    assert!(runtime.destroy());
    assert!(!runtime.destroy());
    assert_eq!(runtime.lifecycle(), Lifecycle::Destroyed);

    assert_destroyed("router_manager", runtime.router_manager());
    assert_destroyed("locator_manager", runtime.locator_manager());
    assert_destroyed("reference_factory", runtime.reference_factory());
    assert_destroyed("proxy_factory", runtime.proxy_factory());
    assert_destroyed("outgoing_connection_factory", runtime.outgoing_connection_factory());
    assert_destroyed("connection_monitor", runtime.connection_monitor());
    assert_destroyed("servant_factory_manager", runtime.servant_factory_manager());
    assert_destroyed("object_adapter_factory", runtime.object_adapter_factory());
    assert_destroyed("client_thread_pool", runtime.client_thread_pool());
    assert_destroyed("server_thread_pool", runtime.server_thread_pool());
    assert_destroyed("endpoint_host_resolver", runtime.endpoint_host_resolver());
    assert_destroyed("timer", runtime.timer());
    assert_destroyed("retry_queue", runtime.retry_queue());
    assert_destroyed("endpoint_factory_manager", runtime.endpoint_factory_manager());
    assert_destroyed("plugin_manager", runtime.plugin_manager());
    assert_destroyed("async_io_thread", runtime.async_io_thread());
    assert_destroyed("get_admin", runtime.get_admin());
    assert_destroyed("set_default_locator", runtime.set_default_locator(None));
    assert_destroyed("flush_batch_requests", runtime.flush_batch_requests());

    // the configuration snapshot outlives the subsystems
    assert_eq!(runtime.message_size_max(), 64 * 1024);
    assert_eq!(runtime.properties().get("Orb.MessageSizeMax").as_deref(), Some("64"));
}

#[test]
fn test_lazy_server_pool_is_shared() {
    let communicator = Communicator::initialize(init(&[("Orb.ThreadPool.Server.Size", "3")]))
        .expect("initialize");
    let runtime = communicator.runtime();
    let first = runtime.server_thread_pool().expect("pool");
    let second = runtime.server_thread_pool().expect("pool");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.size(), 3);

    let first = runtime.async_io_thread().expect("io");
    let second = runtime.async_io_thread().expect("io");
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_protocol_support_derivation() {
    let communicator = Communicator::initialize(init(&[("Orb.IPv6", "1")])).expect("dual");
    assert_eq!(communicator.runtime().protocol_support(), ProtocolSupport::Both);
    drop(communicator);

    let communicator =
        Communicator::initialize(init(&[("Orb.IPv4", "0"), ("Orb.IPv6", "1")])).expect("v6");
    assert_eq!(communicator.runtime().protocol_support(), ProtocolSupport::Ipv6);
    drop(communicator);

    let err = Communicator::initialize(init(&[("Orb.IPv4", "0"), ("Orb.IPv6", "0")]))
        .expect_err("no protocol left");
    assert!(matches!(err, Error::Initialization(_)));
}

#[test]
fn test_failed_setup_leaves_no_runtime() {
    let err = Communicator::initialize(init(&[("Orb.Default.Locator", "Locator:bogus -p 1")]))
        .expect_err("unknown transport");
    assert!(matches!(err, Error::EndpointParse(_) | Error::ProxyParse(_)));
}

#[test]
fn test_server_idle_time_shuts_down() {
    let communicator = Communicator::initialize(init(&[("Orb.ServerIdleTime", "1")]))
        .expect("initialize");
    let adapter = communicator
        .create_object_adapter_with_endpoints("Idle", "tcp -h 127.0.0.1 -p 0")
        .expect("adapter");
    adapter.activate().expect("activate");

    let deadline = Instant::now() + Duration::from_secs(10);
    while !communicator.is_shutdown() {
        assert!(Instant::now() < deadline, "server never went idle");
        thread::sleep(Duration::from_millis(50));
    }
    communicator.wait_for_shutdown().expect("wait");
    assert!(adapter.is_deactivated());
}

#[test]
fn test_destroy_while_requests_in_flight() {
    let communicator = Communicator::initialize(init(&[])).expect("initialize");
    let runtime = Arc::clone(communicator.runtime());

    let pool = runtime.client_thread_pool().expect("pool");
    let (tx, rx) = crossbeam::channel::bounded::<()>(1);
    pool.execute(move || {
        thread::sleep(Duration::from_millis(100));
        let _ = tx.send(());
    })
    .expect("queue job");

    let destroyer = {
        let runtime = Arc::clone(&runtime);
        thread::spawn(move || runtime.destroy())
    };
    // queued work still completes during teardown
    rx.recv_timeout(Duration::from_secs(5)).expect("job ran");
    assert!(destroyer.join().expect("join"));
    assert!(runtime.is_destroyed());
    assert!(pool.execute(|| {}).is_err());
}

#[test]
fn test_accessors_serve_while_destroy_in_progress() {
    let communicator = Communicator::initialize(init(&[])).expect("initialize");
    let runtime = Arc::clone(communicator.runtime());

    // a pooled connection makes destroy wait on the async I/O thread
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    let endpoint = runtime
        .endpoint_factory_manager()
        .expect("endpoint factories")
        .create(&format!("tcp -h 127.0.0.1 -p {}", port), false)
        .expect("endpoint");
    runtime
        .outgoing_connection_factory()
        .expect("connection factory")
        .create(&[endpoint])
        .expect("connect");

    let (release_tx, release_rx) = crossbeam::channel::bounded::<()>(1);
    runtime
        .async_io_thread()
        .expect("async io")
        .queue(move || {
            let _ = release_rx.recv_timeout(Duration::from_secs(10));
        })
        .expect("queue blocking job");

    let destroyer = {
        let runtime = Arc::clone(&runtime);
        thread::spawn(move || runtime.destroy())
    };

    let deadline = Instant::now() + Duration::from_secs(5);
    while runtime.lifecycle() != Lifecycle::DestroyInProgress {
        assert!(Instant::now() < deadline, "destroy never started");
        thread::sleep(Duration::from_millis(10));
    }
    assert!(runtime.timer().is_ok());
    assert!(runtime.outgoing_connection_factory().is_ok());
    assert!(runtime.client_thread_pool().is_ok());
    assert!(!runtime.destroy());
    assert_eq!(runtime.lifecycle(), Lifecycle::DestroyInProgress);

    release_tx.send(()).expect("release");
    assert!(destroyer.join().expect("join"));
    assert_eq!(runtime.lifecycle(), Lifecycle::Destroyed);
    assert_destroyed("timer", runtime.timer());
    assert_destroyed("outgoing_connection_factory", runtime.outgoing_connection_factory());
    drop(listener);
}

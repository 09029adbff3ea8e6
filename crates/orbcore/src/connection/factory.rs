// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Outgoing connection factory: one pooled connection per endpoint.
//!
//! `destroy()` hands every open connection to the async I/O thread for
//! closing; `wait_until_finished()` blocks until all of them are closed.

use super::Connection;
use crate::config::TraceLevels;
use crate::error::{Error, Result};
use crate::runtime::Runtime;
use crate::transport::Endpoint;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

#[derive(Default)]
struct State {
    destroyed: bool,
    connections: HashMap<String, Arc<Connection>>,
    closing: usize,
}

/// Creates and pools outgoing connections.
pub struct OutgoingConnectionFactory {
    runtime: Weak<Runtime>,
    state: Mutex<State>,
    finished: Condvar,
}

impl OutgoingConnectionFactory {
    pub fn new(runtime: Weak<Runtime>) -> Self {
        Self {
            runtime,
            state: Mutex::new(State::default()),
            finished: Condvar::new(),
        }
    }

    fn runtime(&self) -> Result<Arc<Runtime>> {
        self.runtime.upgrade().ok_or(Error::CommunicatorDestroyed)
    }

    /// Connection to the first reachable endpoint, reusing a pooled one.
    pub fn create(&self, endpoints: &[Arc<dyn Endpoint>]) -> Result<Arc<Connection>> {
        let runtime = self.runtime()?;
        let overrides = runtime.defaults_and_overrides();
        let endpoints: Vec<Arc<dyn Endpoint>> = endpoints
            .iter()
            .map(|ep| {
                match overrides
                    .override_connect_timeout
                    .or(overrides.override_timeout)
                {
                    Some(timeout) => ep.with_timeout(Some(timeout)),
                    None => Arc::clone(ep),
                }
            })
            .collect();
        if endpoints.is_empty() {
            return Err(Error::Connection("no endpoints to connect to".into()));
        }

        {
            let state = self.state.lock();
            if state.destroyed {
                return Err(Error::CommunicatorDestroyed);
            }
            for ep in &endpoints {
                if let Some(conn) = state.connections.get(&ep.to_string()) {
                    if conn.is_active() {
                        return Ok(Arc::clone(conn));
                    }
                }
            }
        }

        let resolver = runtime.endpoint_host_resolver()?;
        let traces = runtime.trace_levels();
        let logger = runtime.logger();
        let acm = match runtime.client_acm() {
            secs if secs > 0 => Some(Duration::from_secs(secs as u64)),
            _ => None,
        };

        let mut last_error = None;
        for ep in &endpoints {
            let addrs = match resolver.resolve(ep.host(), ep.port(), false) {
                Ok(addrs) => addrs,
                Err(e) if e.is_destroyed() => return Err(e),
                Err(e) => {
                    last_error = Some(e);
                    continue;
                }
            };
            for addr in addrs {
                if traces.network >= 2 {
                    logger.trace(
                        TraceLevels::NETWORK_CAT,
                        &format!("trying to establish {} connection to {}", ep.protocol(), addr),
                    );
                }
                match ep.connect(addr) {
                    Ok(transceiver) => {
                        let conn = Arc::new(Connection::new(
                            Arc::clone(ep),
                            addr,
                            transceiver,
                            acm,
                            Arc::clone(logger),
                            traces,
                        ));
                        if traces.network >= 1 {
                            logger.trace(
                                TraceLevels::NETWORK_CAT,
                                &format!("established {} connection to {}", ep.protocol(), addr),
                            );
                        }
                        return self.register(ep, conn);
                    }
                    Err(e) => {
                        last_error = Some(Error::Connection(format!(
                            "connect to {} failed: {}",
                            addr, e
                        )))
                    }
                }
            }
        }
        Err(last_error.unwrap_or_else(|| Error::Connection("no address to connect to".into())))
    }

    fn register(&self, ep: &Arc<dyn Endpoint>, conn: Arc<Connection>) -> Result<Arc<Connection>> {
        let mut state = self.state.lock();
        if state.destroyed {
            drop(state);
            conn.close();
            return Err(Error::CommunicatorDestroyed);
        }
        let key = ep.to_string();
        if let Some(existing) = state.connections.get(&key) {
            if existing.is_active() {
                let existing = Arc::clone(existing);
                drop(state);
                conn.close();
                return Ok(existing);
            }
        }
        state.connections.insert(key, Arc::clone(&conn));
        Ok(conn)
    }

    /// Like [`create`](Self::create) but runs on the client thread pool.
    pub fn create_async<F>(
        self: &Arc<Self>,
        endpoints: Vec<Arc<dyn Endpoint>>,
        callback: F,
    ) -> Result<()>
    where
        F: FnOnce(Result<Arc<Connection>>) + Send + 'static,
    {
        let pool = self.runtime()?.client_thread_pool()?;
        let factory = Arc::clone(self);
        pool.execute(move || callback(factory.create(&endpoints)))
    }

    /// Open pooled connections; closed ones are pruned.
    pub fn connections(&self) -> Vec<Arc<Connection>> {
        let mut state = self.state.lock();
        state.connections.retain(|_, conn| conn.is_active());
        state.connections.values().cloned().collect()
    }

    /// Flush batch requests on every pooled connection.
    pub fn flush_batch_requests(&self) {
        for conn in self.connections() {
            conn.flush_batch_requests();
        }
    }

    /// Close every connection asynchronously and refuse new ones.
    pub fn destroy(self: &Arc<Self>) {
        let connections: Vec<Arc<Connection>> = {
            let mut state = self.state.lock();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            let connections: Vec<_> = state.connections.drain().map(|(_, c)| c).collect();
            state.closing = connections.len();
            connections
        };
        log::debug!(
            "[connection-factory] destroying, {} connection(s) to close",
            connections.len()
        );

        let io = if connections.is_empty() {
            None
        } else {
            self.runtime().and_then(|rt| rt.async_io_thread()).ok()
        };
        for conn in connections {
            let queued = match io {
                Some(ref io) => {
                    let (c, factory) = (Arc::clone(&conn), Arc::clone(self));
                    io.queue(move || {
                        c.close();
                        factory.connection_finished();
                    })
                    .is_ok()
                }
                None => false,
            };
            if !queued {
                conn.close();
                self.connection_finished();
            }
        }
        if self.state.lock().closing == 0 {
            self.finished.notify_all();
        }
    }

    fn connection_finished(&self) {
        let mut state = self.state.lock();
        state.closing = state.closing.saturating_sub(1);
        if state.closing == 0 {
            self.finished.notify_all();
        }
    }

    /// Block until destroyed and every connection is closed.
    pub fn wait_until_finished(&self) {
        let mut state = self.state.lock();
        while !state.destroyed || state.closing > 0 {
            self.finished.wait(&mut state);
        }
    }
}

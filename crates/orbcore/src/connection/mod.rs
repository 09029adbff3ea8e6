// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Outgoing connections, their pooling factory and the ACM monitor.
//!
//! A [`Connection`] wraps an established [`Transceiver`]. It counts
//! in-flight requests and tracks the last activity so the
//! [`ConnectionMonitor`] can close it after the ACM idle timeout.
//!
//! ```text
//! Active --close()--> Closed
//!    \--monitor(): idle >= ACM && no request in flight--/
//! ```

mod factory;
mod monitor;

pub use factory::OutgoingConnectionFactory;
pub use monitor::ConnectionMonitor;

use crate::config::TraceLevels;
use crate::error::{Error, Result};
use crate::logging::Logger;
use crate::transport::{Endpoint, Transceiver};
use parking_lot::Mutex;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Active,
    Closed,
}

struct Inner {
    state: ConnectionState,
    transceiver: Option<Box<dyn Transceiver>>,
    last_activity: Instant,
}

/// Established outgoing connection.
pub struct Connection {
    endpoint: Arc<dyn Endpoint>,
    peer: SocketAddr,
    acm_timeout: Option<Duration>,
    inner: Mutex<Inner>,
    in_flight: AtomicUsize,
    batch_requests: AtomicUsize,
    logger: Arc<dyn Logger>,
    trace_level: i32,
}

impl Connection {
    pub(crate) fn new(
        endpoint: Arc<dyn Endpoint>,
        peer: SocketAddr,
        transceiver: Box<dyn Transceiver>,
        acm_timeout: Option<Duration>,
        logger: Arc<dyn Logger>,
        traces: &TraceLevels,
    ) -> Self {
        Self {
            endpoint,
            peer,
            acm_timeout,
            inner: Mutex::new(Inner {
                state: ConnectionState::Active,
                transceiver: Some(transceiver),
                last_activity: Instant::now(),
            }),
            in_flight: AtomicUsize::new(0),
            batch_requests: AtomicUsize::new(0),
            logger,
            trace_level: traces.network,
        }
    }

    pub fn endpoint(&self) -> &Arc<dyn Endpoint> {
        &self.endpoint
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    pub fn is_active(&self) -> bool {
        self.state() == ConnectionState::Active
    }

    /// Mark a request in flight. The connection stays open while the guard lives.
    pub fn begin_request(self: &Arc<Self>) -> Result<RequestGuard> {
        let mut inner = self.inner.lock();
        if inner.state != ConnectionState::Active {
            return Err(Error::Connection(format!("connection to {} is closed", self.peer)));
        }
        inner.last_activity = Instant::now();
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        Ok(RequestGuard {
            connection: Arc::clone(self),
        })
    }

    /// Requests currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Queue a batch request on this connection.
    pub fn queue_batch_request(&self) -> Result<()> {
        if !self.is_active() {
            return Err(Error::Connection(format!("connection to {} is closed", self.peer)));
        }
        self.batch_requests.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Send queued batch requests. Returns how many were flushed.
    pub fn flush_batch_requests(&self) -> usize {
        let flushed = self.batch_requests.swap(0, Ordering::AcqRel);
        if flushed > 0 {
            self.inner.lock().last_activity = Instant::now();
        }
        flushed
    }

    /// Close if idle for at least the ACM timeout. Returns true if closed.
    pub fn monitor(&self, now: Instant) -> bool {
        let Some(acm) = self.acm_timeout else {
            return false;
        };
        let idle = {
            let inner = self.inner.lock();
            inner.state == ConnectionState::Active
                && self.in_flight() == 0
                && self.batch_requests.load(Ordering::Acquire) == 0
                && now.saturating_duration_since(inner.last_activity) >= acm
        };
        if idle {
            self.close_with_reason("connection idle");
        }
        idle
    }

    /// Close the transport. Idempotent.
    pub fn close(&self) {
        self.close_with_reason("connection closed");
    }

    fn close_with_reason(&self, reason: &str) {
        let transceiver = {
            let mut inner = self.inner.lock();
            if inner.state == ConnectionState::Closed {
                return;
            }
            inner.state = ConnectionState::Closed;
            inner.transceiver.take()
        };

        if let Some(mut transceiver) = transceiver {
            if self.trace_level >= 1 {
                self.logger.trace(
                    TraceLevels::NETWORK_CAT,
                    &format!(
                        "closing {} connection ({})\n{}",
                        self.endpoint.protocol(),
                        reason,
                        transceiver.description()
                    ),
                );
            }
            if let Err(e) = transceiver.close() {
                log::debug!("[connection] close to {} failed: {}", self.peer, e);
            }
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint.to_string())
            .field("peer", &self.peer)
            .field("state", &self.state())
            .finish()
    }
}

/// Keeps a request counted as in flight until dropped.
pub struct RequestGuard {
    connection: Arc<Connection>,
}

impl RequestGuard {
    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.connection.in_flight.fetch_sub(1, Ordering::AcqRel);
        self.connection.inner.lock().last_activity = Instant::now();
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Endpoint host resolver thread.
//!
//! Name lookups block, so they run on a dedicated thread fed through a
//! crossbeam channel. Literal addresses and missing hosts are answered inline.
//! Successful lookups are kept in a small LRU cache for [`CACHE_TTL`].
//!
//! ```text
//! resolve_async(host, port, cb) --> [channel] --> resolver thread
//!                                                   | ToSocketAddrs
//!                                                   | filter by ProtocolSupport
//!                                                   v
//!                                                 cb(Result<Vec<SocketAddr>>)
//! ```
//!
//! `destroy()` closes the channel; requests still queued are failed with
//! [`Error::CommunicatorDestroyed`]. `join_with_thread()` waits for the thread.

use super::ProtocolSupport;
use crate::config::TraceLevels;
use crate::core::thread::{self, ThreadOptions};
use crate::error::{Error, Result};
use crate::logging::Logger;
use crossbeam::channel::{self, Sender};
use lru::LruCache;
use parking_lot::Mutex;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// How long a resolved host stays cached.
pub const CACHE_TTL: Duration = Duration::from_secs(30);

const CACHE_CAPACITY: usize = 64;

type ResolveCallback = Box<dyn FnOnce(Result<Vec<SocketAddr>>) + Send>;
type Cache = Mutex<LruCache<(String, u16), (Instant, Vec<SocketAddr>)>>;

struct Request {
    host: String,
    port: u16,
    callback: ResolveCallback,
}

struct Shared {
    protocol_support: ProtocolSupport,
    cache: Cache,
    destroyed: AtomicBool,
    logger: Arc<dyn Logger>,
    trace_level: i32,
}

/// Background host-name resolver owned by the runtime.
pub struct EndpointHostResolver {
    shared: Arc<Shared>,
    sender: Mutex<Option<Sender<Request>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl EndpointHostResolver {
    /// Start the resolver thread.
    pub fn start(
        protocol_support: ProtocolSupport,
        logger: Arc<dyn Logger>,
        traces: &TraceLevels,
        options: &ThreadOptions,
    ) -> Result<Self> {
        let shared = Arc::new(Shared {
            protocol_support,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            )),
            destroyed: AtomicBool::new(false),
            logger,
            trace_level: traces.network,
        });

        let (sender, receiver) = channel::unbounded::<Request>();
        let worker = Arc::clone(&shared);
        let handle = thread::spawn("orb-host-resolver", options, move || {
            for request in receiver.iter() {
                let result = if worker.destroyed.load(Ordering::Acquire) {
                    Err(Error::CommunicatorDestroyed)
                } else {
                    worker.lookup(&request.host, request.port)
                };
                (request.callback)(result);
            }
            log::debug!("[host-resolver] thread exiting");
        })?;

        Ok(Self {
            shared,
            sender: Mutex::new(Some(sender)),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Queue a lookup; `callback` runs on the resolver thread (or inline for
    /// literal addresses).
    pub fn resolve_async<F>(&self, host: Option<&str>, port: u16, server: bool, callback: F)
    where
        F: FnOnce(Result<Vec<SocketAddr>>) + Send + 'static,
    {
        if let Some(addrs) = self.shared.immediate(host, port, server) {
            callback(Ok(addrs));
            return;
        }

        let host = host.unwrap_or_default().to_string();
        let sender = self.sender.lock().clone();
        match sender {
            Some(sender) => {
                let request = Request {
                    host,
                    port,
                    callback: Box::new(callback),
                };
                if let Err(channel::SendError(request)) = sender.send(request) {
                    (request.callback)(Err(Error::CommunicatorDestroyed));
                }
            }
            None => callback(Err(Error::CommunicatorDestroyed)),
        }
    }

    /// Blocking lookup through the resolver thread.
    pub fn resolve(&self, host: Option<&str>, port: u16, server: bool) -> Result<Vec<SocketAddr>> {
        let (reply, result) = channel::bounded(1);
        self.resolve_async(host, port, server, move |r| {
            let _ = reply.send(r);
        });
        result.recv().unwrap_or(Err(Error::CommunicatorDestroyed))
    }

    /// Stop accepting requests. Queued requests fail with `CommunicatorDestroyed`.
    pub fn destroy(&self) {
        self.shared.destroyed.store(true, Ordering::Release);
        self.sender.lock().take();
    }

    /// Wait for the resolver thread to exit.
    pub fn join_with_thread(&self) {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() == std::thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                log::warn!("[host-resolver] thread panicked");
            }
        }
    }
}

impl Shared {
    /// Answer without a DNS lookup when possible.
    fn immediate(&self, host: Option<&str>, port: u16, server: bool) -> Option<Vec<SocketAddr>> {
        let host = match host {
            None | Some("") => {
                let fallback = if server {
                    self.protocol_support.wildcard_host()
                } else {
                    self.protocol_support.loopback_host()
                };
                return fallback
                    .parse::<IpAddr>()
                    .ok()
                    .map(|ip| vec![SocketAddr::new(ip, port)]);
            }
            Some(host) => host,
        };
        host.parse::<IpAddr>()
            .ok()
            .map(|ip| vec![SocketAddr::new(ip, port)])
    }

    fn lookup(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>> {
        let key = (host.to_string(), port);
        if let Some((at, addrs)) = self.cache.lock().get(&key) {
            if at.elapsed() < CACHE_TTL {
                return Ok(addrs.clone());
            }
        }

        if self.trace_level >= 2 {
            self.logger.trace(
                TraceLevels::NETWORK_CAT,
                &format!("trying to resolve {}:{}", host, port),
            );
        }

        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|e| Error::Connection(format!("cannot resolve `{}': {}", host, e)))?
            .filter(|addr| self.protocol_support.accepts(addr))
            .collect();
        if addrs.is_empty() {
            return Err(Error::Connection(format!(
                "no suitable address for `{}'",
                host
            )));
        }

        self.cache.lock().put(key, (Instant::now(), addrs.clone()));
        Ok(addrs)
    }
}

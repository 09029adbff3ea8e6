// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport plumbing consumed by the runtime core.
//!
//! The runtime only needs a narrow view of a transport:
//!
//! - an [`EndpointFactory`] that parses endpoint strings for one protocol,
//! - an [`Endpoint`] that can connect to or listen on a resolved address,
//! - a [`Transceiver`] / [`Acceptor`] that can be closed.
//!
//! Built-in `tcp` and `udp` factories cover the common case; applications and
//! plugins register more through [`EndpointFactoryManager::add`].
//!
//! ```text
//! "tcp -h host -p 4061 -t 5000"
//!        |
//!        v
//! EndpointFactoryManager --(protocol)--> TcpEndpointFactory --> TcpEndpoint
//!                                                                  |
//!                            EndpointHostResolver --(SocketAddr)---+--> connect / listen
//! ```

mod factory;
mod host_resolver;
mod ip;
mod tcp;
mod udp;

pub use factory::EndpointFactoryManager;
pub use host_resolver::EndpointHostResolver;
pub use ip::IpEndpointOptions;
pub use tcp::{TcpEndpoint, TcpEndpointFactory, TCP_ENDPOINT_TYPE};
pub use udp::{UdpEndpoint, UdpEndpointFactory, UDP_ENDPOINT_TYPE};

use crate::error::Result;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// IP protocol families the runtime may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolSupport {
    /// IPv4 only (default).
    Ipv4,
    /// IPv6 only.
    Ipv6,
    /// Both families ("dual").
    Both,
}

impl ProtocolSupport {
    /// True if `addr` belongs to an enabled family.
    pub fn accepts(self, addr: &SocketAddr) -> bool {
        match self {
            Self::Ipv4 => addr.is_ipv4(),
            Self::Ipv6 => addr.is_ipv6(),
            Self::Both => true,
        }
    }

    /// Wildcard address used when an endpoint has no host.
    pub fn wildcard_host(self) -> &'static str {
        match self {
            Self::Ipv4 => "0.0.0.0",
            Self::Ipv6 | Self::Both => "::",
        }
    }

    /// Loopback address used when a client endpoint has no host.
    pub fn loopback_host(self) -> &'static str {
        match self {
            Self::Ipv4 | Self::Both => "127.0.0.1",
            Self::Ipv6 => "::1",
        }
    }
}

/// A parsed transport endpoint.
pub trait Endpoint: fmt::Debug + fmt::Display + Send + Sync {
    /// Numeric transport type (see [`TCP_ENDPOINT_TYPE`], [`UDP_ENDPOINT_TYPE`]).
    fn type_id(&self) -> i16;
    /// Protocol name, as used in endpoint strings.
    fn protocol(&self) -> &str;
    /// Host, if one was given.
    fn host(&self) -> Option<&str>;
    /// Port (0 lets the OS pick when listening).
    fn port(&self) -> u16;
    /// Connect/close timeout; `None` means infinite.
    fn timeout(&self) -> Option<Duration>;
    /// True for datagram transports.
    fn datagram(&self) -> bool;
    /// Copy of this endpoint with a different timeout.
    fn with_timeout(&self, timeout: Option<Duration>) -> Arc<dyn Endpoint>;
    /// Copy of this endpoint bound to `port` (used to publish port 0 endpoints).
    fn with_port(&self, port: u16) -> Arc<dyn Endpoint>;
    /// Establish an outgoing transceiver to `addr`.
    fn connect(&self, addr: SocketAddr) -> io::Result<Box<dyn Transceiver>>;
    /// Bind an acceptor on `addr`.
    fn listen(&self, addr: SocketAddr) -> io::Result<Box<dyn Acceptor>>;
}

/// Established transport connection.
pub trait Transceiver: Send {
    /// Close the transport. Errors are informational.
    fn close(&mut self) -> io::Result<()>;
    /// Human readable description for traces.
    fn description(&self) -> String;
}

/// Bound listening transport.
pub trait Acceptor: Send {
    /// Address actually bound (resolves port 0).
    fn local_addr(&self) -> io::Result<SocketAddr>;
    /// Stop listening.
    fn close(&mut self);
}

/// Factory for one endpoint protocol.
pub trait EndpointFactory: Send + Sync {
    /// Numeric transport type.
    fn type_id(&self) -> i16;
    /// Protocol name matched against the first token of endpoint strings.
    fn protocol(&self) -> &str;
    /// Parse the option part of an endpoint string (everything after the
    /// protocol name). `server` is true for object adapter endpoints.
    fn create(&self, args: &str, server: bool) -> Result<Arc<dyn Endpoint>>;
    /// Release factory resources. Called once when the runtime is destroyed.
    fn destroy(&self) {}
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Built-in `udp` endpoint.

use super::ip::IpEndpointOptions;
use super::{Acceptor, Endpoint, EndpointFactory, Transceiver};
use crate::error::Result;
use socket2::{Domain, Protocol, Socket, Type};
use std::fmt;
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::time::Duration;

/// Transport type id of `udp` endpoints.
pub const UDP_ENDPOINT_TYPE: i16 = 3;

/// Datagram endpoint over UDP. Timeouts are carried but not used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpEndpoint {
    options: IpEndpointOptions,
}

impl UdpEndpoint {
    pub fn new(options: IpEndpointOptions) -> Self {
        Self { options }
    }

    fn bind_socket(addr: SocketAddr) -> io::Result<UdpSocket> {
        let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&addr.into())?;
        Ok(socket.into())
    }
}

impl fmt::Display for UdpEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("udp")?;
        self.options.write_to(f)
    }
}

impl Endpoint for UdpEndpoint {
    fn type_id(&self) -> i16 {
        UDP_ENDPOINT_TYPE
    }

    fn protocol(&self) -> &str {
        "udp"
    }

    fn host(&self) -> Option<&str> {
        self.options.host.as_deref()
    }

    fn port(&self) -> u16 {
        self.options.port
    }

    fn timeout(&self) -> Option<Duration> {
        self.options.timeout
    }

    fn datagram(&self) -> bool {
        true
    }

    fn with_timeout(&self, timeout: Option<Duration>) -> Arc<dyn Endpoint> {
        let mut options = self.options.clone();
        options.timeout = timeout;
        Arc::new(UdpEndpoint { options })
    }

    fn with_port(&self, port: u16) -> Arc<dyn Endpoint> {
        let mut options = self.options.clone();
        options.port = port;
        Arc::new(UdpEndpoint { options })
    }

    fn connect(&self, addr: SocketAddr) -> io::Result<Box<dyn Transceiver>> {
        let any: SocketAddr = if addr.is_ipv4() {
            (std::net::Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = Self::bind_socket(any)?;
        socket.connect(addr)?;
        Ok(Box::new(UdpTransceiver {
            socket: Some(socket),
            peer: addr,
        }))
    }

    fn listen(&self, addr: SocketAddr) -> io::Result<Box<dyn Acceptor>> {
        let socket = Self::bind_socket(addr)?;
        log::debug!("[udp] bound {}", socket.local_addr()?);
        Ok(Box::new(UdpAcceptor {
            socket: Some(socket),
        }))
    }
}

struct UdpTransceiver {
    socket: Option<UdpSocket>,
    peer: SocketAddr,
}

impl Transceiver for UdpTransceiver {
    fn close(&mut self) -> io::Result<()> {
        self.socket = None;
        Ok(())
    }

    fn description(&self) -> String {
        format!("remote address = {}", self.peer)
    }
}

struct UdpAcceptor {
    socket: Option<UdpSocket>,
}

impl Acceptor for UdpAcceptor {
    fn local_addr(&self) -> io::Result<SocketAddr> {
        match self.socket {
            Some(ref socket) => socket.local_addr(),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "socket closed")),
        }
    }

    fn close(&mut self) {
        self.socket = None;
    }
}

/// Factory for [`UdpEndpoint`].
#[derive(Debug, Default)]
pub struct UdpEndpointFactory {
    default_host: Option<String>,
}

impl UdpEndpointFactory {
    pub fn new(default_host: Option<String>) -> Self {
        Self { default_host }
    }
}

impl EndpointFactory for UdpEndpointFactory {
    fn type_id(&self) -> i16 {
        UDP_ENDPOINT_TYPE
    }

    fn protocol(&self) -> &str {
        "udp"
    }

    fn create(&self, args: &str, _server: bool) -> Result<Arc<dyn Endpoint>> {
        let options = IpEndpointOptions::parse("udp", args, self.default_host.as_deref(), true)?;
        Ok(Arc::new(UdpEndpoint::new(options)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_and_connect() {
        let factory = UdpEndpointFactory::new(None);
        let ep = factory.create("-h 127.0.0.1 -p 0 -c", true).expect("create");
        assert!(ep.datagram());
        assert!(ep.to_string().ends_with("-c"));

        let mut acceptor = ep
            .listen("127.0.0.1:0".parse().expect("addr"))
            .expect("bind");
        let bound = acceptor.local_addr().expect("local addr");

        let mut transceiver = ep.connect(bound).expect("connect");
        assert!(transceiver.description().contains(&bound.to_string()));
        transceiver.close().expect("close");
        acceptor.close();
    }
}

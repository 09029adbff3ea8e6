// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Built-in `tcp` endpoint.

use super::ip::IpEndpointOptions;
use super::{Acceptor, Endpoint, EndpointFactory, Transceiver};
use crate::error::Result;
use socket2::{Domain, Protocol, Socket, Type};
use std::fmt;
use std::io;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;

/// Transport type id of `tcp` endpoints.
pub const TCP_ENDPOINT_TYPE: i16 = 1;

const LISTEN_BACKLOG: i32 = 128;

/// Stream endpoint over TCP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpEndpoint {
    options: IpEndpointOptions,
}

impl TcpEndpoint {
    pub fn new(options: IpEndpointOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &IpEndpointOptions {
        &self.options
    }
}

impl fmt::Display for TcpEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("tcp")?;
        self.options.write_to(f)
    }
}

impl Endpoint for TcpEndpoint {
    fn type_id(&self) -> i16 {
        TCP_ENDPOINT_TYPE
    }

    fn protocol(&self) -> &str {
        "tcp"
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
        false
    }

    fn with_timeout(&self, timeout: Option<Duration>) -> Arc<dyn Endpoint> {
        let mut options = self.options.clone();
        options.timeout = timeout;
        Arc::new(TcpEndpoint { options })
    }

    fn with_port(&self, port: u16) -> Arc<dyn Endpoint> {
        let mut options = self.options.clone();
        options.port = port;
        Arc::new(TcpEndpoint { options })
    }

    fn connect(&self, addr: SocketAddr) -> io::Result<Box<dyn Transceiver>> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_nodelay(true)?;
        match self.options.timeout {
            Some(timeout) => socket.connect_timeout(&addr.into(), timeout)?,
            None => socket.connect(&addr.into())?,
        }
        let stream: TcpStream = socket.into();
        log::debug!("[tcp] connected to {}", addr);
        Ok(Box::new(TcpTransceiver { stream, peer: addr }))
    }

    fn listen(&self, addr: SocketAddr) -> io::Result<Box<dyn Acceptor>> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&addr.into())?;
        socket.listen(LISTEN_BACKLOG)?;
        let listener: TcpListener = socket.into();
        log::debug!("[tcp] listening on {}", listener.local_addr()?);
        Ok(Box::new(TcpAcceptor {
            listener: Some(listener),
        }))
    }
}

struct TcpTransceiver {
    stream: TcpStream,
    peer: SocketAddr,
}

impl Transceiver for TcpTransceiver {
    fn close(&mut self) -> io::Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e),
            _ => Ok(()),
        }
    }

    fn description(&self) -> String {
        match self.stream.local_addr() {
            Ok(local) => format!("local address = {}\nremote address = {}", local, self.peer),
            Err(_) => format!("remote address = {}", self.peer),
        }
    }
}

struct TcpAcceptor {
    listener: Option<TcpListener>,
}

impl Acceptor for TcpAcceptor {
    fn local_addr(&self) -> io::Result<SocketAddr> {
        match self.listener {
            Some(ref listener) => listener.local_addr(),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "acceptor closed")),
        }
    }

    fn close(&mut self) {
        self.listener = None;
    }
}

/// Factory for [`TcpEndpoint`].
#[derive(Debug, Default)]
pub struct TcpEndpointFactory {
    default_host: Option<String>,
}

impl TcpEndpointFactory {
    /// `default_host` is `Orb.Default.Host`, used when `-h` is absent.
    pub fn new(default_host: Option<String>) -> Self {
        Self { default_host }
    }
}

impl EndpointFactory for TcpEndpointFactory {
    fn type_id(&self) -> i16 {
        TCP_ENDPOINT_TYPE
    }

    fn protocol(&self) -> &str {
        "tcp"
    }

    fn create(&self, args: &str, _server: bool) -> Result<Arc<dyn Endpoint>> {
        let options = IpEndpointOptions::parse("tcp", args, self.default_host.as_deref(), false)?;
        Ok(Arc::new(TcpEndpoint::new(options)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_round_trip() {
        let factory = TcpEndpointFactory::new(None);
        let ep = factory.create("-h 127.0.0.1 -p 4061 -t 2500", false).expect("create");
        assert_eq!(ep.to_string(), "tcp -h 127.0.0.1 -p 4061 -t 2500");
        let again = factory
            .create(ep.to_string().trim_start_matches("tcp"), false)
            .expect("reparse");
        assert_eq!(again.to_string(), ep.to_string());
    }

    #[test]
    fn test_listen_and_connect_loopback() {
        let factory = TcpEndpointFactory::new(None);
        let ep = factory.create("-h 127.0.0.1 -p 0", true).expect("create");

        let mut acceptor = ep
            .listen("127.0.0.1:0".parse().expect("addr"))
            .expect("listen");
        let bound = acceptor.local_addr().expect("local addr");
        assert_ne!(bound.port(), 0);

        let mut transceiver = ep.connect(bound).expect("connect");
        assert!(transceiver.description().contains(&bound.to_string()));
        transceiver.close().expect("close");

        acceptor.close();
        assert!(acceptor.local_addr().is_err());
    }

    #[test]
    fn test_with_timeout() {
        let ep = TcpEndpoint::new(IpEndpointOptions::default());
        let ep = ep.with_timeout(Some(Duration::from_millis(10)));
        assert_eq!(ep.timeout(), Some(Duration::from_millis(10)));
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Errors returned by the runtime core and its subsystems.

use std::fmt;
use std::io;

/// Errors returned by orbcore operations.
///
/// Lifecycle violations, configuration problems, resource-creation failures,
/// locator registry failures and usage errors all surface through this enum.
/// Accessors on a destroyed runtime always return
/// [`Error::CommunicatorDestroyed`]; nothing retries internally.
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Lifecycle
    // ========================================================================
    /// The runtime (or its communicator) has been destroyed.
    CommunicatorDestroyed,
    /// A subsystem was requested before `finish_setup` created it.
    NotInitialized(&'static str),
    /// The object adapter was deactivated and no longer accepts the operation.
    AdapterDeactivated(String),

    // ========================================================================
    // Configuration
    // ========================================================================
    /// Contradictory or invalid settings, or a locator that does not know the server.
    Initialization(String),

    // ========================================================================
    // Resource creation
    // ========================================================================
    /// A file (log file, stdout/stderr redirection, config file) could not be opened.
    File {
        /// Path that failed to open.
        path: String,
        /// Underlying cause.
        source: io::Error,
    },
    /// A runtime-owned thread could not be spawned.
    ThreadSpawn {
        /// Thread (or pool) name.
        name: String,
        /// Underlying cause.
        source: io::Error,
    },
    /// An object adapter failed to activate its endpoints.
    AdapterActivation(String),
    /// Outgoing connection could not be established or was closed.
    Connection(String),
    /// Generic I/O error with underlying cause.
    Io(io::Error),

    // ========================================================================
    // Locator registry
    // ========================================================================
    /// Locator registry failure other than "server unknown".
    Registry(String),

    // ========================================================================
    // Usage errors
    // ========================================================================
    /// Object is already registered under this id.
    AlreadyRegistered {
        /// Kind of object ("facet", "object adapter", "plugin", ...).
        kind: &'static str,
        /// Registration key.
        id: String,
    },
    /// No object is registered under this id.
    NotRegistered {
        /// Kind of object ("facet", "object adapter", "plugin", ...).
        kind: &'static str,
        /// Registration key.
        id: String,
    },
    /// Malformed stringified proxy.
    ProxyParse(String),
    /// Malformed endpoint string or unknown transport.
    EndpointParse(String),
    /// Malformed stringified identity.
    IdentityParse(String),
    /// Plugin creation, initialization or lookup failure.
    Plugin(String),
}

impl Error {
    /// Shorthand for [`Error::AlreadyRegistered`].
    pub fn already_registered(kind: &'static str, id: impl Into<String>) -> Self {
        Error::AlreadyRegistered {
            kind,
            id: id.into(),
        }
    }

    /// Shorthand for [`Error::NotRegistered`].
    pub fn not_registered(kind: &'static str, id: impl Into<String>) -> Self {
        Error::NotRegistered {
            kind,
            id: id.into(),
        }
    }

    /// Returns true for [`Error::CommunicatorDestroyed`].
    pub fn is_destroyed(&self) -> bool {
        matches!(self, Error::CommunicatorDestroyed)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Lifecycle
            Error::CommunicatorDestroyed => write!(f, "communicator destroyed"),
            Error::NotInitialized(what) => write!(f, "{} is not initialized", what),
            Error::AdapterDeactivated(name) => {
                write!(f, "object adapter `{}' is deactivated", name)
            }
            // Configuration
            Error::Initialization(reason) => write!(f, "initialization failed: {}", reason),
            // Resources
            Error::File { path, source } => write!(f, "cannot open `{}': {}", path, source),
            Error::ThreadSpawn { name, source } => {
                write!(f, "cannot create thread for {}: {}", name, source)
            }
            Error::AdapterActivation(reason) => {
                write!(f, "object adapter activation failed: {}", reason)
            }
            Error::Connection(reason) => write!(f, "connection failed: {}", reason),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            // Registry
            Error::Registry(reason) => write!(f, "locator registry error: {}", reason),
            // Usage
            Error::AlreadyRegistered { kind, id } => {
                write!(f, "{} `{}' is already registered", kind, id)
            }
            Error::NotRegistered { kind, id } => {
                write!(f, "no {} is registered with id `{}'", kind, id)
            }
            Error::ProxyParse(s) => write!(f, "proxy parse error: {}", s),
            Error::EndpointParse(s) => write!(f, "endpoint parse error: {}", s),
            Error::IdentityParse(s) => write!(f, "identity parse error: {}", s),
            Error::Plugin(s) => write!(f, "plugin error: {}", s),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::File { source, .. } | Error::ThreadSpawn { source, .. } => Some(source),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

/// Convenient alias for results using the crate [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_usage_errors() {
        let e = Error::already_registered("facet", "Process");
        assert_eq!(e.to_string(), "facet `Process' is already registered");

        let e = Error::not_registered("facet", "Metrics");
        assert_eq!(e.to_string(), "no facet is registered with id `Metrics'");
    }

    #[test]
    fn test_source_chain() {
        use std::error::Error as _;

        let e = Error::File {
            path: "/nonexistent/out.log".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert!(e.source().is_some());
        assert!(Error::CommunicatorDestroyed.source().is_none());
        assert!(Error::CommunicatorDestroyed.is_destroyed());
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime configuration - single source of truth for derived settings.
//!
//! # Architecture
//!
//! - **Level 1 (Static)**: constants and defaults (message size, ACM, protocols)
//! - **Level 2 (Derived)**: values computed once from [`Properties`] at runtime
//!   construction ([`TraceLevels`], [`DefaultsAndOverrides`], message-size cap,
//!   ACM timeouts, [`ProtocolSupport`])
//!
//! Derived values are immutable for the life of the runtime and stay readable
//! after it is destroyed.

mod defaults;
mod properties;
mod trace_levels;

pub use defaults::{DefaultsAndOverrides, EndpointSelection};
pub use properties::{Properties, CONFIG_FILES_PROPERTY, RUNTIME_PREFIX};
pub use trace_levels::TraceLevels;

use crate::error::{Error, Result};
use crate::transport::ProtocolSupport;

/// Default `Orb.MessageSizeMax`, in kilobytes.
pub const DEFAULT_MESSAGE_SIZE_MAX_KB: i32 = 1024;

/// Largest representable message size, in bytes.
pub const MESSAGE_SIZE_MAX_LIMIT: usize = 0x7fff_ffff;

/// Default client idle timeout (`Orb.ACM.Client`), in seconds.
pub const DEFAULT_CLIENT_ACM_SECS: i32 = 60;

/// Default server idle timeout (`Orb.ACM.Server`), in seconds. 0 disables.
pub const DEFAULT_SERVER_ACM_SECS: i32 = 0;

/// Message-size cap in bytes derived from `Orb.MessageSizeMax` (kilobytes).
///
/// Non-positive values fall back to the default; values whose byte count
/// would overflow are clamped to [`MESSAGE_SIZE_MAX_LIMIT`].
pub fn message_size_max(props: &Properties) -> usize {
    let kb = props.get_as_int_with_default("Orb.MessageSizeMax", DEFAULT_MESSAGE_SIZE_MAX_KB);
    message_size_max_from_kb(kb)
}

pub(crate) fn message_size_max_from_kb(kb: i32) -> usize {
    if kb < 1 {
        DEFAULT_MESSAGE_SIZE_MAX_KB as usize * 1024
    } else if kb as usize > MESSAGE_SIZE_MAX_LIMIT / 1024 {
        MESSAGE_SIZE_MAX_LIMIT
    } else {
        kb as usize * 1024
    }
}

/// Client idle timeout in seconds (`Orb.ACM.Client`, default 60).
pub fn client_acm(props: &Properties) -> i32 {
    props.get_as_int_with_default("Orb.ACM.Client", DEFAULT_CLIENT_ACM_SECS)
}

/// Server idle timeout in seconds (`Orb.ACM.Server`, default 0 = disabled).
pub fn server_acm(props: &Properties) -> i32 {
    props.get_as_int_with_default("Orb.ACM.Server", DEFAULT_SERVER_ACM_SECS)
}

/// IP protocol support from `Orb.IPv4` (default on) and `Orb.IPv6` (default off).
///
/// Disabling both is a fatal configuration error.
pub fn protocol_support(props: &Properties) -> Result<ProtocolSupport> {
    let ipv4 = props.get_as_int_with_default("Orb.IPv4", 1) > 0;
    let ipv6 = props.get_as_int_with_default("Orb.IPv6", 0) > 0;
    match (ipv4, ipv6) {
        (false, false) => Err(Error::Initialization(
            "both IPv4 and IPv6 support cannot be disabled".to_string(),
        )),
        (true, true) => Ok(ProtocolSupport::Both),
        (true, false) => Ok(ProtocolSupport::Ipv4),
        (false, true) => Ok(ProtocolSupport::Ipv6),
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-category trace verbosity read from `Orb.Trace.*`.

use super::Properties;

/// Trace verbosity by category. 0 disables tracing for that category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceLevels {
    pub network: i32,
    pub protocol: i32,
    pub retry: i32,
    pub location: i32,
    pub thread_pool: i32,
    pub admin: i32,
}

impl TraceLevels {
    pub const NETWORK_CAT: &'static str = "Network";
    pub const PROTOCOL_CAT: &'static str = "Protocol";
    pub const RETRY_CAT: &'static str = "Retry";
    pub const LOCATION_CAT: &'static str = "Locator";
    pub const THREAD_POOL_CAT: &'static str = "ThreadPool";
    pub const ADMIN_CAT: &'static str = "Admin";

    pub fn from_properties(props: &Properties) -> Self {
        let level = |cat: &str| props.get_as_int(&format!("Orb.Trace.{}", cat));
        Self {
            network: level(Self::NETWORK_CAT),
            protocol: level(Self::PROTOCOL_CAT),
            retry: level(Self::RETRY_CAT),
            location: level(Self::LOCATION_CAT),
            thread_pool: level(Self::THREAD_POOL_CAT),
            admin: level(Self::ADMIN_CAT),
        }
    }
}

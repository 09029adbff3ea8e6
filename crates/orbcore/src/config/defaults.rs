// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Default and override settings applied to every reference and endpoint.

use super::Properties;
use crate::error::{Error, Result};
use std::time::Duration;

/// How a proxy orders its endpoints before connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndpointSelection {
    /// Shuffle endpoints before each connection attempt.
    #[default]
    Random,
    /// Try endpoints in the order they were given.
    Ordered,
}

impl EndpointSelection {
    /// Parse `Random`/`Ordered` (empty means `Random`).
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "" | "Random" => Ok(Self::Random),
            "Ordered" => Ok(Self::Ordered),
            other => Err(Error::Initialization(format!(
                "illegal value `{}'; expected `Random' or `Ordered'",
                other
            ))),
        }
    }
}

/// Defaults (`Orb.Default.*`) and overrides (`Orb.Override.*`).
///
/// Derived once at construction; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultsAndOverrides {
    pub default_host: Option<String>,
    pub default_protocol: String,
    pub default_locator_cache_timeout: i32,
    pub default_endpoint_selection: EndpointSelection,
    pub default_collocation_optimized: bool,
    pub override_timeout: Option<Duration>,
    pub override_connect_timeout: Option<Duration>,
    pub override_compress: Option<bool>,
    pub override_secure: bool,
}

impl DefaultsAndOverrides {
    pub fn from_properties(props: &Properties) -> Result<Self> {
        let default_host = props.get("Orb.Default.Host").filter(|h| !h.is_empty());
        let default_protocol = props.get_with_default("Orb.Default.Protocol", "tcp");

        let override_timeout = props
            .get("Orb.Override.Timeout")
            .map(|_| millis(props.get_as_int("Orb.Override.Timeout")));
        let override_connect_timeout = props
            .get("Orb.Override.ConnectTimeout")
            .map(|_| millis(props.get_as_int("Orb.Override.ConnectTimeout")));
        let override_compress = props
            .get("Orb.Override.Compress")
            .map(|_| props.get_as_int("Orb.Override.Compress") > 0);

        Ok(Self {
            default_host,
            default_protocol,
            default_locator_cache_timeout: props
                .get_as_int_with_default("Orb.Default.LocatorCacheTimeout", -1),
            default_endpoint_selection: EndpointSelection::parse(
                &props.get_with_default("Orb.Default.EndpointSelection", "Random"),
            )?,
            default_collocation_optimized: props
                .get_as_int_with_default("Orb.Default.CollocationOptimized", 1)
                > 0,
            override_timeout,
            override_connect_timeout,
            override_compress,
            override_secure: props.get_as_int("Orb.Override.Secure") > 0,
        })
    }
}

fn millis(value: i32) -> Duration {
    Duration::from_millis(value.max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_properties() {
        let d = DefaultsAndOverrides::from_properties(&Properties::new()).expect("defaults");
        assert_eq!(d.default_protocol, "tcp");
        assert_eq!(d.default_host, None);
        assert_eq!(d.default_locator_cache_timeout, -1);
        assert_eq!(d.default_endpoint_selection, EndpointSelection::Random);
        assert!(d.default_collocation_optimized);
        assert_eq!(d.override_timeout, None);
        assert_eq!(d.override_compress, None);
        assert!(!d.override_secure);
    }

    #[test]
    fn test_overrides() {
        let props = Properties::new();
        props.set("Orb.Override.Timeout", "1500");
        props.set("Orb.Override.Compress", "0");
        props.set("Orb.Default.EndpointSelection", "Ordered");
        props.set("Orb.Default.Host", "10.0.0.1");

        let d = DefaultsAndOverrides::from_properties(&props).expect("defaults");
        assert_eq!(d.override_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(d.override_compress, Some(false));
        assert_eq!(d.default_endpoint_selection, EndpointSelection::Ordered);
        assert_eq!(d.default_host.as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_invalid_endpoint_selection() {
        let props = Properties::new();
        props.set("Orb.Default.EndpointSelection", "Fastest");
        assert!(matches!(
            DefaultsAndOverrides::from_properties(&props),
            Err(Error::Initialization(_))
        ));
    }
}

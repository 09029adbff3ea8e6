// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Option parsing shared by the IP endpoints.

use crate::error::{Error, Result};
use std::fmt;
use std::time::Duration;

/// Options common to `tcp` and `udp` endpoints.
///
/// | Option | Meaning |
/// |--------|---------|
/// | `-h host` | host name or address (`*` = wildcard) |
/// | `-p port` | port, 0 for OS-assigned |
/// | `-t ms\|infinite` | connect/close timeout |
/// | `-z` | compression requested |
/// | `-c` | connected datagram socket (udp only) |
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IpEndpointOptions {
    pub host: Option<String>,
    pub port: u16,
    pub timeout: Option<Duration>,
    pub compress: bool,
    pub connect: bool,
}

impl IpEndpointOptions {
    /// Parse `args` for `protocol`. `default_host` fills a missing `-h`.
    pub fn parse(
        protocol: &str,
        args: &str,
        default_host: Option<&str>,
        allow_connect: bool,
    ) -> Result<Self> {
        let invalid =
            |detail: &str| Error::EndpointParse(format!("{} `{} {}'", detail, protocol, args));

        let mut opts = IpEndpointOptions {
            timeout: Some(Duration::from_millis(DEFAULT_TIMEOUT_MS)),
            ..IpEndpointOptions::default()
        };

        let mut tokens = args.split_whitespace();
        while let Some(token) = tokens.next() {
            match token {
                "-h" => {
                    let host = tokens
                        .next()
                        .ok_or_else(|| invalid("no argument provided for -h option in"))?;
                    opts.host = Some(host.trim_matches('"').to_string());
                }
                "-p" => {
                    let port = tokens
                        .next()
                        .ok_or_else(|| invalid("no argument provided for -p option in"))?;
                    opts.port = port
                        .parse::<u16>()
                        .map_err(|_| invalid(&format!("invalid port value `{}' in", port)))?;
                }
                "-t" => {
                    let value = tokens
                        .next()
                        .ok_or_else(|| invalid("no argument provided for -t option in"))?;
                    opts.timeout = if value == "infinite" {
                        None
                    } else {
                        let ms = value
                            .parse::<i64>()
                            .ok()
                            .filter(|ms| *ms >= 1 || *ms == -1)
                            .ok_or_else(|| {
                                invalid(&format!("invalid timeout value `{}' in", value))
                            })?;
                        if ms < 0 {
                            None
                        } else {
                            Some(Duration::from_millis(ms as u64))
                        }
                    };
                }
                "-z" => opts.compress = true,
                "-c" if allow_connect => opts.connect = true,
                other => {
                    return Err(invalid(&format!("unrecognized option `{}' in", other)));
                }
            }
        }

        if opts.host.is_none() {
            opts.host = default_host.map(str::to_string);
        }
        if opts.host.as_deref() == Some("*") {
            opts.host = None;
        }
        Ok(opts)
    }

    /// Write the options back in endpoint string form (without protocol).
    pub(crate) fn write_to(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref host) = self.host {
            if host.contains(':') {
                write!(f, " -h \"{}\"", host)?;
            } else {
                write!(f, " -h {}", host)?;
            }
        }
        write!(f, " -p {}", self.port)?;
        match self.timeout {
            Some(t) => write!(f, " -t {}", t.as_millis())?,
            None => write!(f, " -t infinite")?,
        }
        if self.connect {
            write!(f, " -c")?;
        }
        if self.compress {
            write!(f, " -z")?;
        }
        Ok(())
    }
}

/// Timeout applied when `-t` is absent.
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

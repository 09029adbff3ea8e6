// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Proxy factory: string/property conversions and retry policy.
//!
//! Conversions always go through the runtime's *current* reference factory,
//! so a later `set_default_locator` / `set_default_router` is honored.
//!
//! `Orb.RetryIntervals` lists the delays (ms) between attempts; `-1` as the
//! first value disables retries. Default: one immediate retry (`0`).

use super::{ObjectPrx, ReferenceFactory};
use crate::config::{Properties, TraceLevels};
use crate::error::{Error, Result};
use crate::logging::Logger;
use crate::rt::RetryTask;
use crate::runtime::Runtime;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Creates proxies from strings and properties.
pub struct ProxyFactory {
    runtime: Weak<Runtime>,
    retry_intervals: Vec<u64>,
}

impl ProxyFactory {
    pub fn new(runtime: Weak<Runtime>, props: &Properties, logger: &Arc<dyn Logger>) -> Self {
        Self {
            runtime,
            retry_intervals: parse_retry_intervals(props, logger),
        }
    }

    fn reference_factory(&self) -> Result<Arc<ReferenceFactory>> {
        self.runtime
            .upgrade()
            .ok_or(Error::CommunicatorDestroyed)?
            .reference_factory()
    }

    /// Parse a stringified proxy; empty string yields `None`.
    pub fn string_to_proxy(&self, s: &str) -> Result<Option<ObjectPrx>> {
        Ok(self
            .reference_factory()?
            .create_from_string(s)?
            .map(|r| ObjectPrx::new(Arc::new(r))))
    }

    /// Stringify a proxy; `None` yields the empty string.
    pub fn proxy_to_string(&self, proxy: Option<&ObjectPrx>) -> String {
        proxy.map(ToString::to_string).unwrap_or_default()
    }

    /// Proxy configured by property `prefix` and its sub-properties.
    pub fn property_to_proxy(&self, prefix: &str) -> Result<Option<ObjectPrx>> {
        Ok(self
            .reference_factory()?
            .create_from_properties(prefix)?
            .map(|r| ObjectPrx::new(Arc::new(r))))
    }

    pub fn retry_intervals(&self) -> &[u64] {
        &self.retry_intervals
    }

    /// Decide whether a failed attempt is retried.
    ///
    /// On retry `task` is queued on the retry queue after the next configured
    /// interval and `attempt` is incremented. Otherwise `error` is handed back.
    pub fn retry_after(
        &self,
        error: Error,
        attempt: &mut usize,
        task: Arc<dyn RetryTask>,
    ) -> Result<()> {
        if !matches!(error, Error::Connection(_) | Error::Io(_)) {
            return Err(error);
        }
        let Some(&interval) = self.retry_intervals.get(*attempt) else {
            return Err(error);
        };
        let runtime = self.runtime.upgrade().ok_or(Error::CommunicatorDestroyed)?;
        *attempt += 1;

        if runtime.trace_levels().retry >= 1 {
            runtime.logger().trace(
                TraceLevels::RETRY_CAT,
                &format!(
                    "retrying operation call in {}ms because of exception\n{}",
                    interval, error
                ),
            );
        }
        runtime
            .retry_queue()?
            .add(task, Duration::from_millis(interval))
    }
}

fn parse_retry_intervals(props: &Properties, logger: &Arc<dyn Logger>) -> Vec<u64> {
    let values = props.get_as_list_with_default("Orb.RetryIntervals", &["0"]);
    let mut intervals = Vec::with_capacity(values.len());
    for (i, value) in values.iter().enumerate() {
        match value.parse::<i64>() {
            Ok(-1) if i == 0 => return Vec::new(),
            Ok(ms) if ms >= 0 => intervals.push(ms as u64),
            _ => logger.warning(&format!("ignoring invalid Orb.RetryIntervals value `{}'", value)),
        }
    }
    intervals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogFacadeLogger;

    fn intervals(value: Option<&str>) -> Vec<u64> {
        let props = Properties::new();
        if let Some(v) = value {
            props.set("Orb.RetryIntervals", v);
        }
        let logger: Arc<dyn Logger> = Arc::new(LogFacadeLogger::default());
        parse_retry_intervals(&props, &logger)
    }

    #[test]
    fn test_retry_intervals() {
        assert_eq!(intervals(None), vec![0]);
        assert_eq!(intervals(Some("0 100 500")), vec![0, 100, 500]);
        assert!(intervals(Some("-1")).is_empty());
        assert_eq!(intervals(Some("10 x 20")), vec![10, 20]);
    }

    #[test]
    fn test_non_retryable_error_handed_back() {
        let factory = ProxyFactory {
            runtime: Weak::new(),
            retry_intervals: vec![0],
        };
        struct Never;
        impl RetryTask for Never {
            fn retry(&self) {}
            fn fail(&self, _error: Error) {}
        }
        let mut attempt = 0;
        let err = factory
            .retry_after(Error::ProxyParse("x".into()), &mut attempt, Arc::new(Never))
            .expect_err("not retried");
        assert!(matches!(err, Error::ProxyParse(_)));
        assert_eq!(attempt, 0);

        assert!(matches!(
            factory.retry_after(Error::Connection("refused".into()), &mut attempt, Arc::new(Never)),
            Err(Error::CommunicatorDestroyed)
        ));
    }
}

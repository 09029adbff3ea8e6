// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Periodic connection monitor (`Orb.MonitorConnections`).
//!
//! Runs on the runtime timer and asks every pooled connection to close itself
//! if its ACM idle timeout has elapsed. The interval starts at
//! `Orb.MonitorConnections` seconds and is shortened to the client or server
//! ACM timeout when that is smaller.

use crate::error::Result;
use crate::rt::{Timer, TimerToken};
use crate::runtime::Runtime;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

struct Schedule {
    interval: Duration,
    token: Option<TimerToken>,
    destroyed: bool,
}

/// ACM monitor owned by the runtime.
pub struct ConnectionMonitor {
    runtime: Weak<Runtime>,
    timer: Arc<Timer>,
    schedule: Mutex<Schedule>,
}

impl ConnectionMonitor {
    /// Create the monitor; `interval_secs <= 0` leaves it unscheduled until
    /// an ACM timeout is registered.
    pub fn new(runtime: Weak<Runtime>, timer: Arc<Timer>, interval_secs: i32) -> Result<Self> {
        let monitor = Self {
            runtime,
            timer,
            schedule: Mutex::new(Schedule {
                interval: Duration::ZERO,
                token: None,
                destroyed: false,
            }),
        };
        if interval_secs > 0 {
            monitor.reschedule(Duration::from_secs(interval_secs as u64))?;
        }
        Ok(monitor)
    }

    /// Current monitoring interval; zero when unscheduled.
    pub fn interval(&self) -> Duration {
        self.schedule.lock().interval
    }

    /// Shorten the interval to `acm_secs` if that is smaller (or nothing is
    /// scheduled yet). Non-positive values are ignored.
    pub fn check_interval_for_acm(&self, acm_secs: i32) -> Result<()> {
        if acm_secs <= 0 {
            return Ok(());
        }
        let acm = Duration::from_secs(acm_secs as u64);
        let current = self.interval();
        if current.is_zero() || acm < current {
            self.reschedule(acm)?;
        }
        Ok(())
    }

    fn reschedule(&self, interval: Duration) -> Result<()> {
        let mut schedule = self.schedule.lock();
        if schedule.destroyed {
            return Ok(());
        }
        if let Some(token) = schedule.token.take() {
            self.timer.cancel(token);
        }
        let runtime = self.runtime.clone();
        let token = self.timer.schedule_repeated(
            interval,
            Arc::new(move || {
                if let Some(runtime) = runtime.upgrade() {
                    Self::run(&runtime);
                }
            }),
        )?;
        schedule.interval = interval;
        schedule.token = Some(token);
        log::debug!("[connection-monitor] interval set to {:?}", interval);
        Ok(())
    }

    fn run(runtime: &Runtime) {
        let Ok(factory) = runtime.outgoing_connection_factory() else {
            return;
        };
        let now = Instant::now();
        for conn in factory.connections() {
            conn.monitor(now);
        }
    }

    /// Stop monitoring.
    pub fn destroy(&self) {
        let mut schedule = self.schedule.lock();
        schedule.destroyed = true;
        if let Some(token) = schedule.token.take() {
            self.timer.cancel(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ThreadOptions;

    fn monitor(interval: i32) -> (Arc<Timer>, ConnectionMonitor) {
        let timer = Arc::new(Timer::start(&ThreadOptions::default()).expect("timer"));
        let monitor =
            ConnectionMonitor::new(Weak::new(), Arc::clone(&timer), interval).expect("monitor");
        (timer, monitor)
    }

    #[test]
    fn test_acm_shortens_interval() {
        let (timer, monitor) = monitor(0);
        assert_eq!(monitor.interval(), Duration::ZERO);
        assert_eq!(timer.pending(), 0);

        monitor.check_interval_for_acm(60).expect("client acm");
        assert_eq!(monitor.interval(), Duration::from_secs(60));
        monitor.check_interval_for_acm(0).expect("server acm");
        assert_eq!(monitor.interval(), Duration::from_secs(60));
        monitor.check_interval_for_acm(30).expect("shorter");
        assert_eq!(monitor.interval(), Duration::from_secs(30));
        monitor.check_interval_for_acm(45).expect("longer");
        assert_eq!(monitor.interval(), Duration::from_secs(30));
        assert_eq!(timer.pending(), 1);

        monitor.destroy();
        assert_eq!(timer.pending(), 0);
        timer.destroy();
    }

    #[test]
    fn test_configured_interval() {
        let (timer, monitor) = monitor(10);
        assert_eq!(monitor.interval(), Duration::from_secs(10));
        monitor.check_interval_for_acm(60).expect("acm");
        assert_eq!(monitor.interval(), Duration::from_secs(10));
        monitor.destroy();
        timer.destroy();
    }
}

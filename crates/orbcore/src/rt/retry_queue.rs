// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Delayed request retries, scheduled on the runtime timer.
//!
//! Each queued task receives exactly one of [`RetryTask::retry`] (delay
//! elapsed) or [`RetryTask::fail`] (queue destroyed first).

use super::timer::{Timer, TimerToken};
use crate::config::TraceLevels;
use crate::error::{Error, Result};
use crate::logging::Logger;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A request waiting to be retried.
pub trait RetryTask: Send + Sync {
    /// Delay elapsed; resend.
    fn retry(&self);
    /// The queue was destroyed before the delay elapsed.
    fn fail(&self, error: Error);
}

type Pending = HashMap<u64, (TimerToken, Arc<dyn RetryTask>)>;

/// Retry queue owned by the runtime.
pub struct RetryQueue {
    timer: Arc<Timer>,
    pending: Arc<Mutex<Option<Pending>>>,
    next_id: AtomicU64,
    logger: Arc<dyn Logger>,
    trace_level: i32,
}

impl RetryQueue {
    pub fn new(timer: Arc<Timer>, logger: Arc<dyn Logger>, traces: &TraceLevels) -> Self {
        Self {
            timer,
            pending: Arc::new(Mutex::new(Some(HashMap::new()))),
            next_id: AtomicU64::new(0),
            logger,
            trace_level: traces.retry,
        }
    }

    /// Retry `task` after `delay`.
    pub fn add(&self, task: Arc<dyn RetryTask>, delay: Duration) -> Result<()> {
        let mut pending = self.pending.lock();
        let map = pending.as_mut().ok_or(Error::CommunicatorDestroyed)?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let queue = Arc::clone(&self.pending);
        let token = self.timer.schedule(
            delay,
            Arc::new(move || {
                let entry = queue.lock().as_mut().and_then(|m| m.remove(&id));
                if let Some((_, task)) = entry {
                    task.retry();
                }
            }),
        )?;
        map.insert(id, (token, task));

        if self.trace_level >= 1 {
            self.logger.trace(
                TraceLevels::RETRY_CAT,
                &format!("retrying request in {}ms", delay.as_millis()),
            );
        }
        Ok(())
    }

    /// Requests still waiting.
    pub fn size(&self) -> usize {
        self.pending.lock().as_ref().map_or(0, HashMap::len)
    }

    /// Cancel pending retries and fail them with `CommunicatorDestroyed`.
    pub fn destroy(&self) {
        let pending = self.pending.lock().take();
        let Some(pending) = pending else {
            return;
        };
        for (_, (token, task)) in pending {
            self.timer.cancel(token);
            task.fail(Error::CommunicatorDestroyed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ThreadOptions;
    use crate::logging::LogFacadeLogger;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    #[derive(Default)]
    struct Probe {
        retried: AtomicUsize,
        failed: AtomicUsize,
    }

    impl RetryTask for Probe {
        fn retry(&self) {
            self.retried.fetch_add(1, Ordering::SeqCst);
        }
        fn fail(&self, error: Error) {
            assert!(error.is_destroyed());
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn queue() -> (Arc<Timer>, RetryQueue) {
        let timer = Arc::new(Timer::start(&ThreadOptions::default()).expect("timer"));
        let queue = RetryQueue::new(
            Arc::clone(&timer),
            Arc::new(LogFacadeLogger::default()),
            &TraceLevels::default(),
        );
        (timer, queue)
    }

    #[test]
    fn test_retry_after_delay() {
        let (timer, queue) = queue();
        let probe = Arc::new(Probe::default());
        queue
            .add(probe.clone(), Duration::from_millis(10))
            .expect("add");

        let deadline = Instant::now() + Duration::from_secs(5);
        while probe.retried.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(probe.retried.load(Ordering::SeqCst), 1);
        assert_eq!(queue.size(), 0);
        queue.destroy();
        assert_eq!(probe.failed.load(Ordering::SeqCst), 0);
        timer.destroy();
    }

    #[test]
    fn test_destroy_fails_pending() {
        let (timer, queue) = queue();
        let probe = Arc::new(Probe::default());
        queue
            .add(probe.clone(), Duration::from_secs(60))
            .expect("add");
        assert_eq!(queue.size(), 1);

        queue.destroy();
        assert_eq!(probe.failed.load(Ordering::SeqCst), 1);
        assert_eq!(probe.retried.load(Ordering::SeqCst), 0);
        assert!(matches!(
            queue.add(probe, Duration::ZERO),
            Err(Error::CommunicatorDestroyed)
        ));
        timer.destroy();
    }
}

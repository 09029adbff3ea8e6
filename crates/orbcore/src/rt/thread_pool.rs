// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-size worker pools (`Orb.ThreadPool.Client`, `Orb.ThreadPool.Server`).
//!
//! | Property | Default | Meaning |
//! |----------|---------|---------|
//! | `<prefix>.Size` | 1 | worker threads |
//! | `<prefix>.StackSize` | 0 | stack bytes, 0 = platform default |
//!
//! Jobs go through an unbounded crossbeam channel. `destroy()` closes the
//! channel: queued jobs still run, then workers exit. A pool built with an
//! idle timeout calls its idle callback once when no job has arrived for that
//! long and nothing is running.

use crate::config::{Properties, TraceLevels};
use crate::core::thread::{self, ThreadOptions};
use crate::error::{Error, Result};
use crate::logging::Logger;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Unit of work executed by a pool.
pub type Job = Box<dyn FnOnce() + Send>;

/// Callback fired when an idle pool times out.
pub type IdleCallback = Arc<dyn Fn() + Send + Sync>;

struct Shared {
    name: String,
    busy: AtomicUsize,
    idle_fired: AtomicBool,
    idle: Option<(Duration, IdleCallback)>,
}

/// Worker pool owned by the runtime.
pub struct ThreadPool {
    shared: Arc<Shared>,
    size: usize,
    sender: Mutex<Option<Sender<Job>>>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl ThreadPool {
    /// Create the pool configured under `prefix` (e.g. `Orb.ThreadPool.Client`).
    pub fn new(
        prefix: &str,
        props: &Properties,
        options: &ThreadOptions,
        logger: &Arc<dyn Logger>,
        traces: &TraceLevels,
        idle: Option<(Duration, IdleCallback)>,
    ) -> Result<Self> {
        let mut size = props.get_as_int_with_default(&format!("{}.Size", prefix), 1);
        if size < 1 {
            logger.warning(&format!("{}.Size < 1; size adjusted to 1", prefix));
            size = 1;
        }
        let size = size as usize;

        let stack_size = props.get_as_int(&format!("{}.StackSize", prefix));
        let options = ThreadOptions {
            stack_size: if stack_size > 0 {
                Some(stack_size as usize)
            } else {
                options.stack_size
            },
            ..options.clone()
        };

        if traces.thread_pool >= 1 {
            logger.trace(
                TraceLevels::THREAD_POOL_CAT,
                &format!("creating {}: Size = {}", prefix, size),
            );
        }

        let shared = Arc::new(Shared {
            name: prefix.to_string(),
            busy: AtomicUsize::new(0),
            idle_fired: AtomicBool::new(false),
            idle,
        });
        let (sender, receiver) = channel::unbounded::<Job>();

        let pool = Self {
            shared: Arc::clone(&shared),
            size,
            sender: Mutex::new(Some(sender)),
            threads: Mutex::new(Vec::with_capacity(size)),
        };

        for i in 0..size {
            let worker = Arc::clone(&shared);
            let rx = receiver.clone();
            match thread::spawn(&format!("{}-{}", prefix, i), &options, move || {
                worker.run(rx)
            }) {
                Ok(handle) => pool.threads.lock().push(handle),
                Err(e) => {
                    pool.destroy();
                    pool.join_with_all_threads();
                    return Err(e);
                }
            }
        }
        Ok(pool)
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Queue `job`. Fails once the pool is destroyed.
    pub fn execute<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.lock().clone();
        match sender {
            Some(sender) => sender
                .send(Box::new(job))
                .map_err(|_| Error::CommunicatorDestroyed),
            None => Err(Error::CommunicatorDestroyed),
        }
    }

    /// Stop accepting jobs. Workers finish the queue and exit.
    pub fn destroy(&self) {
        if self.sender.lock().take().is_some() {
            log::debug!("[{}] destroyed", self.shared.name);
        }
    }

    /// Join every worker except the calling thread.
    pub fn join_with_all_threads(&self) {
        let threads = std::mem::take(&mut *self.threads.lock());
        let current = std::thread::current().id();
        for handle in threads {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                log::warn!("[{}] worker panicked", self.shared.name);
            }
        }
    }
}

impl Shared {
    fn run(&self, receiver: Receiver<Job>) {
        loop {
            let job = match self.idle {
                Some((timeout, ref on_idle)) => match receiver.recv_timeout(timeout) {
                    Ok(job) => job,
                    Err(RecvTimeoutError::Timeout) => {
                        if self.busy.load(Ordering::Acquire) == 0
                            && !self.idle_fired.swap(true, Ordering::AcqRel)
                        {
                            log::debug!("[{}] idle for {:?}", self.name, timeout);
                            on_idle();
                        }
                        continue;
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                None => match receiver.recv() {
                    Ok(job) => job,
                    Err(_) => break,
                },
            };

            self.busy.fetch_add(1, Ordering::AcqRel);
            if catch_unwind(AssertUnwindSafe(job)).is_err() {
                log::error!("[{}] job panicked", self.name);
            }
            self.busy.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogFacadeLogger;
    use std::time::Instant;

    fn pool(props: &Properties, idle: Option<(Duration, IdleCallback)>) -> ThreadPool {
        let logger: Arc<dyn Logger> = Arc::new(LogFacadeLogger::default());
        ThreadPool::new(
            "Orb.ThreadPool.Test",
            props,
            &ThreadOptions::default(),
            &logger,
            &TraceLevels::default(),
            idle,
        )
        .expect("pool")
    }

    #[test]
    fn test_size_from_properties() {
        let props = Properties::new();
        props.set("Orb.ThreadPool.Test.Size", "3");
        let p = pool(&props, None);
        assert_eq!(p.size(), 3);
        p.destroy();
        p.join_with_all_threads();

        props.set("Orb.ThreadPool.Test.Size", "0");
        let p = pool(&props, None);
        assert_eq!(p.size(), 1);
        p.destroy();
        p.join_with_all_threads();
    }

    #[test]
    fn test_queued_jobs_run_before_exit() {
        let p = pool(&Properties::new(), None);
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            let c = Arc::clone(&count);
            p.execute(move || {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .expect("execute");
        }
        p.destroy();
        p.join_with_all_threads();
        assert_eq!(count.load(Ordering::SeqCst), 10);
        assert!(matches!(p.execute(|| {}), Err(Error::CommunicatorDestroyed)));
    }

    #[test]
    fn test_idle_callback_fires_once() {
        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);
        let on_idle: IdleCallback = Arc::new(move || {
            f.fetch_add(1, Ordering::SeqCst);
        });
        let p = pool(&Properties::new(), Some((Duration::from_millis(20), on_idle)));

        let deadline = Instant::now() + Duration::from_secs(5);
        while fired.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        p.destroy();
        p.join_with_all_threads();
    }
}

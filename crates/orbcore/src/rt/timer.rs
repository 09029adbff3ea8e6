// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime timer: one thread, one deadline heap.
//!
//! Tasks run on the timer thread with the timer lock released, so a task may
//! schedule or cancel other tasks. Repeated tasks are re-armed before they
//! run; cancelling one from inside its own callback stops further runs.

use crate::core::thread::{self, ThreadOptions};
use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Callback run by the timer.
pub type TimerTask = Arc<dyn Fn() + Send + Sync>;

/// Handle returned by [`Timer::schedule`], used to cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

struct Scheduled {
    task: TimerTask,
    period: Option<Duration>,
}

#[derive(Default)]
struct State {
    queue: BinaryHeap<Reverse<(Instant, u64)>>,
    tasks: HashMap<u64, Scheduled>,
    next_id: u64,
    destroyed: bool,
}

struct Shared {
    state: Mutex<State>,
    wakeup: Condvar,
}

/// Timer service owned by the runtime.
pub struct Timer {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Timer {
    /// Start the timer thread.
    pub fn start(options: &ThreadOptions) -> Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(State::default()),
            wakeup: Condvar::new(),
        });
        let worker = Arc::clone(&shared);
        let handle = thread::spawn("orb-timer", options, move || worker.run())?;
        Ok(Self {
            shared,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Run `task` once after `delay`.
    pub fn schedule(&self, delay: Duration, task: TimerTask) -> Result<TimerToken> {
        self.insert(delay, None, task)
    }

    /// Run `task` every `period`, first after one period.
    pub fn schedule_repeated(&self, period: Duration, task: TimerTask) -> Result<TimerToken> {
        self.insert(period, Some(period), task)
    }

    fn insert(
        &self,
        delay: Duration,
        period: Option<Duration>,
        task: TimerTask,
    ) -> Result<TimerToken> {
        let mut state = self.shared.state.lock();
        if state.destroyed {
            return Err(Error::CommunicatorDestroyed);
        }
        let id = state.next_id;
        state.next_id += 1;
        state.tasks.insert(id, Scheduled { task, period });
        state.queue.push(Reverse((Instant::now() + delay, id)));
        self.shared.wakeup.notify_one();
        Ok(TimerToken(id))
    }

    /// Cancel a task. Returns false if it already ran (one-shot) or is unknown.
    pub fn cancel(&self, token: TimerToken) -> bool {
        self.shared.state.lock().tasks.remove(&token.0).is_some()
    }

    /// Number of scheduled tasks.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().tasks.len()
    }

    /// Drop every task and stop the thread. Joins unless called from a task.
    pub fn destroy(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            state.tasks.clear();
            state.queue.clear();
            self.shared.wakeup.notify_all();
        }

        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() != std::thread::current().id() && handle.join().is_err() {
                log::warn!("[timer] thread panicked");
            }
        }
    }
}

impl Shared {
    fn run(&self) {
        let mut state = self.state.lock();
        loop {
            if state.destroyed {
                break;
            }
            let (due, id) = match state.queue.peek() {
                Some(Reverse(next)) => *next,
                None => {
                    self.wakeup.wait(&mut state);
                    continue;
                }
            };
            if due > Instant::now() {
                self.wakeup.wait_until(&mut state, due);
                continue;
            }
            let st = &mut *state;
            st.queue.pop();

            let task = match st.tasks.get(&id) {
                Some(scheduled) => {
                    let task = Arc::clone(&scheduled.task);
                    let period = scheduled.period;
                    match period {
                        Some(period) => st.queue.push(Reverse((Instant::now() + period, id))),
                        None => {
                            st.tasks.remove(&id);
                        }
                    }
                    task
                }
                // cancelled
                None => continue,
            };

            parking_lot::MutexGuard::unlocked(&mut state, || {
                if catch_unwind(AssertUnwindSafe(|| task())).is_err() {
                    log::error!("[timer] task panicked");
                }
            });
        }
        log::debug!("[timer] stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn wait_for(cond: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_one_shot_runs_once() {
        let timer = Timer::start(&ThreadOptions::default()).expect("timer");
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        timer
            .schedule(Duration::from_millis(10), Arc::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }))
            .expect("schedule");

        assert!(wait_for(|| count.load(Ordering::SeqCst) == 1));
        assert_eq!(timer.pending(), 0);
        timer.destroy();
    }

    #[test]
    fn test_repeated_and_cancel() {
        let timer = Timer::start(&ThreadOptions::default()).expect("timer");
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let token = timer
            .schedule_repeated(Duration::from_millis(5), Arc::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }))
            .expect("schedule");

        assert!(wait_for(|| count.load(Ordering::SeqCst) >= 3));
        assert!(timer.cancel(token));
        assert!(!timer.cancel(token));
        timer.destroy();
    }

    #[test]
    fn test_schedule_after_destroy() {
        let timer = Timer::start(&ThreadOptions::default()).expect("timer");
        timer.destroy();
        timer.destroy();
        assert!(matches!(
            timer.schedule(Duration::ZERO, Arc::new(|| {})),
            Err(Error::CommunicatorDestroyed)
        ));
    }

    #[test]
    fn test_cancelled_task_never_runs() {
        let timer = Timer::start(&ThreadOptions::default()).expect("timer");
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let token = timer
            .schedule(Duration::from_millis(200), Arc::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }))
            .expect("schedule");
        assert!(timer.cancel(token));
        std::thread::sleep(Duration::from_millis(300));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        timer.destroy();
    }
}

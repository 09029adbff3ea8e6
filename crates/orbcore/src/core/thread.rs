// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Spawning of runtime-owned threads.
//!
//! Every thread the runtime creates (pool workers, timer, host resolver,
//! async I/O) goes through [`spawn`], which names it, applies the configured
//! priority and calls the application's [`ThreadNotification`] hook on start
//! and stop.

use crate::error::{Error, Result};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Hook called on every runtime-owned thread.
pub trait ThreadNotification: Send + Sync {
    /// Called on the new thread before it does any work.
    fn start(&self);
    /// Called on the thread right before it exits.
    fn stop(&self);
}

/// Scheduling priority hint (`Orb.ThreadPriority`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadPriority {
    Lowest,
    BelowNormal,
    Normal,
    AboveNormal,
    Highest,
}

impl ThreadPriority {
    /// Parse a priority name (`Lowest` .. `Highest`).
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "Lowest" => Ok(Self::Lowest),
            "BelowNormal" => Ok(Self::BelowNormal),
            "Normal" => Ok(Self::Normal),
            "AboveNormal" => Ok(Self::AboveNormal),
            "Highest" => Ok(Self::Highest),
            other => Err(Error::Initialization(format!(
                "invalid value for Orb.ThreadPriority: {}",
                other
            ))),
        }
    }

    /// Equivalent nice value.
    pub fn nice(self) -> i32 {
        match self {
            Self::Lowest => 19,
            Self::BelowNormal => 10,
            Self::Normal => 0,
            Self::AboveNormal => -10,
            Self::Highest => -20,
        }
    }

    /// Apply to the calling thread. Best effort: raising priority usually
    /// needs privileges, failures are logged and ignored.
    pub fn apply_to_current(self) {
        #[cfg(target_os = "linux")]
        {
            // On Linux, PRIO_PROCESS with who=0 targets the calling thread only.
            // SAFETY: setpriority has no memory-safety preconditions.
            let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, 0, self.nice()) };
            if rc != 0 {
                log::debug!(
                    "[orbcore] setpriority({:?}) failed: {}",
                    self,
                    std::io::Error::last_os_error()
                );
            }
        }
    }
}

/// Options shared by all runtime threads.
#[derive(Clone, Default)]
pub struct ThreadOptions {
    pub hook: Option<Arc<dyn ThreadNotification>>,
    pub priority: Option<ThreadPriority>,
    pub stack_size: Option<usize>,
}

/// Spawn a named runtime thread running `body`.
pub fn spawn<F>(name: &str, options: &ThreadOptions, body: F) -> Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    let mut builder = thread::Builder::new().name(name.to_string());
    if let Some(size) = options.stack_size {
        builder = builder.stack_size(size);
    }

    let hook = options.hook.clone();
    let priority = options.priority;
    builder
        .spawn(move || {
            if let Some(priority) = priority {
                priority.apply_to_current();
            }
            if let Some(ref hook) = hook {
                hook.start();
            }
            body();
            if let Some(ref hook) = hook {
                hook.stop();
            }
        })
        .map_err(|source| Error::ThreadSpawn {
            name: name.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHook {
        started: AtomicUsize,
        stopped: AtomicUsize,
    }

    impl ThreadNotification for CountingHook {
        fn start(&self) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }
        fn stop(&self) {
            self.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_hook_called_around_body() {
        let hook = Arc::new(CountingHook {
            started: AtomicUsize::new(0),
            stopped: AtomicUsize::new(0),
        });
        let options = ThreadOptions {
            hook: Some(hook.clone()),
            ..ThreadOptions::default()
        };

        let handle = spawn("orb-test", &options, || {
            assert_eq!(thread::current().name(), Some("orb-test"));
        })
        .expect("spawn");
        handle.join().expect("join");

        assert_eq!(hook.started.load(Ordering::SeqCst), 1);
        assert_eq!(hook.stopped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!(ThreadPriority::parse("Lowest").expect("parse"), ThreadPriority::Lowest);
        assert_eq!(ThreadPriority::Highest.nice(), -20);
        assert!(ThreadPriority::parse("Realtime").is_err());
    }
}

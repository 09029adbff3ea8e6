// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Single background thread for asynchronous I/O completions (connection
//! closes, batched flushes). Created lazily by the runtime.

use crate::core::thread::{self, ThreadOptions};
use crate::error::{Error, Result};
use crossbeam::channel::{self, Sender};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::JoinHandle;

type Job = Box<dyn FnOnce() + Send>;

/// Async I/O thread owned by the runtime.
pub struct AsyncIoThread {
    sender: Mutex<Option<Sender<Job>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl AsyncIoThread {
    pub fn start(options: &ThreadOptions) -> Result<Self> {
        let (sender, receiver) = channel::unbounded::<Job>();
        let handle = thread::spawn("orb-async-io", options, move || {
            for job in receiver.iter() {
                if catch_unwind(AssertUnwindSafe(job)).is_err() {
                    log::error!("[async-io] job panicked");
                }
            }
            log::debug!("[async-io] stopped");
        })?;
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Queue `job` for the I/O thread.
    pub fn queue<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.lock().clone();
        sender
            .ok_or(Error::CommunicatorDestroyed)?
            .send(Box::new(job))
            .map_err(|_| Error::CommunicatorDestroyed)
    }

    /// Stop accepting jobs; queued jobs still run.
    pub fn destroy(&self) {
        self.sender.lock().take();
    }

    pub fn join_with_thread(&self) {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() != std::thread::current().id() && handle.join().is_err() {
                log::warn!("[async-io] thread panicked");
            }
        }
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Execution layer: worker pools, timer, retry queue and async I/O thread.
//!
//! ```text
//! Runtime
//!  |-- ThreadPool "Orb.ThreadPool.Client"   (created in finish_setup)
//!  |-- ThreadPool "Orb.ThreadPool.Server"   (lazy, idle timeout -> adapter shutdown)
//!  |-- AsyncIoThread                        (lazy)
//!  |-- Timer <---- RetryQueue
//!  |          <--- ConnectionMonitor
//! ```

mod async_io;
mod retry_queue;
mod thread_pool;
mod timer;

pub use async_io::AsyncIoThread;
pub use retry_queue::{RetryQueue, RetryTask};
pub use thread_pool::{IdleCallback, Job, ThreadPool};
pub use timer::{Timer, TimerTask, TimerToken};

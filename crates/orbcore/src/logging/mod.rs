// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime logger abstraction and built-in backends.
//!
//! The runtime reports operator-facing output (traces gated by
//! [`TraceLevels`](crate::config::TraceLevels), warnings, errors) through a
//! [`Logger`]. Internal debugging goes straight to the `log` facade.
//!
//! ## Backend selection
//!
//! | Configuration | Logger |
//! |---------------|--------|
//! | `InitializationData::logger` set | that logger |
//! | `Orb.UseSyslog > 0` | [`SysLogger`] |
//! | `Orb.LogFile` set | [`FileLogger`] |
//! | otherwise | the process logger ([`LogFacadeLogger`] unless replaced) |
//!
//! `Orb.UseSyslog` together with `Orb.LogFile` is a configuration error.

mod output;
mod syslog;

pub use output::{ConsoleLogger, FileLogger, LogFacadeLogger, LogLevel};
pub use syslog::SysLogger;

use crate::config::Properties;
use crate::error::{Error, Result};
use parking_lot::RwLock;
use std::sync::{Arc, OnceLock};

/// Sink for runtime output.
///
/// Implementations must be thread-safe; every runtime-owned thread may log.
pub trait Logger: Send + Sync {
    /// Print a message verbatim.
    fn print(&self, message: &str);
    /// Trace message for a category (see [`TraceLevels`](crate::config::TraceLevels)).
    fn trace(&self, category: &str, message: &str);
    /// Warning condition.
    fn warning(&self, message: &str);
    /// Error condition.
    fn error(&self, message: &str);
}

static PROCESS_LOGGER: OnceLock<RwLock<Arc<dyn Logger>>> = OnceLock::new();

fn process_logger_cell() -> &'static RwLock<Arc<dyn Logger>> {
    PROCESS_LOGGER.get_or_init(|| RwLock::new(Arc::new(LogFacadeLogger::default())))
}

/// Logger shared by every runtime that was not given its own.
pub fn process_logger() -> Arc<dyn Logger> {
    process_logger_cell().read().clone()
}

/// Replace the process logger. Runtimes created afterwards pick it up.
pub fn set_process_logger(logger: Arc<dyn Logger>) {
    *process_logger_cell().write() = logger;
}

/// Choose the logger for a new runtime from its properties.
pub(crate) fn logger_from_properties(props: &Properties) -> Result<Arc<dyn Logger>> {
    let program = props.get_with_default("Orb.ProgramName", "");
    let log_file = props.get_with_default("Orb.LogFile", "");

    if props.get_as_int("Orb.UseSyslog") > 0 {
        if !log_file.is_empty() {
            return Err(Error::Initialization(
                "Orb.LogFile and Orb.UseSyslog cannot both be set".to_string(),
            ));
        }
        let facility = props.get_with_default("Orb.SyslogFacility", "LOG_USER");
        return Ok(Arc::new(SysLogger::open(&program, &facility)?));
    }

    if !log_file.is_empty() {
        return Ok(Arc::new(FileLogger::open(program, &log_file)?));
    }

    Ok(process_logger())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_and_syslog_conflict() {
        let props = Properties::new();
        props.set("Orb.UseSyslog", "1");
        props.set("Orb.LogFile", "/tmp/orbcore-conflict.log");
        assert!(matches!(
            logger_from_properties(&props),
            Err(Error::Initialization(_))
        ));
    }

    #[test]
    fn test_log_file_selected() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("runtime.log");
        let props = Properties::new();
        props.set("Orb.LogFile", path.to_str().expect("utf-8 path"));
        props.set("Orb.ProgramName", "svc");

        let logger = logger_from_properties(&props).expect("file logger");
        logger.warning("hello");
        let text = std::fs::read_to_string(&path).expect("read log");
        assert!(text.contains("svc: [WARN] hello"));
    }

    #[test]
    fn test_default_is_process_logger() {
        let props = Properties::new();
        let logger = logger_from_properties(&props).expect("process logger");
        assert!(Arc::ptr_eq(&logger, &process_logger()));
    }
}

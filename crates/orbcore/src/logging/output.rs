// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Logger backends (log facade, console and file).
//!
//! All backends are thread-safe; write failures are swallowed after a single
//! facade diagnostic since a logger has nowhere else to report them.

use super::Logger;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};

/// Severity used when formatting a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Plain output from `print`.
    Print = 0,
    /// Trace output, tagged by category.
    Trace = 1,
    /// Warning conditions.
    Warning = 2,
    /// Error conditions.
    Error = 3,
}

impl LogLevel {
    /// Returns the string representation of the log level.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Print => "",
            Self::Trace => "TRACE",
            Self::Warning => "WARN ",
            Self::Error => "ERROR",
        }
    }
}

fn format_line(prefix: &str, level: LogLevel, category: Option<&str>, message: &str) -> String {
    let mut line = String::with_capacity(message.len() + 48);
    if level != LogLevel::Print {
        line.push_str(&format!("-- {} ", chrono::Local::now().format("%m/%d/%y %H:%M:%S%.3f")));
        if !prefix.is_empty() {
            line.push_str(prefix);
            line.push_str(": ");
        }
        line.push_str(&format!("[{}] ", level.as_str().trim_end()));
        if let Some(category) = category {
            line.push_str(category);
            line.push_str(": ");
        }
    }
    line.push_str(message);
    line.push('\n');
    line
}

/// Logger that forwards to the `log` facade.
///
/// This is the default process logger: whatever `log` implementation the
/// application installs receives runtime output.
#[derive(Debug, Default)]
pub struct LogFacadeLogger {
    prefix: String,
}

impl LogFacadeLogger {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Logger for LogFacadeLogger {
    fn print(&self, message: &str) {
        log::info!("{}", message);
    }

    fn trace(&self, category: &str, message: &str) {
        if self.prefix.is_empty() {
            log::info!("[{}] {}", category, message);
        } else {
            log::info!("{}: [{}] {}", self.prefix, category, message);
        }
    }

    fn warning(&self, message: &str) {
        if self.prefix.is_empty() {
            log::warn!("{}", message);
        } else {
            log::warn!("{}: {}", self.prefix, message);
        }
    }

    fn error(&self, message: &str) {
        if self.prefix.is_empty() {
            log::error!("{}", message);
        } else {
            log::error!("{}: {}", self.prefix, message);
        }
    }
}

/// Console logger writing to stderr.
#[derive(Debug, Default)]
pub struct ConsoleLogger {
    prefix: String,
}

impl ConsoleLogger {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn write(&self, level: LogLevel, category: Option<&str>, message: &str) {
        let line = format_line(&self.prefix, level, category, message);
        let mut stderr = io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

impl Logger for ConsoleLogger {
    fn print(&self, message: &str) {
        self.write(LogLevel::Print, None, message);
    }

    fn trace(&self, category: &str, message: &str) {
        self.write(LogLevel::Trace, Some(category), message);
    }

    fn warning(&self, message: &str) {
        self.write(LogLevel::Warning, None, message);
    }

    fn error(&self, message: &str) {
        self.write(LogLevel::Error, None, message);
    }
}

/// File logger (`Orb.LogFile`).
///
/// Appends timestamped lines to the file; the handle is protected by a mutex.
pub struct FileLogger {
    prefix: String,
    path: String,
    file: Mutex<File>,
}

impl FileLogger {
    /// Open (or create) `path` in append mode.
    pub fn open(prefix: impl Into<String>, path: &str) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| Error::File {
                path: path.to_string(),
                source,
            })?;

        Ok(Self {
            prefix: prefix.into(),
            path: path.to_string(),
            file: Mutex::new(file),
        })
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn write(&self, level: LogLevel, category: Option<&str>, message: &str) {
        let line = format_line(&self.prefix, level, category, message);
        let mut file = self.file.lock();
        let written = file.write_all(line.as_bytes());
        if let Err(e) = written.and_then(|()| file.flush()) {
            log::debug!("[orbcore] write to log file {} failed: {}", self.path, e);
        }
    }
}

impl Logger for FileLogger {
    fn print(&self, message: &str) {
        self.write(LogLevel::Print, None, message);
    }

    fn trace(&self, category: &str, message: &str) {
        self.write(LogLevel::Trace, Some(category), message);
    }

    fn warning(&self, message: &str) {
        self.write(LogLevel::Warning, None, message);
    }

    fn error(&self, message: &str) {
        self.write(LogLevel::Error, None, message);
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide one-off actions shared by every runtime in the process.
//!
//! Only the first runtime created redirects stdout/stderr (`Orb.StdOut`,
//! `Orb.StdErr`); later runtimes' settings are ignored. The process id is
//! printed at most once (`Orb.PrintProcessId`).

use crate::config::Properties;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;

struct ProcessState {
    stdio_done: bool,
    pid_printed: bool,
}

static PROCESS: Mutex<ProcessState> = parking_lot::const_mutex(ProcessState {
    stdio_done: false,
    pid_printed: false,
});

fn open_append(path: &str) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| Error::File {
            path: path.to_string(),
            source,
        })
}

#[cfg(unix)]
fn redirect(file: &File, fd: libc::c_int, path: &str) -> Result<()> {
    use std::os::unix::io::AsRawFd;
    // SAFETY: both descriptors are valid for the duration of the call.
    if unsafe { libc::dup2(file.as_raw_fd(), fd) } < 0 {
        return Err(Error::File {
            path: path.to_string(),
            source: std::io::Error::last_os_error(),
        });
    }
    Ok(())
}

#[cfg(not(unix))]
fn redirect(_file: &File, _fd: i32, path: &str) -> Result<()> {
    log::warn!("[orbcore] stdio redirection to {} not supported on this platform", path);
    Ok(())
}

#[cfg(unix)]
const STDOUT_FD: i32 = libc::STDOUT_FILENO;
#[cfg(unix)]
const STDERR_FD: i32 = libc::STDERR_FILENO;
#[cfg(not(unix))]
const STDOUT_FD: i32 = 1;
#[cfg(not(unix))]
const STDERR_FD: i32 = 2;

/// Redirect stdout/stderr to the files named by `Orb.StdOut`/`Orb.StdErr`,
/// appending. Runs once per process; the same path for both shares one file.
pub(crate) fn redirect_stdio(props: &Properties) -> Result<()> {
    let mut process = PROCESS.lock();
    if process.stdio_done {
        return Ok(());
    }
    let stdout = props.get_with_default("Orb.StdOut", "");
    let stderr = props.get_with_default("Orb.StdErr", "");

    let mut out_file = None;
    if !stdout.is_empty() {
        if let Err(e) = std::io::stdout().flush() {
            log::debug!("[orbcore] stdout flush before redirect failed: {}", e);
        }
        let file = open_append(&stdout)?;
        redirect(&file, STDOUT_FD, &stdout)?;
        out_file = Some(file);
    }
    if !stderr.is_empty() {
        match out_file {
            Some(ref file) if stderr == stdout => redirect(file, STDERR_FD, &stderr)?,
            _ => {
                let file = open_append(&stderr)?;
                redirect(&file, STDERR_FD, &stderr)?;
            }
        }
    }
    if !stdout.is_empty() || !stderr.is_empty() {
        log::debug!("[orbcore] stdio redirected (stdout `{}', stderr `{}')", stdout, stderr);
    }
    process.stdio_done = true;
    Ok(())
}

/// Print the process id on stdout, the first time only.
pub(crate) fn print_process_id_once() {
    let mut process = PROCESS.lock();
    if process.pid_printed {
        return;
    }
    let mut out = std::io::stdout().lock();
    if writeln!(out, "{}", std::process::id())
        .and_then(|()| out.flush())
        .is_err()
    {
        log::debug!("[orbcore] cannot print process id");
    }
    process.pid_printed = true;
}

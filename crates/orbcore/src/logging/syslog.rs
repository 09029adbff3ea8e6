// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Syslog logger (`Orb.UseSyslog`).

use super::Logger;
use crate::error::{Error, Result};

#[cfg(unix)]
use std::ffi::CString;

/// Logger writing to the system log through `libc::syslog`.
///
/// `openlog` keeps a pointer to the identity string, so the `CString` lives as
/// long as the logger and `closelog` runs on drop.
#[cfg(unix)]
pub struct SysLogger {
    facility: libc::c_int,
    _ident: CString,
}

#[cfg(unix)]
impl SysLogger {
    /// Open the system log with `program` as identity and the named facility
    /// (`LOG_USER`, `LOG_DAEMON`, `LOG_LOCAL0`..`LOG_LOCAL7`, ...).
    pub fn open(program: &str, facility: &str) -> Result<Self> {
        let facility = parse_facility(facility)?;
        let ident = CString::new(program.replace('\0', ""))
            .map_err(|e| Error::Initialization(format!("invalid syslog identity: {}", e)))?;

        // SAFETY: `ident` outlives every syslog call made through this logger.
        unsafe { libc::openlog(ident.as_ptr(), libc::LOG_PID, facility) };

        Ok(Self {
            facility,
            _ident: ident,
        })
    }

    fn log(&self, priority: libc::c_int, message: &str) {
        let Ok(text) = CString::new(message.replace('\0', "")) else {
            return;
        };
        // SAFETY: format string and argument are valid NUL-terminated C strings.
        unsafe {
            libc::syslog(
                priority | self.facility,
                b"%s\0".as_ptr().cast::<libc::c_char>(),
                text.as_ptr(),
            );
        }
    }
}

#[cfg(unix)]
impl Drop for SysLogger {
    fn drop(&mut self) {
        // SAFETY: closelog has no preconditions.
        unsafe { libc::closelog() };
    }
}

#[cfg(unix)]
impl Logger for SysLogger {
    fn print(&self, message: &str) {
        self.log(libc::LOG_INFO, message);
    }

    fn trace(&self, category: &str, message: &str) {
        self.log(libc::LOG_INFO, &format!("{}: {}", category, message));
    }

    fn warning(&self, message: &str) {
        self.log(libc::LOG_WARNING, message);
    }

    fn error(&self, message: &str) {
        self.log(libc::LOG_ERR, message);
    }
}

#[cfg(unix)]
fn parse_facility(name: &str) -> Result<libc::c_int> {
    let facility = match name {
        "LOG_KERN" => libc::LOG_KERN,
        "LOG_USER" => libc::LOG_USER,
        "LOG_MAIL" => libc::LOG_MAIL,
        "LOG_DAEMON" => libc::LOG_DAEMON,
        "LOG_AUTH" => libc::LOG_AUTH,
        "LOG_SYSLOG" => libc::LOG_SYSLOG,
        "LOG_LPR" => libc::LOG_LPR,
        "LOG_NEWS" => libc::LOG_NEWS,
        "LOG_UUCP" => libc::LOG_UUCP,
        "LOG_CRON" => libc::LOG_CRON,
        "LOG_LOCAL0" => libc::LOG_LOCAL0,
        "LOG_LOCAL1" => libc::LOG_LOCAL1,
        "LOG_LOCAL2" => libc::LOG_LOCAL2,
        "LOG_LOCAL3" => libc::LOG_LOCAL3,
        "LOG_LOCAL4" => libc::LOG_LOCAL4,
        "LOG_LOCAL5" => libc::LOG_LOCAL5,
        "LOG_LOCAL6" => libc::LOG_LOCAL6,
        "LOG_LOCAL7" => libc::LOG_LOCAL7,
        other => {
            return Err(Error::Initialization(format!(
                "invalid value for Orb.SyslogFacility: {}",
                other
            )))
        }
    };
    Ok(facility)
}

/// Placeholder on platforms without syslog: opening always fails.
#[cfg(not(unix))]
pub struct SysLogger;

#[cfg(not(unix))]
impl SysLogger {
    pub fn open(_program: &str, _facility: &str) -> Result<Self> {
        Err(Error::Initialization(
            "Orb.UseSyslog is not supported on this platform".to_string(),
        ))
    }
}

#[cfg(not(unix))]
impl Logger for SysLogger {
    fn print(&self, _message: &str) {}
    fn trace(&self, _category: &str, _message: &str) {}
    fn warning(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_facility_names() {
        assert_eq!(parse_facility("LOG_USER").expect("user"), libc::LOG_USER);
        assert_eq!(parse_facility("LOG_LOCAL3").expect("local3"), libc::LOG_LOCAL3);
        assert!(matches!(
            parse_facility("LOG_NOPE"),
            Err(Error::Initialization(_))
        ));
    }
}

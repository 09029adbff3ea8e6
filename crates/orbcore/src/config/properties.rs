// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Property store with per-key usage tracking.
//!
//! Every read marks the key as consulted so that the runtime can report
//! properties that were set but never read (`Orb.Warn.UnusedProperties`).
//!
//! # Sources
//!
//! - Programmatic: [`Properties::set`]
//! - Command line: `--Orb.Key=value` arguments via [`Properties::parse_command_line`]
//! - Files: `key=value` lines via [`Properties::load`] (also triggered by `Orb.Config`)

use crate::error::{Error, Result};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};

/// Prefix reserved for runtime configuration keys.
pub const RUNTIME_PREFIX: &str = "Orb";

/// Property naming a comma/space separated list of config files to load.
pub const CONFIG_FILES_PROPERTY: &str = "Orb.Config";

#[derive(Debug)]
struct PropertyEntry {
    value: String,
    used: AtomicBool,
}

impl PropertyEntry {
    fn new(value: String) -> Self {
        Self {
            value,
            used: AtomicBool::new(false),
        }
    }
}

/// Thread-safe property set.
///
/// Lock-free reads through `DashMap`; values are plain strings, numeric and
/// list views are derived on each read.
#[derive(Debug, Default)]
pub struct Properties {
    entries: DashMap<String, PropertyEntry>,
}

impl Properties {
    /// Create an empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a property set from command-line arguments.
    ///
    /// Consumes every `--Orb.*` argument from `args` and then loads the files
    /// named by `Orb.Config` (command-line values win over file values).
    pub fn from_args(args: &mut Vec<String>) -> Result<Self> {
        let props = Self::new();
        *args = props.parse_command_line(RUNTIME_PREFIX, args);
        props.load_config_files()?;
        Ok(props)
    }

    /// Read a property, marking it used. `None` when unset.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| {
            entry.used.store(true, Ordering::Relaxed);
            entry.value.clone()
        })
    }

    /// Read a property or return `default` when unset.
    pub fn get_with_default(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Read a property as an integer, 0 when unset.
    pub fn get_as_int(&self, key: &str) -> i32 {
        self.get_as_int_with_default(key, 0)
    }

    /// Read a property as an integer.
    ///
    /// Unset keys yield `default`. Values that do not parse are reported and
    /// also yield `default`.
    pub fn get_as_int_with_default(&self, key: &str, default: i32) -> i32 {
        match self.get(key) {
            None => default,
            Some(value) => match value.trim().parse::<i32>() {
                Ok(n) => n,
                Err(_) => {
                    log::warn!(
                        "[orbcore] numeric property {} set to non-numeric value `{}', defaulting to {}",
                        key,
                        value,
                        default
                    );
                    default
                }
            },
        }
    }

    /// Read a property as a list split on commas and whitespace.
    pub fn get_as_list(&self, key: &str) -> Vec<String> {
        self.get_as_list_with_default(key, &[])
    }

    /// Read a property as a list, or `default` when unset or empty.
    pub fn get_as_list_with_default(&self, key: &str, default: &[&str]) -> Vec<String> {
        let list: Vec<String> = self
            .get(key)
            .map(|value| split_list(&value))
            .unwrap_or_default();
        if list.is_empty() {
            default.iter().map(|s| (*s).to_string()).collect()
        } else {
            list
        }
    }

    /// Set a property. An empty value removes the key.
    pub fn set(&self, key: &str, value: &str) {
        let key = key.trim();
        if key.is_empty() {
            return;
        }
        if value.is_empty() {
            self.entries.remove(key);
        } else {
            self.entries
                .insert(key.to_string(), PropertyEntry::new(value.to_string()));
        }
    }

    /// All properties whose key starts with `prefix`, marking them used.
    pub fn properties_for_prefix(&self, prefix: &str) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| {
                entry.value().used.store(true, Ordering::Relaxed);
                (entry.key().clone(), entry.value().value.clone())
            })
            .collect()
    }

    /// Keys that were set but never read, sorted.
    pub fn unused_properties(&self) -> Vec<String> {
        let mut unused: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| !entry.value().used.load(Ordering::Relaxed))
            .map(|entry| entry.key().clone())
            .collect();
        unused.sort();
        unused
    }

    /// Number of properties currently set.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no property is set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume `--<prefix>.Key[=value]` options, returning the remaining args.
    ///
    /// A bare `--<prefix>.Key` sets the value to `1`.
    pub fn parse_command_line(&self, prefix: &str, args: &[String]) -> Vec<String> {
        let option_prefix = format!("--{}.", prefix);
        let mut remaining = Vec::with_capacity(args.len());
        for arg in args {
            match arg.strip_prefix("--") {
                Some(option) if arg.starts_with(&option_prefix) => {
                    let (key, value) = match option.split_once('=') {
                        Some((k, v)) => (k, v),
                        None => (option, "1"),
                    };
                    self.set(key, value);
                }
                _ => remaining.push(arg.clone()),
            }
        }
        remaining
    }

    /// Load `key=value` lines from a file. `#` starts a comment.
    pub fn load(&self, path: &str) -> Result<()> {
        let text = fs::read_to_string(path).map_err(|source| Error::File {
            path: path.to_string(),
            source,
        })?;
        for line in text.lines() {
            let line = match line.find('#') {
                Some(pos) => &line[..pos],
                None => line,
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                // Values given on the command line take precedence.
                if !self.entries.contains_key(key) {
                    self.set(key, value.trim());
                }
            } else {
                log::debug!("[orbcore] ignoring malformed property line `{}' in {}", line, path);
            }
        }
        Ok(())
    }

    fn load_config_files(&self) -> Result<()> {
        for file in self.get_as_list(CONFIG_FILES_PROPERTY) {
            self.load(&file)?;
        }
        Ok(())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

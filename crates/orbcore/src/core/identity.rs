// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object identities and their stringified form.
//!
//! String form is `category/name`, or just `name` when the category is empty.
//! `/` and `\` inside either component are escaped with a backslash.

use crate::error::{Error, Result};
use std::fmt;

/// Identity of a remote object: `(category, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Identity {
    pub name: String,
    pub category: String,
}

impl Identity {
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
        }
    }

    /// Parse `category/name` (or `name`).
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut chars = s.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(escaped) => current.push(escaped),
                    None => {
                        return Err(Error::IdentityParse(format!(
                            "trailing escape character in `{}'",
                            s
                        )))
                    }
                },
                '/' => parts.push(std::mem::take(&mut current)),
                other => current.push(other),
            }
        }
        parts.push(current);

        let identity = match parts.len() {
            1 => Identity::new("", parts.remove(0)),
            2 => {
                let name = parts.remove(1);
                Identity::new(parts.remove(0), name)
            }
            _ => {
                return Err(Error::IdentityParse(format!(
                    "unescaped `/' in name of `{}'",
                    s
                )))
            }
        };

        if identity.name.is_empty() {
            return Err(Error::IdentityParse(format!("empty name in `{}'", s)));
        }
        Ok(identity)
    }
}

fn escape(s: &str, out: &mut String) {
    for c in s.chars() {
        if c == '/' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::with_capacity(self.category.len() + self.name.len() + 1);
        if !self.category.is_empty() {
            escape(&self.category, &mut out);
            out.push('/');
        }
        escape(&self.name, &mut out);
        f.write_str(&out)
    }
}

/// Generate a random UUID-like token (version 4 layout).
pub fn generate_uuid() -> String {
    let hi = fastrand::u64(..);
    let lo = fastrand::u64(..);
    // Version 4, variant 10xx.
    let hi = (hi & 0xffff_ffff_ffff_0fff) | 0x0000_0000_0000_4000;
    let lo = (lo & 0x3fff_ffff_ffff_ffff) | 0x8000_0000_0000_0000;
    format!(
        "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
        hi >> 32,
        (hi >> 16) & 0xffff,
        hi & 0xffff,
        lo >> 48,
        lo & 0xffff_ffff_ffff
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let id = Identity::parse("admin/server-1").expect("parse");
        assert_eq!(id, Identity::new("admin", "server-1"));
        assert_eq!(id.to_string(), "admin/server-1");

        let id = Identity::parse("hello").expect("parse");
        assert_eq!(id.category, "");
        assert_eq!(id.to_string(), "hello");
    }

    #[test]
    fn test_escaping() {
        let id = Identity::new("a/b", "c\\d");
        let s = id.to_string();
        assert_eq!(s, "a\\/b/c\\\\d");
        assert_eq!(Identity::parse(&s).expect("parse escaped"), id);
    }

    #[test]
    fn test_parse_errors() {
        assert!(Identity::parse("").is_err());
        assert!(Identity::parse("cat/").is_err());
        assert!(Identity::parse("a/b/c").is_err());
        assert!(Identity::parse("trailing\\").is_err());
    }

    #[test]
    fn test_uuid_shape() {
        let a = generate_uuid();
        let b = generate_uuid();
        assert_eq!(a.len(), 36);
        assert_eq!(a.as_bytes()[14], b'4');
        assert_ne!(a, b);
    }
}

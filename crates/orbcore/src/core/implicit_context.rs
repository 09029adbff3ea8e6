// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Implicit per-call context (`Orb.ImplicitContext`).
//!
//! | Value | Behavior |
//! |-------|----------|
//! | unset / `None` | no implicit context |
//! | `Shared` | one map shared by every thread (copy-on-write via `ArcSwap`) |
//! | `PerThread` | one map per calling thread (`DashMap` keyed by thread id) |

use crate::error::{Error, Result};
use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Key/value context attached to outgoing requests.
pub type Context = HashMap<String, String>;

enum Storage {
    Shared(ArcSwap<Context>),
    PerThread(DashMap<ThreadId, Context>),
}

/// Implicit context shared by all proxies of a communicator.
pub struct ImplicitContext {
    storage: Storage,
}

impl ImplicitContext {
    /// Create the context selected by `kind`; `Ok(None)` for `None`/empty.
    pub fn create(kind: &str) -> Result<Option<Arc<Self>>> {
        let storage = match kind {
            "" | "None" => return Ok(None),
            "Shared" => Storage::Shared(ArcSwap::from_pointee(Context::new())),
            "PerThread" => Storage::PerThread(DashMap::new()),
            other => {
                return Err(Error::Initialization(format!(
                    "`{}' is not a valid value for Orb.ImplicitContext",
                    other
                )))
            }
        };
        Ok(Some(Arc::new(Self { storage })))
    }

    /// Snapshot of the whole context.
    pub fn context(&self) -> Context {
        match &self.storage {
            Storage::Shared(map) => map.load().as_ref().clone(),
            Storage::PerThread(maps) => maps
                .get(&thread::current().id())
                .map(|m| m.clone())
                .unwrap_or_default(),
        }
    }

    /// Replace the whole context.
    pub fn set_context(&self, context: Context) {
        match &self.storage {
            Storage::Shared(map) => map.store(Arc::new(context)),
            Storage::PerThread(maps) => {
                let id = thread::current().id();
                if context.is_empty() {
                    maps.remove(&id);
                } else {
                    maps.insert(id, context);
                }
            }
        }
    }

    /// Value for `key`, empty string when missing.
    pub fn get(&self, key: &str) -> String {
        match &self.storage {
            Storage::Shared(map) => map.load().get(key).cloned().unwrap_or_default(),
            Storage::PerThread(maps) => maps
                .get(&thread::current().id())
                .and_then(|m| m.get(key).cloned())
                .unwrap_or_default(),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        match &self.storage {
            Storage::Shared(map) => map.load().contains_key(key),
            Storage::PerThread(maps) => maps
                .get(&thread::current().id())
                .is_some_and(|m| m.contains_key(key)),
        }
    }

    /// Insert `key`, returning the previous value (empty when none).
    pub fn put(&self, key: &str, value: &str) -> String {
        match &self.storage {
            Storage::Shared(map) => {
                let mut previous = String::new();
                map.rcu(|current| {
                    let mut next = Context::clone(current);
                    previous = next
                        .insert(key.to_string(), value.to_string())
                        .unwrap_or_default();
                    next
                });
                previous
            }
            Storage::PerThread(maps) => maps
                .entry(thread::current().id())
                .or_default()
                .insert(key.to_string(), value.to_string())
                .unwrap_or_default(),
        }
    }

    /// Remove `key`, returning its value (empty when none).
    pub fn remove(&self, key: &str) -> String {
        match &self.storage {
            Storage::Shared(map) => {
                let mut previous = String::new();
                map.rcu(|current| {
                    let mut next = Context::clone(current);
                    previous = next.remove(key).unwrap_or_default();
                    next
                });
                previous
            }
            Storage::PerThread(maps) => {
                let id = thread::current().id();
                let removed = maps
                    .get_mut(&id)
                    .and_then(|mut m| m.remove(key))
                    .unwrap_or_default();
                maps.remove_if(&id, |_, m| m.is_empty());
                removed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert!(ImplicitContext::create("").expect("none").is_none());
        assert!(ImplicitContext::create("None").expect("none").is_none());
        assert!(ImplicitContext::create("Shared").expect("shared").is_some());
        assert!(ImplicitContext::create("PerThread").expect("per-thread").is_some());
        assert!(matches!(
            ImplicitContext::create("Global"),
            Err(Error::Initialization(_))
        ));
    }

    #[test]
    fn test_shared_visible_across_threads() {
        let ctx = ImplicitContext::create("Shared").expect("create").expect("some");
        assert_eq!(ctx.put("tenant", "a"), "");
        assert_eq!(ctx.put("tenant", "b"), "a");

        let other = Arc::clone(&ctx);
        let seen = thread::spawn(move || other.get("tenant"))
            .join()
            .expect("join");
        assert_eq!(seen, "b");

        assert_eq!(ctx.remove("tenant"), "b");
        assert!(!ctx.contains_key("tenant"));
    }

    #[test]
    fn test_per_thread_isolation() {
        let ctx = ImplicitContext::create("PerThread").expect("create").expect("some");
        ctx.put("user", "main");

        let other = Arc::clone(&ctx);
        let seen = thread::spawn(move || {
            let before = other.get("user");
            other.put("user", "worker");
            (before, other.get("user"))
        })
        .join()
        .expect("join");

        assert_eq!(seen, (String::new(), "worker".to_string()));
        assert_eq!(ctx.get("user"), "main");
        assert_eq!(ctx.context().len(), 1);
    }
}

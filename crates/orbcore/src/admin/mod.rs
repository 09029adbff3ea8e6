// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Built-in administrative facets.
//!
//! Every runtime buffers these at construction and hosts them on the admin
//! object adapter (`Orb.Admin`) once it exists:
//!
//! | Facet | Servant | Purpose |
//! |-------|---------|---------|
//! | `Properties` | [`PropertiesAdmin`] | read-only property inspection |
//! | `Process` | [`ProcessAdmin`] | remote shutdown and console output |

use crate::adapter::Servant;
use crate::config::Properties;
use crate::error::{Error, Result};
use crate::runtime::Runtime;
use std::any::Any;
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::{Arc, Weak};

/// Facet name of [`PropertiesAdmin`].
pub const PROPERTIES_FACET: &str = "Properties";
/// Facet name of [`ProcessAdmin`].
pub const PROCESS_FACET: &str = "Process";

/// Exposes the runtime's properties.
pub struct PropertiesAdmin {
    properties: Arc<Properties>,
}

impl PropertiesAdmin {
    pub const INTERFACE_ID: &'static str = "::Orb::PropertiesAdmin";

    pub fn new(properties: Arc<Properties>) -> Self {
        Self { properties }
    }

    /// Value of `name`, empty when unset.
    pub fn get_property(&self, name: &str) -> String {
        self.properties.get_with_default(name, "")
    }

    /// Every property whose key starts with `prefix`.
    pub fn get_properties_for_prefix(&self, prefix: &str) -> BTreeMap<String, String> {
        self.properties.properties_for_prefix(prefix)
    }
}

impl Servant for PropertiesAdmin {
    fn interface_id(&self) -> &str {
        Self::INTERFACE_ID
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Process control for remote administration.
pub struct ProcessAdmin {
    runtime: Weak<Runtime>,
}

impl ProcessAdmin {
    pub const INTERFACE_ID: &'static str = "::Orb::Process";

    pub fn new(runtime: Weak<Runtime>) -> Self {
        Self { runtime }
    }

    /// Shut down every object adapter of the owning runtime.
    pub fn shutdown(&self) -> Result<()> {
        let runtime = self.runtime.upgrade().ok_or(Error::CommunicatorDestroyed)?;
        runtime.object_adapter_factory()?.shutdown();
        Ok(())
    }

    /// Write `message` followed by a newline to stdout (`fd == 1`) or
    /// stderr (`fd == 2`). Other descriptors are ignored.
    pub fn write_message(&self, message: &str, fd: i32) -> Result<()> {
        match fd {
            1 => {
                let mut out = std::io::stdout().lock();
                writeln!(out, "{}", message)?;
                out.flush()?;
            }
            2 => {
                let mut err = std::io::stderr().lock();
                writeln!(err, "{}", message)?;
            }
            _ => log::debug!("[admin] write_message to unsupported fd {}", fd),
        }
        Ok(())
    }
}

impl Servant for ProcessAdmin {
    fn interface_id(&self) -> &str {
        Self::INTERFACE_ID
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties_admin() {
        let props = Arc::new(Properties::new());
        props.set("Demo.Endpoints", "tcp -p 0");
        props.set("Demo.AdapterId", "demo");
        props.set("Other.Key", "x");

        let admin = PropertiesAdmin::new(Arc::clone(&props));
        assert_eq!(admin.interface_id(), "::Orb::PropertiesAdmin");
        assert_eq!(admin.get_property("Demo.AdapterId"), "demo");
        assert_eq!(admin.get_property("Missing"), "");

        let demo = admin.get_properties_for_prefix("Demo.");
        assert_eq!(demo.len(), 2);
        assert_eq!(demo.get("Demo.Endpoints").map(String::as_str), Some("tcp -p 0"));
    }

    #[test]
    fn test_process_admin_without_runtime() {
        let admin = ProcessAdmin::new(Weak::new());
        assert!(matches!(admin.shutdown(), Err(Error::CommunicatorDestroyed)));
        admin.write_message("ignored", 7).expect("unsupported fd is a no-op");
    }
}

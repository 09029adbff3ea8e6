// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Plugins: process-wide factories, per-runtime instances.
//!
//! A plugin is configured with `Orb.Plugin.<name>=<factory> [args...]`, where
//! `<factory>` names a factory registered with [`register_plugin_factory`].
//! Plugins listed in `Orb.PluginLoadOrder` load first, in that order; the
//! rest load sorted by name. Command-line options `--<name>.Key=value` are
//! consumed into the properties before the plugin is created.
//!
//! Plugins are initialized once, in load order, during runtime setup (unless
//! `Orb.InitPlugins=0`) and destroyed in reverse order when the runtime is.

use crate::error::{Error, Result};
use crate::runtime::Runtime;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, Weak};

const PLUGIN_PREFIX: &str = "Orb.Plugin.";

/// Runtime extension.
pub trait Plugin: Send + Sync {
    /// Called once after every plugin of the runtime has been created.
    fn initialize(&self) -> Result<()>;
    /// Called once when the runtime is destroyed, if initialized.
    fn destroy(&self);
}

/// Creates a plugin for a runtime.
pub trait PluginFactory: Send + Sync {
    fn create(
        &self,
        runtime: &Arc<Runtime>,
        name: &str,
        args: &[String],
    ) -> Result<Arc<dyn Plugin>>;
}

struct Registration {
    factory: Arc<dyn PluginFactory>,
    load_on_initialize: bool,
}

static FACTORIES: OnceLock<Mutex<HashMap<String, Registration>>> = OnceLock::new();

fn factories() -> &'static Mutex<HashMap<String, Registration>> {
    FACTORIES.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Register `factory` under `name` for every runtime created afterwards.
///
/// With `load_on_initialize`, a plugin `name` is loaded even when no
/// `Orb.Plugin.<name>` property is set. A later registration replaces an
/// earlier one.
pub fn register_plugin_factory(
    name: &str,
    factory: Arc<dyn PluginFactory>,
    load_on_initialize: bool,
) {
    factories().lock().insert(
        name.to_string(),
        Registration {
            factory,
            load_on_initialize,
        },
    );
}

fn find_factory(name: &str) -> Option<Arc<dyn PluginFactory>> {
    factories().lock().get(name).map(|r| Arc::clone(&r.factory))
}

#[derive(Default)]
struct State {
    plugins: Vec<(String, Arc<dyn Plugin>)>,
    initialized: bool,
    destroyed: bool,
}

/// Plugins of one runtime, in load order.
pub struct PluginManager {
    runtime: Weak<Runtime>,
    state: Mutex<State>,
}

impl PluginManager {
    pub fn new(runtime: Weak<Runtime>) -> Self {
        Self {
            runtime,
            state: Mutex::new(State::default()),
        }
    }

    fn check(&self, state: &State) -> Result<()> {
        if state.destroyed {
            Err(Error::CommunicatorDestroyed)
        } else {
            Ok(())
        }
    }

    /// Create every configured plugin. `args` loses the options consumed
    /// for plugin properties.
    pub fn load_plugins(&self, args: &mut Vec<String>) -> Result<()> {
        let runtime = self.runtime.upgrade().ok_or(Error::CommunicatorDestroyed)?;
        let props = runtime.properties();

        let mut entries: HashMap<String, String> = props
            .properties_for_prefix(PLUGIN_PREFIX)
            .into_iter()
            .filter_map(|(key, value)| {
                let name = key.strip_prefix(PLUGIN_PREFIX)?;
                if name.is_empty() || name.contains('.') {
                    log::debug!("[plugin] ignoring property `{}'", key);
                    return None;
                }
                Some((name.to_string(), value))
            })
            .collect();
        for (name, registration) in factories().lock().iter() {
            if registration.load_on_initialize && !entries.contains_key(name) {
                entries.insert(name.clone(), name.clone());
            }
        }

        for name in props.get_as_list("Orb.PluginLoadOrder") {
            if self.has_plugin(&name) {
                return Err(Error::Plugin(format!("plugin `{}' already loaded", name)));
            }
            let value = entries
                .remove(&name)
                .ok_or_else(|| Error::Plugin(format!("plugin `{}' not defined", name)))?;
            self.load_plugin(&runtime, &name, &value, args)?;
        }

        let mut rest: Vec<(String, String)> = entries.into_iter().collect();
        rest.sort();
        for (name, value) in rest {
            self.load_plugin(&runtime, &name, &value, args)?;
        }
        Ok(())
    }

    fn load_plugin(
        &self,
        runtime: &Arc<Runtime>,
        name: &str,
        value: &str,
        args: &mut Vec<String>,
    ) -> Result<()> {
        let mut tokens = value.split_whitespace();
        let factory_name = tokens
            .next()
            .ok_or_else(|| Error::Plugin(format!("plugin `{}': missing factory name", name)))?;
        let plugin_args: Vec<String> = tokens.map(str::to_string).collect();

        *args = runtime.properties().parse_command_line(name, args);

        let factory = find_factory(factory_name).ok_or_else(|| {
            Error::Plugin(format!(
                "plugin `{}': no factory registered as `{}'",
                name, factory_name
            ))
        })?;
        let plugin = factory.create(runtime, name, &plugin_args)?;
        self.add_plugin(name, plugin)?;
        log::debug!("[plugin] loaded `{}' from factory `{}'", name, factory_name);
        Ok(())
    }

    /// Initialize every plugin in load order. A failure destroys the
    /// plugins initialized so far, in reverse order.
    pub fn initialize_plugins(&self) -> Result<()> {
        let plugins = {
            let mut state = self.state.lock();
            self.check(&state)?;
            if state.initialized {
                return Err(Error::Plugin("plugins already initialized".to_string()));
            }
            state.initialized = true;
            state.plugins.clone()
        };

        for (i, (name, plugin)) in plugins.iter().enumerate() {
            if let Err(e) = plugin.initialize() {
                for (done_name, done) in plugins[..i].iter().rev() {
                    log::debug!("[plugin] destroying `{}' after failed initialization", done_name);
                    done.destroy();
                }
                self.state.lock().initialized = false;
                return Err(Error::Plugin(format!(
                    "plugin `{}' initialization failed: {}",
                    name, e
                )));
            }
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    pub fn get_plugin(&self, name: &str) -> Result<Arc<dyn Plugin>> {
        let state = self.state.lock();
        self.check(&state)?;
        state
            .plugins
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| Arc::clone(p))
            .ok_or_else(|| Error::not_registered("plugin", name))
    }

    /// Install an already created plugin.
    pub fn add_plugin(&self, name: &str, plugin: Arc<dyn Plugin>) -> Result<()> {
        let mut state = self.state.lock();
        self.check(&state)?;
        if state.plugins.iter().any(|(n, _)| n == name) {
            return Err(Error::already_registered("plugin", name));
        }
        state.plugins.push((name.to_string(), plugin));
        Ok(())
    }

    /// Plugin names in load order.
    pub fn plugin_names(&self) -> Vec<String> {
        self.state
            .lock()
            .plugins
            .iter()
            .map(|(n, _)| n.clone())
            .collect()
    }

    fn has_plugin(&self, name: &str) -> bool {
        self.state.lock().plugins.iter().any(|(n, _)| n == name)
    }

    /// Destroy initialized plugins in reverse load order and drop them all.
    pub fn destroy(&self) {
        let (plugins, initialized) = {
            let mut state = self.state.lock();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            (std::mem::take(&mut state.plugins), state.initialized)
        };
        if initialized {
            for (name, plugin) in plugins.iter().rev() {
                log::debug!("[plugin] destroying `{}'", name);
                plugin.destroy();
            }
        }
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests panic on failure

//! Plugin loading through runtime setup
//!
//! Factories are process-wide, so every test registers its own factory name
//! and records events into its own journal.

use orbcore::{
    register_plugin_factory, Communicator, Error, InitializationData, Plugin, PluginFactory,
    Properties, Runtime,
};
use parking_lot::Mutex;
use std::sync::Arc;

type Journal = Arc<Mutex<Vec<String>>>;

struct Recorder {
    name: String,
    journal: Journal,
    fail_init: bool,
}

impl Plugin for Recorder {
    fn initialize(&self) -> orbcore::Result<()> {
        self.journal.lock().push(format!("init {}", self.name));
        if self.fail_init {
            return Err(Error::Plugin(format!("{} refuses", self.name)));
        }
        Ok(())
    }

    fn destroy(&self) {
        self.journal.lock().push(format!("destroy {}", self.name));
    }
}

struct RecorderFactory {
    journal: Journal,
}

impl PluginFactory for RecorderFactory {
    fn create(
        &self,
        runtime: &Arc<Runtime>,
        name: &str,
        args: &[String],
    ) -> orbcore::Result<Arc<dyn Plugin>> {
        let option = runtime
            .properties()
            .get_with_default(&format!("{}.Option", name), "-");
        self.journal
            .lock()
            .push(format!("create {} [{}] {}", name, args.join(","), option));
        Ok(Arc::new(Recorder {
            name: name.to_string(),
            journal: Arc::clone(&self.journal),
            fail_init: args.iter().any(|a| a == "--fail"),
        }))
    }
}

fn journal_factory(factory_name: &str, load_on_initialize: bool) -> Journal {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    register_plugin_factory(
        factory_name,
        Arc::new(RecorderFactory {
            journal: Arc::clone(&journal),
        }),
        load_on_initialize,
    );
    journal
}

fn init(props: &[(&str, &str)]) -> InitializationData {
    let properties = Arc::new(Properties::new());
    for (k, v) in props {
        properties.set(k, v);
    }
    InitializationData {
        properties: Some(properties),
        ..Default::default()
    }
}

#[test]
fn test_load_order_then_sorted() {
    let journal = journal_factory("ordered-recorder", false);
    let mut args = vec![
        "app".to_string(),
        "--Beta.Option=on".to_string(),
        "rest".to_string(),
    ];
    let communicator = Communicator::initialize_with_args(
        &mut args,
        init(&[
            ("Orb.Plugin.Gamma", "ordered-recorder"),
            ("Orb.Plugin.Alpha", "ordered-recorder a1 a2"),
            ("Orb.Plugin.Beta", "ordered-recorder"),
            ("Orb.Plugin.Beta.Ignored", "x"),
            ("Orb.PluginLoadOrder", "Gamma"),
        ]),
    )
    .expect("initialize");

    assert_eq!(args, vec!["app", "rest"]);
    let manager = communicator.plugin_manager().expect("manager");
    let names: Vec<String> = manager
        .plugin_names()
        .into_iter()
        .filter(|n| n != "AutoLoaded")
        .collect();
    assert_eq!(names, vec!["Gamma", "Alpha", "Beta"]);
    assert!(manager.is_initialized());
    assert!(matches!(
        manager.initialize_plugins(),
        Err(Error::Plugin(_))
    ));

    communicator.destroy();
    assert_eq!(
        *journal.lock(),
        vec![
            "create Gamma [] -",
            "create Alpha [a1,a2] -",
            "create Beta [] on",
            "init Gamma",
            "init Alpha",
            "init Beta",
            "destroy Beta",
            "destroy Alpha",
            "destroy Gamma",
        ]
    );
}

#[test]
fn test_deferred_initialization() {
    let journal = journal_factory("deferred-recorder", false);
    let communicator = Communicator::initialize(init(&[
        ("Orb.Plugin.Late", "deferred-recorder"),
        ("Orb.InitPlugins", "0"),
    ]))
    .expect("initialize");

    let manager = communicator.plugin_manager().expect("manager");
    assert!(!manager.is_initialized());
    manager.get_plugin("Late").expect("plugin loaded");
    manager.initialize_plugins().expect("initialize");
    assert!(manager.is_initialized());

    communicator.destroy();
    assert_eq!(
        *journal.lock(),
        vec!["create Late [] -", "init Late", "destroy Late"]
    );
}

#[test]
fn test_failed_initialization_aborts_setup() {
    let journal = journal_factory("failing-recorder", false);
    let err = Communicator::initialize(init(&[
        ("Orb.Plugin.A", "failing-recorder"),
        ("Orb.Plugin.B", "failing-recorder --fail"),
    ]))
    .expect_err("B fails");
    assert!(matches!(err, Error::Plugin(_)));
    assert_eq!(
        *journal.lock(),
        vec![
            "create A [] -",
            "create B [--fail] -",
            "init A",
            "init B",
            "destroy A",
        ]
    );
}

#[test]
fn test_configuration_errors() {
    let err = Communicator::initialize(init(&[("Orb.Plugin.X", "no-such-factory")]))
        .expect_err("unknown factory");
    assert!(matches!(err, Error::Plugin(_)));

    journal_factory("listed-recorder", false);
    let err = Communicator::initialize(init(&[
        ("Orb.Plugin.Known", "listed-recorder"),
        ("Orb.PluginLoadOrder", "Unknown"),
    ]))
    .expect_err("load order names a missing plugin");
    assert!(matches!(err, Error::Plugin(_)));
}

#[test]
fn test_load_on_initialize_factory() {
    // registered under its own plugin name; every later runtime in this
    // binary loads it, which the other tests tolerate
    let journal = journal_factory("AutoLoaded", true);
    let communicator = Communicator::initialize(init(&[])).expect("initialize");
    let manager = communicator.plugin_manager().expect("manager");
    assert!(manager.plugin_names().contains(&"AutoLoaded".to_string()));
    communicator.destroy();
    let events = journal.lock().clone();
    assert!(events.contains(&"create AutoLoaded [] -".to_string()));
    assert!(events.contains(&"destroy AutoLoaded".to_string()));
}

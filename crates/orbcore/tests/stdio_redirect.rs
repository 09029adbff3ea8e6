// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::missing_panics_doc)] // Tests panic on failure

//! `Orb.StdOut` / `Orb.StdErr` redirection
//!
//! Redirection is process-wide, so this binary holds a single test.

use orbcore::{Communicator, InitializationData, Properties};
use std::io::Write;
use std::sync::Arc;

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

#[cfg(unix)]
#[test]
fn test_first_runtime_redirects_stdio() {
    let dir = tempfile::tempdir().expect("tempdir");
    let first = dir.path().join("first.log");
    let second = dir.path().join("second.log");
    let first_path = first.to_str().expect("utf-8 path");
    let second_path = second.to_str().expect("utf-8 path");

    {
        // buffered (no newline yet); must be flushed before the redirect
        let mut out = std::io::stdout().lock();
        out.write_all(b"before redirect").expect("write");
    }

    // the same path for both streams shares one file
    let communicator = Communicator::initialize(init(&[
        ("Orb.StdOut", first_path),
        ("Orb.StdErr", first_path),
    ]))
    .expect("initialize");
    {
        let mut out = std::io::stdout().lock();
        out.write_all(b"stdout line\n").expect("write");
        out.flush().expect("flush");
    }
    {
        let mut err = std::io::stderr().lock();
        err.write_all(b"stderr line\n").expect("write");
        err.flush().expect("flush");
    }

    // later runtimes keep the process-wide redirection
    let other = Communicator::initialize(init(&[
        ("Orb.StdOut", second_path),
        ("Orb.StdErr", second_path),
    ]))
    .expect("initialize second");
    assert!(!second.exists());

    other.destroy();
    communicator.destroy();

    let captured = std::fs::read_to_string(&first).expect("read redirected output");
    assert!(captured.contains("stdout line"), "{}", captured);
    assert!(captured.contains("stderr line"), "{}", captured);
    assert!(!captured.contains("before redirect"), "{}", captured);
}

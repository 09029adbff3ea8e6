// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Router proxies known to the runtime.

use crate::core::Identity;
use crate::proxy::ObjectPrx;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// A router proxy and the object adapter bound to it, if any.
#[derive(Debug)]
pub struct RouterInfo {
    router: ObjectPrx,
    adapter: Mutex<Option<String>>,
}

impl RouterInfo {
    pub fn router(&self) -> &ObjectPrx {
        &self.router
    }

    /// Name of the adapter that receives callbacks through this router.
    pub fn adapter(&self) -> Option<String> {
        self.adapter.lock().clone()
    }

    pub fn set_adapter(&self, name: Option<String>) {
        *self.adapter.lock() = name;
    }

    fn destroy(&self) {
        self.adapter.lock().take();
    }
}

/// One [`RouterInfo`] per router identity.
#[derive(Default)]
pub struct RouterManager {
    table: Mutex<HashMap<Identity, Arc<RouterInfo>>>,
}

impl RouterManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared info for `router`.
    pub fn get(&self, router: &ObjectPrx) -> Arc<RouterInfo> {
        let mut table = self.table.lock();
        Arc::clone(
            table
                .entry(router.identity().clone())
                .or_insert_with(|| {
                    Arc::new(RouterInfo {
                        router: router.clone(),
                        adapter: Mutex::new(None),
                    })
                }),
        )
    }

    /// Drop the info for `router`, returning it.
    pub fn erase(&self, router: &ObjectPrx) -> Option<Arc<RouterInfo>> {
        self.table.lock().remove(router.identity())
    }

    pub fn destroy(&self) {
        let mut table = self.table.lock();
        for info in table.values() {
            info.destroy();
        }
        table.clear();
    }
}

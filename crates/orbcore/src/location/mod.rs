// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Locator and router managers.
//!
//! The runtime does not talk to remote locators itself: applications (or
//! plugins) bind a local [`Locator`] implementation to a locator identity
//! with [`LocatorManager::register_locator`]. Every proxy whose locator has
//! that identity then resolves adapter ids through it.

mod locator;
mod router;

pub use locator::{Locator, LocatorInfo, LocatorManager, LocatorRegistry, RegistryError};
pub use router::{RouterInfo, RouterManager};

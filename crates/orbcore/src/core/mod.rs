// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Core value types shared by every layer: identities, implicit context and
//! runtime thread spawning.

pub mod identity;
pub mod implicit_context;
pub mod thread;

pub use identity::{generate_uuid, Identity};
pub use implicit_context::{Context, ImplicitContext};
pub use thread::{ThreadNotification, ThreadOptions, ThreadPriority};

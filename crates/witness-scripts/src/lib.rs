// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted message catalog and the selector that picks which script to send.

pub mod catalog;
pub mod selector;

pub use catalog::ScriptCatalog;
pub use selector::{ScriptSelector, SelectorPolicy};

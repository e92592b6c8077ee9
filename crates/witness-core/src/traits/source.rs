// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post source trait for the platform's search API.

use async_trait::async_trait;

use crate::traits::adapter::PluginAdapter;
use crate::types::{Fetch, RawPost};

/// Adapter returning posts that match a topic query, one page at a time.
#[async_trait]
pub trait PostSource: PluginAdapter {
    /// Fetches the page after `cursor` (the first page when `None`).
    async fn search(&self, query: &str, cursor: Option<&str>) -> Fetch<RawPost>;
}

// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classifier adapter trait for scoring post text.

use async_trait::async_trait;

use crate::error::WitnessError;
use crate::traits::adapter::PluginAdapter;
use crate::types::Ranking;

/// Adapter for the use-of-force ranking model.
#[async_trait]
pub trait ClassifierAdapter: PluginAdapter {
    /// Ranks `text`, returning a label and confidence.
    async fn rank(&self, text: &str) -> Result<Ranking, WitnessError>;
}

// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Explore/exploit script selection.
//!
//! Every active script keeps a nonzero weight. Success rates are smoothed
//! toward a prior so an unused script competes as an average one rather than
//! as a failure, and a floor keeps poor performers in rotation.

use std::sync::Mutex;

use rand::SeedableRng;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use tracing::debug;
use witness_config::model::SelectorConfig;
use witness_core::{ConversationNode, Script, WitnessError};

use crate::catalog::ScriptCatalog;

/// Weighting parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectorPolicy {
    pub prior_rate: f64,
    pub prior_weight: f64,
    pub exploration_floor: f64,
}

impl SelectorPolicy {
    pub fn from_config(config: &SelectorConfig) -> Self {
        Self {
            prior_rate: config.prior_rate,
            prior_weight: config.prior_weight,
            exploration_floor: config.exploration_floor,
        }
    }

    /// Success rate pulled toward `prior_rate` by `prior_weight` pseudo-uses.
    pub fn smoothed_rate(&self, script: &Script) -> f64 {
        let uses = script.use_count as f64;
        let positives = script.positive_count.min(script.use_count) as f64;
        let denominator = uses + self.prior_weight;
        if denominator <= 0.0 {
            return self.prior_rate;
        }
        ((positives + self.prior_weight * self.prior_rate) / denominator).clamp(0.0, 1.0)
    }

    /// Sampling weight, always at least `exploration_floor`.
    pub fn weight(&self, script: &Script) -> f64 {
        self.exploration_floor + (1.0 - self.exploration_floor) * self.smoothed_rate(script)
    }
}

impl Default for SelectorPolicy {
    fn default() -> Self {
        Self::from_config(&SelectorConfig::default())
    }
}

/// Picks the script to send for a conversation node.
pub struct ScriptSelector {
    catalog: ScriptCatalog,
    policy: SelectorPolicy,
    rng: Mutex<StdRng>,
}

impl ScriptSelector {
    /// Seeded when `config.seed` is set, from OS entropy otherwise.
    pub fn new(catalog: ScriptCatalog, config: &SelectorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            catalog,
            policy: SelectorPolicy::from_config(config),
            rng: Mutex::new(rng),
        }
    }

    pub fn policy(&self) -> &SelectorPolicy {
        &self.policy
    }

    pub fn catalog(&self) -> &ScriptCatalog {
        &self.catalog
    }

    /// Index of the sampled candidate, `None` when there are none.
    pub fn choose(&self, candidates: &[Script]) -> Option<usize> {
        if candidates.is_empty() {
            return None;
        }
        let weights: Vec<f64> = candidates.iter().map(|s| self.policy.weight(s)).collect();
        let dist = match WeightedIndex::new(&weights) {
            Ok(dist) => dist,
            // All-zero weights only happen with a zero floor and zero prior.
            Err(_) => return Some(0),
        };
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Some(dist.sample(&mut *rng))
    }

    /// Selects an active script for `node` and records one use of it.
    ///
    /// The returned script carries the incremented use count.
    pub async fn select(&self, node: ConversationNode) -> Result<Script, WitnessError> {
        let mut candidates = self.catalog.list_active(node).await?;
        let index = self
            .choose(&candidates)
            .ok_or(WitnessError::NoActiveScript { node })?;
        let mut script = candidates.swap_remove(index);
        self.catalog.record_use(&script.id).await?;
        script.use_count += 1;
        debug!(
            node = %node,
            script_id = %script.id,
            candidates = candidates.len() + 1,
            "script selected"
        );
        Ok(script)
    }
}

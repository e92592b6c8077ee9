// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Topic queries handed to the post source.

use std::sync::Mutex;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use witness_config::model::IngestConfig;

/// Keywords and hashtags searched when no topics are configured.
pub const CURATED_TOPICS: &[&str] = &[
    "police",
    "pigs",
    "cops",
    "ACAB",
    "arrested",
    "police brutality",
    "police violence",
    "police abuse",
    "beaten",
    "killed by police",
    "taser",
    "baton",
    "use of force",
    "shot",
    "lethal",
    "non-lethal",
    "pepper spray",
    "oc",
    "tear gas",
    "rubber bullets",
    "push",
    "non-violent",
    "tased",
    "clashed with police",
    "#policebrutality",
    "#pig",
    "#pigs",
    "#5-0",
    "#policeofficer",
    "#ACAB",
    "#1312",
    "#fuckthepolice",
    "#BlackLivesMatter",
    "#policeaccountability",
];

/// Uniform choice over the topic set.
pub struct TopicPicker {
    topics: Vec<String>,
    rng: Mutex<StdRng>,
}

impl TopicPicker {
    pub fn new(config: &IngestConfig) -> Self {
        let topics = if config.topics.is_empty() {
            CURATED_TOPICS.iter().map(|t| t.to_string()).collect()
        } else {
            config.topics.clone()
        };
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            topics,
            rng: Mutex::new(rng),
        }
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn pick(&self) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.topics
            .choose(&mut *rng)
            .cloned()
            .unwrap_or_else(|| CURATED_TOPICS[0].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(topics: &[&str], seed: Option<u64>) -> IngestConfig {
        IngestConfig {
            topics: topics.iter().map(|t| t.to_string()).collect(),
            seed,
            ..IngestConfig::default()
        }
    }

    #[test]
    fn empty_config_uses_curated_list() {
        let picker = TopicPicker::new(&config(&[], Some(1)));
        assert_eq!(picker.topics().len(), CURATED_TOPICS.len());
        assert!(CURATED_TOPICS.contains(&picker.pick().as_str()));
    }

    #[test]
    fn configured_topics_replace_curated() {
        let picker = TopicPicker::new(&config(&["kettling"], None));
        assert_eq!(picker.pick(), "kettling");
    }

    #[test]
    fn seeded_picks_repeat() {
        let a = TopicPicker::new(&config(&[], Some(11)));
        let b = TopicPicker::new(&config(&[], Some(11)));
        let first: Vec<_> = (0..20).map(|_| a.pick()).collect();
        let second: Vec<_> = (0..20).map(|_| b.pick()).collect();
        assert_eq!(first, second);
    }
}

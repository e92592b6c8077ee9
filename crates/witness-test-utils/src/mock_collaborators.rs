// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock ranking model, geocoder and post source.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use witness_core::types::{GeocodeResult, GeocodeStatus, RawPost, Ranking};
use witness_core::{
    AdapterType, ClassifierAdapter, Fetch, ForceRank, GeocoderAdapter, HealthStatus,
    PluginAdapter, PostSource, WitnessError,
};

macro_rules! mock_adapter {
    ($ty:ty, $name:literal, $kind:expr) => {
        #[async_trait]
        impl PluginAdapter for $ty {
            fn name(&self) -> &str {
                $name
            }

            fn version(&self) -> semver::Version {
                semver::Version::new(0, 1, 0)
            }

            fn adapter_type(&self) -> AdapterType {
                $kind
            }

            async fn health_check(&self) -> Result<HealthStatus, WitnessError> {
                Ok(HealthStatus::Healthy)
            }

            async fn shutdown(&self) -> Result<(), WitnessError> {
                Ok(())
            }
        }
    };
}

// --- Classifier ---

/// Ranks every text with a fixed label unless told otherwise.
pub struct MockClassifier {
    default: Ranking,
    overrides: Mutex<HashMap<String, Ranking>>,
    failing: Mutex<HashSet<String>>,
    calls: AtomicUsize,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self::with_default(Ranking {
            label: ForceRank::EmptyHand,
            confidence: 0.8,
        })
    }

    pub fn with_default(default: Ranking) -> Self {
        Self {
            default,
            overrides: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Ranks exactly `text` as `ranking`.
    pub async fn set_ranking(&self, text: &str, ranking: Ranking) {
        self.overrides.lock().await.insert(text.to_string(), ranking);
    }

    /// Ranking `text` fails with an upstream error.
    pub async fn fail_on(&self, text: &str) {
        self.failing.lock().await.insert(text.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::new()
    }
}

mock_adapter!(MockClassifier, "mock-classifier", AdapterType::Classifier);

#[async_trait]
impl ClassifierAdapter for MockClassifier {
    async fn rank(&self, text: &str) -> Result<Ranking, WitnessError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().await.contains(text) {
            return Err(WitnessError::upstream("mock classifier failure"));
        }
        Ok(self
            .overrides
            .lock()
            .await
            .get(text)
            .copied()
            .unwrap_or(self.default))
    }
}

// --- Geocoder ---

/// Resolves only the locations it was taught.
#[derive(Default)]
pub struct MockGeocoder {
    known: Mutex<HashMap<String, GeocodeResult>>,
    lookups: Mutex<Vec<String>>,
}

impl MockGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `location` resolves to the given place.
    pub async fn add_location(&self, location: &str, city: &str, region: &str, lat: f64, long: f64) {
        self.known.lock().await.insert(
            location.to_string(),
            GeocodeResult {
                status: GeocodeStatus::Ok,
                city: Some(city.to_string()),
                region: Some(region.to_string()),
                lat: Some(lat),
                long: Some(long),
            },
        );
    }

    pub async fn lookups(&self) -> Vec<String> {
        self.lookups.lock().await.clone()
    }
}

mock_adapter!(MockGeocoder, "mock-geocoder", AdapterType::Geocoder);

#[async_trait]
impl GeocoderAdapter for MockGeocoder {
    async fn resolve(&self, location: &str) -> Result<GeocodeResult, WitnessError> {
        self.lookups.lock().await.push(location.to_string());
        Ok(self
            .known
            .lock()
            .await
            .get(location)
            .cloned()
            .unwrap_or_else(|| GeocodeResult::unresolved(GeocodeStatus::ZeroResults)))
    }
}

// --- Post source ---

/// Replays scripted search outcomes in order, then reports end-of-stream.
#[derive(Default)]
pub struct MockPostSource {
    outcomes: Arc<Mutex<VecDeque<Fetch<RawPost>>>>,
    queries: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

impl MockPostSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a page. When `more` is set the page carries a next cursor.
    pub async fn push_page(&self, posts: Vec<RawPost>, more: bool) {
        let mut outcomes = self.outcomes.lock().await;
        let next_cursor = more.then(|| format!("cursor-{}", outcomes.len() + 1));
        outcomes.push_back(Fetch::Page {
            items: posts,
            next_cursor,
        });
    }

    /// Queues an arbitrary outcome, e.g. `Fetch::RateLimited`.
    pub async fn push_outcome(&self, outcome: Fetch<RawPost>) {
        self.outcomes.lock().await.push_back(outcome);
    }

    /// Every `(query, cursor)` searched so far.
    pub async fn queries(&self) -> Vec<(String, Option<String>)> {
        self.queries.lock().await.clone()
    }
}

/// A post by `author` with the given id and text.
pub fn raw_post(id: &str, author: &str, text: &str) -> RawPost {
    RawPost {
        id: id.to_string(),
        author: author.to_string(),
        text: text.to_string(),
        posted_at: Some(chrono::Utc::now()),
    }
}

mock_adapter!(MockPostSource, "mock-post-source", AdapterType::PostSource);

#[async_trait]
impl PostSource for MockPostSource {
    async fn search(&self, query: &str, cursor: Option<&str>) -> Fetch<RawPost> {
        self.queries
            .lock()
            .await
            .push((query.to_string(), cursor.map(str::to_string)));
        self.outcomes
            .lock()
            .await
            .pop_front()
            .unwrap_or(Fetch::EndOfStream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn classifier_uses_overrides_and_failures() {
        let classifier = MockClassifier::new();
        classifier
            .set_ranking(
                "shot",
                Ranking {
                    label: ForceRank::LethalForce,
                    confidence: 0.99,
                },
            )
            .await;
        classifier.fail_on("broken").await;

        assert_eq!(classifier.rank("shot").await.unwrap().label, ForceRank::LethalForce);
        assert_eq!(classifier.rank("other").await.unwrap().label, ForceRank::EmptyHand);
        assert!(classifier.rank("broken").await.is_err());
        assert_eq!(classifier.calls(), 3);
    }

    #[tokio::test]
    async fn geocoder_defaults_to_zero_results() {
        let geocoder = MockGeocoder::new();
        geocoder.add_location("Portland,OR", "Portland", "OR", 45.5, -122.6).await;
        assert!(geocoder.resolve("Portland,OR").await.unwrap().is_resolved());
        let miss = geocoder.resolve("Atlantis,XX").await.unwrap();
        assert_eq!(miss.status, GeocodeStatus::ZeroResults);
        assert_eq!(geocoder.lookups().await.len(), 2);
    }

    #[tokio::test]
    async fn post_source_replays_then_ends() {
        let source = MockPostSource::new();
        source.push_page(vec![raw_post("1", "a", "x")], true).await;
        assert!(matches!(
            source.search("police", None).await,
            Fetch::Page { next_cursor: Some(_), .. }
        ));
        assert_eq!(source.search("police", Some("cursor-1")).await, Fetch::EndOfStream);
        assert_eq!(source.queries().await[1].1.as_deref(), Some("cursor-1"));
    }
}

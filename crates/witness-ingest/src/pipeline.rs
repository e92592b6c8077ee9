// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fetch, deduplicate, score, persist.
//!
//! Stages run strictly in that order. Upstream trouble while fetching
//! truncates the fetch and the pipeline continues with what it has; a
//! scoring failure drops only the affected post.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use strum::Display;
use tracing::{debug, info, warn};
use witness_config::model::IngestConfig;
use witness_core::types::RawPost;
use witness_core::{
    CandidatePost, ClassifierAdapter, Fetch, InsertOutcome, PostSource, StorageAdapter,
    WitnessError,
};

use crate::topics::TopicPicker;

/// Why a fetch stopped before the source ran dry.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Truncation {
    RateLimited { retry_after: Option<Duration> },
    ApiError(String),
    PageLimit,
    PostLimit,
}

/// Counts from one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub topic: Option<String>,
    pub fetched: usize,
    /// Dropped as already seen in the batch or in storage.
    pub duplicates: usize,
    pub scored: usize,
    pub scoring_failures: usize,
    pub inserted: usize,
    pub truncated: Option<Truncation>,
}

/// The ingestion pipeline over its three collaborators.
pub struct IngestionPipeline {
    storage: Arc<dyn StorageAdapter>,
    source: Arc<dyn PostSource>,
    classifier: Arc<dyn ClassifierAdapter>,
    topics: TopicPicker,
    max_pages: usize,
    max_posts: usize,
}

impl IngestionPipeline {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        source: Arc<dyn PostSource>,
        classifier: Arc<dyn ClassifierAdapter>,
        config: &IngestConfig,
    ) -> Self {
        Self {
            storage,
            source,
            classifier,
            topics: TopicPicker::new(config),
            max_pages: config.max_pages.max(1),
            max_posts: config.max_posts.max(1),
        }
    }

    /// One full run on a randomly chosen topic.
    pub async fn run_once(&self) -> Result<IngestReport, WitnessError> {
        let topic = self.topics.pick();
        self.run_topic(&topic).await
    }

    /// One full run on `topic`.
    pub async fn run_topic(&self, topic: &str) -> Result<IngestReport, WitnessError> {
        let (posts, truncated) = self.fetch(topic).await;
        let mut report = self.persist(posts, Some(topic)).await?;
        report.truncated = truncated;
        info!(
            topic,
            fetched = report.fetched,
            duplicates = report.duplicates,
            scoring_failures = report.scoring_failures,
            inserted = report.inserted,
            truncated = ?report.truncated,
            "ingestion finished"
        );
        Ok(report)
    }

    /// Dedupe, score and persist an externally supplied batch.
    pub async fn ingest_batch(&self, posts: Vec<RawPost>) -> Result<IngestReport, WitnessError> {
        self.persist(posts, None).await
    }

    async fn fetch(&self, topic: &str) -> (Vec<RawPost>, Option<Truncation>) {
        let mut posts = Vec::new();
        let mut cursor: Option<String> = None;

        for page in 0..self.max_pages {
            match self.source.search(topic, cursor.as_deref()).await {
                Fetch::Page { items, next_cursor } => {
                    debug!(topic, page, items = items.len(), "page fetched");
                    posts.extend(items);
                    if posts.len() > self.max_posts {
                        posts.truncate(self.max_posts);
                        return (posts, Some(Truncation::PostLimit));
                    }
                    match next_cursor {
                        None => return (posts, None),
                        Some(_) if posts.len() == self.max_posts => {
                            return (posts, Some(Truncation::PostLimit));
                        }
                        next => cursor = next,
                    }
                }
                Fetch::EndOfStream => return (posts, None),
                Fetch::RateLimited { retry_after } => {
                    warn!(topic, page, ?retry_after, kept = posts.len(), "search rate limited, keeping partial results");
                    return (posts, Some(Truncation::RateLimited { retry_after }));
                }
                Fetch::ApiError(message) => {
                    warn!(topic, page, error = %message, kept = posts.len(), "search failed, keeping partial results");
                    return (posts, Some(Truncation::ApiError(message)));
                }
            }
        }
        (posts, Some(Truncation::PageLimit))
    }

    async fn persist(
        &self,
        posts: Vec<RawPost>,
        topic: Option<&str>,
    ) -> Result<IngestReport, WitnessError> {
        let mut report = IngestReport {
            topic: topic.map(str::to_string),
            fetched: posts.len(),
            ..IngestReport::default()
        };

        let unique = dedupe_batch(posts);
        report.duplicates = report.fetched - unique.len();

        let ids: Vec<String> = unique.iter().map(|p| p.id.clone()).collect();
        let stored = self.storage.existing_post_ids(&ids).await?;
        let fresh: Vec<RawPost> = unique
            .into_iter()
            .filter(|p| !stored.contains(&p.id))
            .collect();
        report.duplicates += stored.len();

        let mut scored = Vec::with_capacity(fresh.len());
        for raw in fresh {
            match self.classifier.rank(&raw.text).await {
                Ok(ranking) => {
                    scored.push(CandidatePost::from_raw(raw, ranking, report.topic.clone()));
                }
                Err(e) => {
                    warn!(post_id = %raw.id, error = %e, "scoring failed, post skipped");
                    report.scoring_failures += 1;
                }
            }
        }
        report.scored = scored.len();

        for post in &scored {
            match self.storage.insert_post(post).await? {
                InsertOutcome::Inserted => report.inserted += 1,
                InsertOutcome::Duplicate => report.duplicates += 1,
            }
        }
        Ok(report)
    }
}

/// Keeps the first occurrence of each post id.
pub fn dedupe_batch(posts: Vec<RawPost>) -> Vec<RawPost> {
    let mut seen = HashSet::with_capacity(posts.len());
    posts
        .into_iter()
        .filter(|p| seen.insert(p.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use witness_test_utils::{TestHarness, raw_post};

    use super::*;

    fn pipeline(harness: &TestHarness) -> IngestionPipeline {
        IngestionPipeline::new(
            harness.storage.clone(),
            harness.source.clone(),
            harness.classifier.clone(),
            &harness.config.ingest,
        )
    }

    #[test]
    fn dedupe_keeps_first_of_each_id() {
        let out = dedupe_batch(vec![
            raw_post("123", "a", "first"),
            raw_post("123", "b", "second"),
            raw_post("456", "c", "third"),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].text, "first");
        assert_eq!(out[1].id, "456");
    }

    #[tokio::test]
    async fn duplicate_ids_in_batch_stored_once() {
        let harness = TestHarness::builder().build().await.unwrap();
        let pipeline = pipeline(&harness);

        let report = pipeline
            .ingest_batch(vec![
                raw_post("123", "a", "x"),
                raw_post("123", "a", "x"),
                raw_post("456", "b", "y"),
            ])
            .await
            .unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(report.duplicates, 1);
        let stored = harness.storage.list_posts(None, None).await.unwrap();
        let ids: HashSet<_> = stored.into_iter().map(|p| p.id).collect();
        assert_eq!(ids, HashSet::from(["123".to_string(), "456".to_string()]));
    }

    #[tokio::test]
    async fn reingesting_is_a_no_op() {
        let harness = TestHarness::builder().build().await.unwrap();
        let pipeline = pipeline(&harness);
        let batch = vec![raw_post("1", "a", "x"), raw_post("2", "b", "y")];

        pipeline.ingest_batch(batch.clone()).await.unwrap();
        let report = pipeline.ingest_batch(batch).await.unwrap();
        assert_eq!(report.inserted, 0);
        assert_eq!(report.duplicates, 2);
        assert_eq!(harness.classifier.calls(), 2);
    }

    #[tokio::test]
    async fn scoring_failure_skips_one_post() {
        let harness = TestHarness::builder().build().await.unwrap();
        harness.classifier.fail_on("bad").await;
        let pipeline = pipeline(&harness);

        let report = pipeline
            .ingest_batch(vec![raw_post("1", "a", "bad"), raw_post("2", "b", "good")])
            .await
            .unwrap();
        assert_eq!(report.scoring_failures, 1);
        assert_eq!(report.inserted, 1);
        assert!(harness.storage.get_post("1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rate_limit_keeps_earlier_pages() {
        let harness = TestHarness::builder().build().await.unwrap();
        harness
            .source
            .push_page(vec![raw_post("1", "a", "x"), raw_post("2", "b", "y")], true)
            .await;
        harness
            .source
            .push_outcome(Fetch::RateLimited {
                retry_after: Some(Duration::from_secs(900)),
            })
            .await;

        let report = pipeline(&harness).run_topic("tear gas").await.unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(
            report.truncated,
            Some(Truncation::RateLimited {
                retry_after: Some(Duration::from_secs(900))
            })
        );
        let post = harness.storage.get_post("2").await.unwrap().unwrap();
        assert_eq!(post.topic.as_deref(), Some("tear gas"));

        let queries = harness.source.queries().await;
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[1].1.as_deref(), Some("cursor-1"));
    }

    #[tokio::test]
    async fn page_and_post_limits_truncate() {
        let mut config = witness_config::WitnessConfig::default();
        config.ingest.max_pages = 2;
        config.ingest.max_posts = 3;
        config.ingest.seed = Some(3);
        let harness = TestHarness::builder().with_config(config).build().await.unwrap();
        for i in 0..3 {
            harness
                .source
                .push_page(vec![raw_post(&format!("p{i}"), "a", "x")], true)
                .await;
        }
        let report = pipeline(&harness).run_once().await.unwrap();
        assert_eq!(report.fetched, 2);
        assert_eq!(report.truncated, Some(Truncation::PageLimit));

        harness
            .source
            .push_page(
                (0..5).map(|i| raw_post(&format!("q{i}"), "a", "x")).collect(),
                false,
            )
            .await;
        let report = pipeline(&harness).run_once().await.unwrap();
        assert_eq!(report.fetched, 3);
        assert_eq!(report.truncated, Some(Truncation::PostLimit));
    }
}

// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The two production jobs: ingestion and advancement.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use witness_config::model::SchedulerConfig;
use witness_conversation::ConversationEngine;
use witness_core::WitnessError;
use witness_ingest::IngestionPipeline;

use crate::job::ScheduledJob;

/// Lock and job name of the ingestion job.
pub const INGEST_JOB: &str = "db_update";
/// Lock and job name of the advancement job.
pub const ADVANCE_JOB: &str = "advance_all";

/// Runs one ingestion pass per tick.
pub struct IngestJob {
    pipeline: Arc<IngestionPipeline>,
    interval: Duration,
    ttl: Duration,
}

impl IngestJob {
    pub fn new(pipeline: Arc<IngestionPipeline>, config: &SchedulerConfig) -> Self {
        Self {
            pipeline,
            interval: Duration::from_secs(config.ingest_interval_secs),
            ttl: Duration::from_secs(config.ingest_lock_ttl_secs),
        }
    }
}

#[async_trait]
impl ScheduledJob for IngestJob {
    fn name(&self) -> &str {
        INGEST_JOB
    }

    fn lock_ttl(&self) -> Duration {
        self.ttl
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run(&self) -> Result<(), WitnessError> {
        self.pipeline.run_once().await.map(|_| ())
    }
}

/// Advances every open conversation per tick.
pub struct AdvanceJob {
    engine: Arc<ConversationEngine>,
    interval: Duration,
    ttl: Duration,
}

impl AdvanceJob {
    pub fn new(engine: Arc<ConversationEngine>, config: &SchedulerConfig) -> Self {
        Self {
            engine,
            interval: Duration::from_secs(config.advance_interval_secs),
            ttl: Duration::from_secs(config.advance_lock_ttl_secs),
        }
    }
}

#[async_trait]
impl ScheduledJob for AdvanceJob {
    fn name(&self) -> &str {
        ADVANCE_JOB
    }

    fn lock_ttl(&self) -> Duration {
        self.ttl
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run(&self) -> Result<(), WitnessError> {
        self.engine.advance_all().await.map(|_| ())
    }
}

// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Candidate post ingestion: topic search, deduplication, scoring and
//! idempotent persistence.

pub mod pipeline;
pub mod topics;

pub use pipeline::{IngestReport, IngestionPipeline, Truncation, dedupe_batch};
pub use topics::{CURATED_TOPICS, TopicPicker};

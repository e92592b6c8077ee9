// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end runs of the complete outreach flow.
//!
//! Each test builds an isolated TestHarness with temp SQLite and mock
//! collaborators, and drives the jobs through the same lock-guarded tick the
//! scheduler uses.

use std::io::Write;
use std::sync::Arc;

use witness_conversation::ConversationEngine;
use witness_core::types::{CONFIRM_NO, CONFIRM_YES, FormSubmission};
use witness_core::{ApprovalStatus, ConversationNode, ConversationState, ForceRank};
use witness_ingest::IngestionPipeline;
use witness_scheduler::{AdvanceJob, IngestJob, TickOutcome, run_locked};
use witness_scripts::{ScriptCatalog, ScriptSelector};
use witness_test_utils::{SentMessage, TestHarness, raw_post};

struct Bot {
    engine: Arc<ConversationEngine>,
    ingest: IngestJob,
    advance: AdvanceJob,
}

impl Bot {
    fn new(harness: &TestHarness) -> Self {
        let catalog = ScriptCatalog::new(harness.storage.clone());
        let selector = Arc::new(ScriptSelector::new(catalog, &harness.config.selector));
        let engine = Arc::new(ConversationEngine::new(
            harness.storage.clone(),
            harness.messaging.clone(),
            harness.geocoder.clone(),
            selector,
            harness.config.conversation.clone(),
        ));
        let pipeline = Arc::new(IngestionPipeline::new(
            harness.storage.clone(),
            harness.source.clone(),
            harness.classifier.clone(),
            &harness.config.ingest,
        ));
        Self {
            ingest: IngestJob::new(pipeline, &harness.config.scheduler),
            advance: AdvanceJob::new(engine.clone(), &harness.config.scheduler),
            engine,
        }
    }

    async fn tick_ingest(&self, harness: &TestHarness) {
        assert_eq!(
            run_locked(harness.lock.as_ref(), &self.ingest).await,
            TickOutcome::Completed
        );
    }

    async fn tick_advance(&self, harness: &TestHarness) {
        assert_eq!(
            run_locked(harness.lock.as_ref(), &self.advance).await,
            TickOutcome::Completed
        );
    }
}

#[tokio::test]
async fn report_flows_from_search_to_approval() {
    let harness = TestHarness::builder()
        .with_default_scripts()
        .build()
        .await
        .unwrap();
    harness
        .source
        .push_page(vec![raw_post("1", "reporter", "they fired rubber bullets")], false)
        .await;
    harness
        .geocoder
        .add_location("Portland,OR", "Portland", "Oregon", 45.52, -122.68)
        .await;
    let bot = Bot::new(&harness);

    bot.tick_ingest(&harness).await;
    let post = harness.storage.get_post("1").await.unwrap().unwrap();
    assert_eq!(post.status, ApprovalStatus::Pending);

    bot.engine.open("1").await.unwrap();
    bot.tick_advance(&harness).await;
    bot.tick_advance(&harness).await;
    assert_eq!(
        bot.engine.get("1").await.unwrap().state,
        ConversationState::AwaitingReply
    );

    harness.messaging.inject_quick_reply("1", CONFIRM_YES).await;
    bot.tick_advance(&harness).await;
    assert_eq!(
        bot.engine.get("1").await.unwrap().state,
        ConversationState::FormRequested
    );
    let sent = harness.messaging.sent_messages().await;
    assert!(matches!(sent[0], SentMessage::PublicReply { .. }));
    assert!(matches!(sent[1], SentMessage::Direct { .. }));
    match &sent[2] {
        SentMessage::Form { recipient, form } => {
            assert_eq!(recipient, "reporter");
            assert_eq!(form.link, "https://forms.test/edit/1");
        }
        other => panic!("expected a form, got {other:?}"),
    }

    let conversation = bot
        .engine
        .receive_form(&FormSubmission {
            subject_id: "1".into(),
            city: "Portland".into(),
            region: "OR".into(),
            incident_date: chrono::NaiveDate::from_ymd_opt(2020, 6, 1),
            force_rank: Some(ForceRank::LethalForce),
        })
        .await
        .unwrap();
    assert_eq!(conversation.state, ConversationState::PendingApproval);

    let approved = bot.engine.approve("1").await.unwrap();
    assert_eq!(approved.status, ApprovalStatus::Approved);
    assert_eq!(approved.city.as_deref(), Some("Portland"));
    assert_eq!(approved.region.as_deref(), Some("Oregon"));
    assert_eq!(approved.lat, Some(45.52));
    assert_eq!(approved.rank, Some(ForceRank::LethalForce));

    let catalog = ScriptCatalog::new(harness.storage.clone());
    let confirmation = catalog
        .get(&harness.script_id(ConversationNode::Confirmation).await.unwrap())
        .await
        .unwrap();
    assert_eq!(confirmation.use_count, 1);
    assert_eq!(confirmation.positive_count, 1);
}

#[tokio::test]
async fn declined_report_is_closed_politely() {
    let harness = TestHarness::builder()
        .with_default_scripts()
        .with_post(raw_post("7", "someone", "kettled for hours"))
        .build()
        .await
        .unwrap();
    let bot = Bot::new(&harness);

    bot.engine.open("7").await.unwrap();
    bot.tick_advance(&harness).await;
    bot.tick_advance(&harness).await;
    harness.messaging.inject_quick_reply("7", CONFIRM_NO).await;
    bot.tick_advance(&harness).await;

    let conversation = bot.engine.get("7").await.unwrap();
    assert_eq!(conversation.state, ConversationState::Closed);
    assert!(conversation.archived_at.is_some());
    let last = harness.messaging.sent_messages().await.pop().unwrap();
    assert_eq!(last.text(), "Understood. Thank you for your time.");

    // Closed conversations are never touched again.
    harness.messaging.clear_sent().await;
    bot.tick_advance(&harness).await;
    assert_eq!(harness.messaging.sent_count().await, 0);
}

#[tokio::test]
async fn held_lock_skips_the_whole_tick() {
    let harness = TestHarness::builder()
        .with_default_scripts()
        .with_post(raw_post("3", "someone", "flash bangs"))
        .build()
        .await
        .unwrap();
    let bot = Bot::new(&harness);
    bot.engine.open("3").await.unwrap();

    let other = witness_test_utils::InMemoryLockClient::with_table(harness.lock.table(), "other");
    assert!(
        witness_core::LockClient::acquire(
            &other,
            witness_scheduler::ADVANCE_JOB,
            std::time::Duration::from_secs(600)
        )
        .await
        .unwrap()
    );

    assert_eq!(
        run_locked(harness.lock.as_ref(), &bot.advance).await,
        TickOutcome::Skipped
    );
    assert_eq!(harness.messaging.sent_count().await, 0);
    assert_eq!(
        bot.engine.get("3").await.unwrap().state,
        ConversationState::New
    );
}

#[test]
fn config_file_overrides_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[bot]
instance_id = "worker-1"

[scheduler]
advance_interval_secs = 600

[conversation]
form_base_url = "https://forms.example.org/r"
"#
    )
    .unwrap();

    let config = witness_config::load_and_validate_path(file.path()).unwrap();
    assert_eq!(config.bot.instance_id.as_deref(), Some("worker-1"));
    assert_eq!(config.scheduler.advance_interval_secs, 600);
    assert_eq!(config.scheduler.ingest_interval_secs, 4 * 60 * 60);
    assert_eq!(config.conversation.form_base_url, "https://forms.example.org/r");
}

#[test]
fn unknown_config_key_is_reported() {
    let errors = witness_config::load_and_validate_str("[scheduler]\nadvance_every = 5\n").unwrap_err();
    assert!(!errors.is_empty());
}

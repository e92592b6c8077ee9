// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator commands: review, overrides, script management and one-shot ticks.
//!
//! Every command prints one line per record, or pretty JSON with `--json`.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use strum::IntoEnumIterator;
use witness_bridge::HttpClassifier;
use witness_config::WitnessConfig;
use witness_core::types::{FormSubmission, NewScript, Ranking};
use witness_core::{
    ApprovalStatus, CandidatePost, ClassifierAdapter, Conversation, ConversationNode,
    ConversationState, ForceRank, Script, StorageAdapter, WitnessError,
};
use witness_scheduler::{ADVANCE_JOB, AdvanceJob, INGEST_JOB, IngestJob, TickOutcome, run_locked};
use witness_scripts::ScriptCatalog;

use crate::app::{Components, open_storage};

/// Prints `items` as lines or as a JSON array.
fn emit<T: Serialize>(json: bool, items: &[T], line: fn(&T) -> String) -> Result<(), WitnessError> {
    if json {
        let out = serde_json::to_string_pretty(items)
            .map_err(|e| WitnessError::Internal(format!("failed to encode output: {e}")))?;
        println!("{out}");
    } else if items.is_empty() {
        println!("(none)");
    } else {
        for item in items {
            println!("{}", line(item));
        }
    }
    Ok(())
}

fn emit_one<T: Serialize>(json: bool, item: &T, line: fn(&T) -> String) -> Result<(), WitnessError> {
    emit(json, std::slice::from_ref(item), line)
}

pub fn conversation_line(c: &Conversation) -> String {
    let location = c
        .root_location
        .as_deref()
        .or(c.root_city.as_deref())
        .unwrap_or("-");
    let rank = c
        .root_force_rank
        .map(|r| r.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{}\t{}\t@{}\t{}\t{}\tattempts={}",
        c.subject_id, c.state, c.recipient, location, rank, c.contact_attempts
    )
}

pub fn script_line(s: &Script) -> String {
    format!(
        "{}\t{}\t{}\tuses={} positive={} rate={:.2}\t{}",
        s.id,
        s.node,
        if s.active { "active" } else { "inactive" },
        s.use_count,
        s.positive_count,
        s.success_rate(),
        s.text
    )
}

pub fn post_line(p: &CandidatePost) -> String {
    let rank = p
        .rank
        .map(|r| r.to_string())
        .unwrap_or_else(|| "-".to_string());
    let contacted = if p.contacted_at.is_some() { "contacted" } else { "new" };
    format!(
        "{}\t{}\t@{}\t{}\t{}\t{}",
        p.id, p.status, p.author, rank, contacted, p.text
    )
}

pub fn ranking_line(r: &Ranking) -> String {
    format!("{}\t{:.2}", r.label, r.confidence)
}

// --- Storage-only commands ---

/// Conversations awaiting review.
pub async fn pending(config: &WitnessConfig, json: bool) -> Result<(), WitnessError> {
    let storage = open_storage(config).await?;
    let items = storage
        .list_conversations(Some(&[ConversationState::PendingApproval]))
        .await?;
    storage.close().await?;
    emit(json, &items, conversation_line)
}

pub async fn conversations(
    config: &WitnessConfig,
    state: Option<ConversationState>,
    json: bool,
) -> Result<(), WitnessError> {
    let storage = open_storage(config).await?;
    let filter = state.map(|s| vec![s]);
    let items = storage.list_conversations(filter.as_deref()).await?;
    storage.close().await?;
    emit(json, &items, conversation_line)
}

pub async fn posts(
    config: &WitnessConfig,
    status: Option<ApprovalStatus>,
    limit: Option<i64>,
    json: bool,
) -> Result<(), WitnessError> {
    let storage = open_storage(config).await?;
    let items = storage.list_posts(status, limit).await?;
    storage.close().await?;
    emit(json, &items, post_line)
}

fn state_counts(conversations: &[Conversation]) -> Vec<(ConversationState, usize)> {
    ConversationState::iter()
        .map(|state| {
            let count = conversations.iter().filter(|c| c.state == state).count();
            (state, count)
        })
        .collect()
}

/// Number of conversations in each state plus who holds each job lock.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub conversations: Vec<(ConversationState, usize)>,
    pub pending_posts: usize,
    pub locks: Vec<(String, Option<String>)>,
}

pub async fn status(config: &WitnessConfig, json: bool) -> Result<(), WitnessError> {
    use witness_core::LockClient;

    let storage = open_storage(config).await?;
    let all = storage.list_conversations(None).await?;
    let pending_posts = storage
        .list_posts(Some(ApprovalStatus::Pending), None)
        .await?
        .len();
    let lock = witness_storage::SqliteLockClient::with_random_holder(storage.database()?);
    let mut locks = Vec::new();
    for name in [INGEST_JOB, ADVANCE_JOB] {
        locks.push((name.to_string(), lock.holder(name).await?));
    }
    storage.close().await?;

    let report = StatusReport {
        conversations: state_counts(&all),
        pending_posts,
        locks,
    };
    if json {
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| WitnessError::Internal(format!("failed to encode output: {e}")))?;
        println!("{out}");
        return Ok(());
    }
    for (state, count) in &report.conversations {
        println!("{state}\t{count}");
    }
    println!("pending posts\t{}", report.pending_posts);
    for (name, holder) in &report.locks {
        println!("lock {name}\t{}", holder.as_deref().unwrap_or("free"));
    }
    Ok(())
}

/// Script catalog subcommands.
pub enum ScriptAction {
    List { node: Option<ConversationNode> },
    Add { node: ConversationNode, text: String, inactive: bool, external_ref: Option<String> },
    Activate { id: String },
    Deactivate { id: String },
}

pub async fn scripts(
    config: &WitnessConfig,
    action: ScriptAction,
    json: bool,
) -> Result<(), WitnessError> {
    let storage = Arc::new(open_storage(config).await?);
    let catalog = ScriptCatalog::new(storage.clone());
    let result = run_script_action(&catalog, action, json).await;
    storage.close().await?;
    result
}

pub async fn run_script_action(
    catalog: &ScriptCatalog,
    action: ScriptAction,
    json: bool,
) -> Result<(), WitnessError> {
    match action {
        ScriptAction::List { node } => {
            let items: Vec<Script> = catalog
                .list_all()
                .await?
                .into_iter()
                .filter(|s| node.is_none_or(|n| s.node == n))
                .collect();
            emit(json, &items, script_line)
        }
        ScriptAction::Add { node, text, inactive, external_ref } => {
            let script = catalog
                .add(NewScript {
                    node,
                    text,
                    external_ref,
                    active: !inactive,
                })
                .await?;
            emit_one(json, &script, script_line)
        }
        ScriptAction::Activate { id } => {
            catalog.activate(&id).await?;
            emit_one(json, &catalog.get(&id).await?, script_line)
        }
        ScriptAction::Deactivate { id } => {
            catalog.deactivate(&id).await?;
            emit_one(json, &catalog.get(&id).await?, script_line)
        }
    }
}

// --- Commands that need the full collaborator set ---

pub async fn open(config: &WitnessConfig, post_id: &str, json: bool) -> Result<(), WitnessError> {
    let components = Components::connect(config).await?;
    let conversation = components.engine(config).open(post_id).await;
    components.storage.close().await?;
    emit_one(json, &conversation?, conversation_line)
}

pub async fn approve(config: &WitnessConfig, subject_id: &str, json: bool) -> Result<(), WitnessError> {
    let components = Components::connect(config).await?;
    let post = components.engine(config).approve(subject_id).await;
    components.storage.close().await?;
    emit_one(json, &post?, post_line)
}

pub async fn reject(config: &WitnessConfig, subject_id: &str, json: bool) -> Result<(), WitnessError> {
    let components = Components::connect(config).await?;
    let conversation = components.engine(config).reject(subject_id).await;
    components.storage.close().await?;
    emit_one(json, &conversation?, conversation_line)
}

pub async fn set_state(
    config: &WitnessConfig,
    subject_id: &str,
    state: ConversationState,
    json: bool,
) -> Result<(), WitnessError> {
    let components = Components::connect(config).await?;
    let conversation = components.engine(config).admin_set_state(subject_id, state).await;
    components.storage.close().await?;
    emit_one(json, &conversation?, conversation_line)
}

pub async fn show(config: &WitnessConfig, subject_id: &str, json: bool) -> Result<(), WitnessError> {
    let components = Components::connect(config).await?;
    let conversation = lookup(&components, config, subject_id).await;
    components.storage.close().await?;
    emit_one(json, &conversation?, conversation_line)
}

async fn lookup(
    components: &Components,
    config: &WitnessConfig,
    subject_id: &str,
) -> Result<Conversation, WitnessError> {
    components.engine(config).get(subject_id.trim()).await
}

/// Ranks free text through the classifier. Nothing is stored.
pub async fn rank(config: &WitnessConfig, text: &str, json: bool) -> Result<(), WitnessError> {
    let classifier = HttpClassifier::from_config(&config.bridge)?;
    let ranking = rank_text(&classifier, text).await?;
    emit_one(json, &ranking, ranking_line)
}

async fn rank_text(classifier: &dyn ClassifierAdapter, text: &str) -> Result<Ranking, WitnessError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(WitnessError::Validation("text to rank must not be empty".to_string()));
    }
    classifier.rank(text).await
}

/// A form submission entered by the operator.
pub struct FormInput {
    pub subject_id: String,
    pub city: String,
    pub region: String,
    pub incident_date: Option<NaiveDate>,
    pub force_level: Option<u8>,
}

impl FormInput {
    pub fn into_submission(self) -> Result<FormSubmission, WitnessError> {
        let force_rank = match self.force_level {
            Some(level) => Some(ForceRank::from_level(level).ok_or_else(|| {
                WitnessError::Validation(format!("force rank must be 0-5, got {level}"))
            })?),
            None => None,
        };
        Ok(FormSubmission {
            subject_id: self.subject_id,
            city: self.city,
            region: self.region,
            incident_date: self.incident_date,
            force_rank,
        })
    }
}

pub async fn form(config: &WitnessConfig, input: FormInput, json: bool) -> Result<(), WitnessError> {
    let submission = input.into_submission()?;
    let components = Components::connect(config).await?;
    let conversation = components.engine(config).receive_form(&submission).await;
    components.storage.close().await?;
    emit_one(json, &conversation?, conversation_line)
}

/// Which job a one-shot tick runs.
#[derive(Debug, Clone, Copy)]
pub enum TickJob {
    Ingest,
    Advance,
}

/// Runs one lock-guarded tick of `job`, exactly as the scheduler would.
pub async fn tick(config: &WitnessConfig, job: TickJob) -> Result<(), WitnessError> {
    let components = Components::connect(config).await?;
    let outcome = run_tick(&components, config, job).await;
    components.storage.close().await?;
    match outcome {
        TickOutcome::Completed => println!("completed"),
        TickOutcome::Skipped => println!("skipped: lock held by another instance"),
        TickOutcome::Failed(reason) => return Err(WitnessError::Internal(reason)),
    }
    Ok(())
}

pub async fn run_tick(
    components: &Components,
    config: &WitnessConfig,
    job: TickJob,
) -> TickOutcome {
    let lock = components.lock.as_ref();
    match job {
        TickJob::Ingest => {
            let pipeline = Arc::new(components.pipeline(config));
            run_locked(lock, &IngestJob::new(pipeline, &config.scheduler)).await
        }
        TickJob::Advance => {
            let engine = Arc::new(components.engine(config));
            run_locked(lock, &AdvanceJob::new(engine, &config.scheduler)).await
        }
    }
}

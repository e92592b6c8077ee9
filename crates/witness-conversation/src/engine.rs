// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation engine: applies inbound events and advances conversations.
//!
//! Every state change goes through [`ConversationState::transition`], except
//! [`ConversationEngine::admin_set_state`]. Each step persists the new state
//! before the next outbound send, so an interrupted tick resumes from the last
//! saved state.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use strum::IntoEnumIterator;
use tracing::{debug, info, warn};
use witness_config::model::ConversationConfig;
use witness_core::types::{FormPayload, FormSubmission, InboundReply, confirmation_quick_replies};
use witness_core::{
    CandidatePost, Conversation, ConversationNode, ConversationState, Fetch, GeocoderAdapter,
    InsertOutcome, MessagingAdapter, Script, StorageAdapter, WitnessError,
};
use witness_scripts::{ScriptCatalog, ScriptSelector};

use crate::classify::classify_reply;

/// Counts from one `advance_all` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdvanceReport {
    pub visited: usize,
    pub advanced: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Result of advancing one conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Advanced,
    Idle,
}

/// Orchestrates conversations over the storage and messaging collaborators.
pub struct ConversationEngine {
    storage: Arc<dyn StorageAdapter>,
    messaging: Arc<dyn MessagingAdapter>,
    geocoder: Arc<dyn GeocoderAdapter>,
    selector: Arc<ScriptSelector>,
    config: ConversationConfig,
}

impl ConversationEngine {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        messaging: Arc<dyn MessagingAdapter>,
        geocoder: Arc<dyn GeocoderAdapter>,
        selector: Arc<ScriptSelector>,
        config: ConversationConfig,
    ) -> Self {
        Self {
            storage,
            messaging,
            geocoder,
            selector,
            config,
        }
    }

    fn catalog(&self) -> &ScriptCatalog {
        self.selector.catalog()
    }

    /// The subject's data-collection form URL.
    pub fn form_link(&self, subject_id: &str) -> String {
        format!(
            "{}/{}",
            self.config.form_base_url.trim_end_matches('/'),
            subject_id
        )
    }

    pub async fn get(&self, subject_id: &str) -> Result<Conversation, WitnessError> {
        self.storage
            .get_conversation(subject_id)
            .await?
            .ok_or_else(|| WitnessError::NotFound {
                kind: "conversation",
                id: subject_id.to_string(),
            })
    }

    async fn post(&self, post_id: &str) -> Result<CandidatePost, WitnessError> {
        self.storage
            .get_post(post_id)
            .await?
            .ok_or_else(|| WitnessError::NotFound {
                kind: "post",
                id: post_id.to_string(),
            })
    }

    /// Selects a candidate post for outreach.
    ///
    /// An existing conversation for the post is returned unchanged.
    pub async fn open(&self, post_id: &str) -> Result<Conversation, WitnessError> {
        if let Some(existing) = self.storage.get_conversation(post_id).await? {
            return Ok(existing);
        }
        let mut post = self.post(post_id).await?;
        let conversation = Conversation::for_post(&post);
        if self.storage.insert_conversation(&conversation).await? == InsertOutcome::Duplicate {
            return self.get(post_id).await;
        }
        if post.contacted_at.is_none() {
            post.contacted_at = Some(conversation.created_at);
            self.storage.update_post(&post).await?;
        }
        info!(subject_id = post_id, recipient = %conversation.recipient, "conversation opened");
        Ok(conversation)
    }

    /// Applies a reply from the subject.
    ///
    /// Only a conversation awaiting a reply reacts; otherwise the reply is
    /// recorded and the conversation returned unchanged.
    pub async fn handle_reply(&self, reply: &InboundReply) -> Result<Conversation, WitnessError> {
        let mut conversation = self.get(&reply.subject_id).await?;
        if conversation
            .last_inbound_at
            .is_none_or(|at| reply.received_at > at)
        {
            conversation.last_inbound_at = Some(reply.received_at);
        }

        if conversation.state != ConversationState::AwaitingReply {
            debug!(
                subject_id = %conversation.subject_id,
                state = %conversation.state,
                "reply outside awaiting_reply ignored"
            );
            self.save(&mut conversation).await?;
            return Ok(conversation);
        }

        let kind = classify_reply(reply);
        info!(subject_id = %conversation.subject_id, reply = %kind, "reply classified");
        if kind.is_affirmative() {
            if let Some(script_id) = conversation.last_script_id.clone() {
                self.catalog().record_positive(&script_id).await?;
            }
            self.move_to(&mut conversation, ConversationState::ConfirmedInterested)?;
            self.save(&mut conversation).await?;
            self.send_form_request(&mut conversation).await?;
        } else {
            self.move_to(&mut conversation, ConversationState::Declined)?;
            self.save(&mut conversation).await?;
            self.send_closing(&mut conversation).await?;
        }
        Ok(conversation)
    }

    /// Applies an externally collected form submission.
    ///
    /// Geocoding failure keeps the raw location text and is not an error.
    pub async fn receive_form(
        &self,
        submission: &FormSubmission,
    ) -> Result<Conversation, WitnessError> {
        let mut conversation = self.get(&submission.subject_id).await?;
        self.move_to(&mut conversation, ConversationState::FormSubmitted)?;

        let location = submission.location_text();
        conversation.root_location = Some(location.clone());
        conversation.root_city = Some(submission.city.trim().to_string());
        conversation.root_region = Some(submission.region.trim().to_string());
        if let Some(date) = submission.incident_date {
            conversation.root_incident_date = Some(date);
        }
        if let Some(rank) = submission.force_rank {
            conversation.root_force_rank = Some(rank);
        }

        match self.geocoder.resolve(&location).await {
            Ok(result) if result.is_resolved() => {
                if result.city.is_some() {
                    conversation.root_city = result.city;
                }
                if result.region.is_some() {
                    conversation.root_region = result.region;
                }
                conversation.root_lat = result.lat;
                conversation.root_long = result.long;
                debug!(subject_id = %conversation.subject_id, "location geocoded");
            }
            Ok(result) => {
                let err = WitnessError::GeocodeUnresolved {
                    status: result.status.to_string(),
                };
                warn!(subject_id = %conversation.subject_id, location = %location, error = %err, "keeping raw location");
            }
            Err(err) => {
                warn!(subject_id = %conversation.subject_id, location = %location, error = %err, "geocoder failed, keeping raw location");
            }
        }
        self.save(&mut conversation).await?;

        if let Some(script_id) = conversation.last_script_id.clone() {
            self.catalog().record_positive(&script_id).await?;
        }

        self.move_to(&mut conversation, ConversationState::PendingApproval)?;
        self.save(&mut conversation).await?;
        info!(subject_id = %conversation.subject_id, "form received, pending approval");
        Ok(conversation)
    }

    /// Approves the report. Approving an approved conversation is a no-op.
    pub async fn approve(&self, subject_id: &str) -> Result<CandidatePost, WitnessError> {
        let mut conversation = self.get(subject_id).await?;
        let mut post = self.post(subject_id).await?;
        if conversation.state == ConversationState::Approved {
            return Ok(post);
        }
        self.move_to(&mut conversation, ConversationState::Approved)?;

        if conversation.root_city.is_some() {
            post.city = conversation.root_city.clone();
        }
        if conversation.root_region.is_some() {
            post.region = conversation.root_region.clone();
        }
        if conversation.root_lat.is_some() && conversation.root_long.is_some() {
            post.lat = conversation.root_lat;
            post.long = conversation.root_long;
        }
        if conversation.root_incident_date.is_some() {
            post.incident_date = conversation.root_incident_date;
        }
        if conversation.root_force_rank.is_some() {
            post.rank = conversation.root_force_rank;
        }
        post.status = witness_core::ApprovalStatus::Approved;

        self.storage.update_post(&post).await?;
        self.save(&mut conversation).await?;
        info!(subject_id, "report approved");
        Ok(post)
    }

    /// Rejects the report. Rejecting a rejected conversation is a no-op.
    pub async fn reject(&self, subject_id: &str) -> Result<Conversation, WitnessError> {
        let mut conversation = self.get(subject_id).await?;
        if conversation.state == ConversationState::Rejected {
            return Ok(conversation);
        }
        self.move_to(&mut conversation, ConversationState::Rejected)?;
        if let Some(mut post) = self.storage.get_post(subject_id).await? {
            post.status = witness_core::ApprovalStatus::Rejected;
            self.storage.update_post(&post).await?;
        }
        self.save(&mut conversation).await?;
        info!(subject_id, "report rejected");
        Ok(conversation)
    }

    /// Conversations waiting for an administrator.
    pub async fn pending_approval(&self) -> Result<Vec<Conversation>, WitnessError> {
        self.storage
            .list_conversations(Some(&[ConversationState::PendingApproval]))
            .await
    }

    /// Forces a state, bypassing the transition table.
    pub async fn admin_set_state(
        &self,
        subject_id: &str,
        state: ConversationState,
    ) -> Result<Conversation, WitnessError> {
        let mut conversation = self.get(subject_id).await?;
        warn!(
            subject_id,
            from = %conversation.state,
            to = %state,
            "administrative state override"
        );
        conversation.state = state;
        conversation.archived_at = state.is_archived().then(Utc::now);
        self.save(&mut conversation).await?;
        Ok(conversation)
    }

    /// Advances every conversation that still has work.
    ///
    /// Per-conversation failures are logged and counted; they never abort
    /// the pass.
    pub async fn advance_all(&self) -> Result<AdvanceReport, WitnessError> {
        let states: Vec<ConversationState> = ConversationState::iter()
            .filter(|s| s.needs_advancement())
            .collect();
        let conversations = self.storage.list_conversations(Some(&states)).await?;

        let mut report = AdvanceReport::default();
        for conversation in conversations {
            report.visited += 1;
            let subject_id = conversation.subject_id.clone();
            let state = conversation.state;
            match self.advance(conversation).await {
                Ok(Step::Advanced) => report.advanced += 1,
                Ok(Step::Idle) => report.skipped += 1,
                Err(e) => {
                    warn!(subject_id = %subject_id, state = %state, error = %e, "advancement failed");
                    report.failed += 1;
                }
            }
        }
        info!(
            visited = report.visited,
            advanced = report.advanced,
            skipped = report.skipped,
            failed = report.failed,
            "advance_all finished"
        );
        Ok(report)
    }

    async fn advance(&self, mut conversation: Conversation) -> Result<Step, WitnessError> {
        use ConversationState::*;

        match conversation.state {
            New => {
                let script = self.selector.select(ConversationNode::Welcome).await?;
                let text = script.render(&self.form_link(&conversation.subject_id));
                self.messaging
                    .reply_to_post(&conversation.subject_id, &text)
                    .await?;
                self.sent(&mut conversation, &script);
                self.move_to(&mut conversation, Contacted)?;
                self.save(&mut conversation).await?;
                Ok(Step::Advanced)
            }
            Contacted => {
                let script = self.selector.select(ConversationNode::Confirmation).await?;
                let text = script.render(&self.form_link(&conversation.subject_id));
                let quick_replies = confirmation_quick_replies();
                self.messaging
                    .send_direct_message(&conversation.recipient, &text, Some(quick_replies.as_slice()))
                    .await?;
                self.sent(&mut conversation, &script);
                conversation.contact_attempts += 1;
                self.move_to(&mut conversation, AwaitingReply)?;
                self.save(&mut conversation).await?;
                Ok(Step::Advanced)
            }
            AwaitingReply => self.check_reply(conversation).await,
            ConfirmedInterested => {
                self.send_form_request(&mut conversation).await?;
                Ok(Step::Advanced)
            }
            FormRequested => {
                if conversation.form_reminders >= self.config.max_form_reminders
                    || !self.elapsed(conversation.last_outbound_at, self.config.form_reminder_after_secs)
                {
                    return Ok(Step::Idle);
                }
                let script = self.selector.select(ConversationNode::FormReminder).await?;
                self.send_form_script(&mut conversation, &script).await?;
                conversation.form_reminders += 1;
                self.save(&mut conversation).await?;
                Ok(Step::Advanced)
            }
            FormSubmitted => {
                self.move_to(&mut conversation, PendingApproval)?;
                self.save(&mut conversation).await?;
                Ok(Step::Advanced)
            }
            Declined => {
                self.send_closing(&mut conversation).await?;
                Ok(Step::Advanced)
            }
            PendingApproval | Approved | Rejected | Closed => Ok(Step::Idle),
        }
    }

    async fn check_reply(&self, mut conversation: Conversation) -> Result<Step, WitnessError> {
        let since = match (conversation.last_outbound_at, conversation.last_inbound_at) {
            (Some(out), Some(inb)) => Some(out.max(inb)),
            (out, inb) => out.or(inb),
        };
        let fetched = self
            .messaging
            .poll_replies(&conversation.subject_id, &conversation.recipient, since)
            .await;
        match fetched {
            Fetch::Page { items, .. } => {
                if let Some(latest) = items.into_iter().max_by_key(|r| r.received_at) {
                    self.handle_reply(&latest).await?;
                    return Ok(Step::Advanced);
                }
            }
            Fetch::EndOfStream => {}
            Fetch::RateLimited { retry_after } => {
                info!(subject_id = %conversation.subject_id, ?retry_after, "reply polling rate limited");
                return Ok(Step::Idle);
            }
            Fetch::ApiError(message) => return Err(WitnessError::upstream(message)),
        }

        if conversation.contact_attempts < self.config.max_contact_attempts
            && self.elapsed(conversation.last_outbound_at, self.config.recontact_after_secs)
        {
            self.move_to(&mut conversation, ConversationState::Contacted)?;
            self.save(&mut conversation).await?;
            debug!(
                subject_id = %conversation.subject_id,
                attempts = conversation.contact_attempts,
                "no reply, recontact scheduled"
            );
            return Ok(Step::Advanced);
        }
        Ok(Step::Idle)
    }

    /// ConfirmedInterested -> FormRequested with the form link sent.
    async fn send_form_request(&self, conversation: &mut Conversation) -> Result<(), WitnessError> {
        let script = self.selector.select(ConversationNode::FormRequest).await?;
        self.send_form_script(conversation, &script).await?;
        conversation.form_reminders = 0;
        self.move_to(conversation, ConversationState::FormRequested)?;
        self.save(conversation).await
    }

    async fn send_form_script(
        &self,
        conversation: &mut Conversation,
        script: &Script,
    ) -> Result<(), WitnessError> {
        let link = self.form_link(&conversation.subject_id);
        let form = FormPayload {
            text: script.render(&link),
            link,
        };
        self.messaging
            .send_form(&conversation.recipient, &form)
            .await?;
        self.sent(conversation, script);
        Ok(())
    }

    /// Declined -> Closed, with a closing message when a script exists.
    async fn send_closing(&self, conversation: &mut Conversation) -> Result<(), WitnessError> {
        match self.selector.select(ConversationNode::Closing).await {
            Ok(script) => {
                let text = script.render(&self.form_link(&conversation.subject_id));
                self.messaging
                    .send_direct_message(&conversation.recipient, &text, None)
                    .await?;
                self.sent(conversation, &script);
            }
            Err(WitnessError::NoActiveScript { .. }) => {
                warn!(subject_id = %conversation.subject_id, "no closing script, closing silently");
            }
            Err(e) => return Err(e),
        }
        self.move_to(conversation, ConversationState::Closed)?;
        self.save(conversation).await
    }

    fn sent(&self, conversation: &mut Conversation, script: &Script) {
        conversation.last_script_id = Some(script.id.clone());
        conversation.last_outbound_at = Some(Utc::now());
        debug!(subject_id = %conversation.subject_id, script_id = %script.id, node = %script.node, "script sent");
    }

    fn move_to(
        &self,
        conversation: &mut Conversation,
        to: ConversationState,
    ) -> Result<(), WitnessError> {
        let from = conversation.state;
        conversation.state = from.transition(to)?;
        if to.is_archived() {
            conversation.archived_at = Some(Utc::now());
        }
        debug!(subject_id = %conversation.subject_id, %from, %to, "transition");
        Ok(())
    }

    async fn save(&self, conversation: &mut Conversation) -> Result<(), WitnessError> {
        conversation.updated_at = Utc::now();
        self.storage.update_conversation(conversation).await
    }

    fn elapsed(&self, since: Option<DateTime<Utc>>, secs: u64) -> bool {
        let threshold = Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX));
        since.is_none_or(|at| Utc::now() - at >= threshold)
    }
}

#[cfg(test)]
mod tests {
    use witness_core::types::CONFIRM_YES;
    use witness_test_utils::{SentMessage, TestHarness, raw_post};

    use super::*;

    async fn engine(harness: &TestHarness) -> ConversationEngine {
        let catalog = ScriptCatalog::new(harness.storage.clone());
        let selector = Arc::new(ScriptSelector::new(catalog, &harness.config.selector));
        ConversationEngine::new(
            harness.storage.clone(),
            harness.messaging.clone(),
            harness.geocoder.clone(),
            selector,
            harness.config.conversation.clone(),
        )
    }

    async fn harness() -> TestHarness {
        TestHarness::builder()
            .with_default_scripts()
            .with_post(raw_post("123", "reporter", "police fired rubber bullets"))
            .build()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn open_is_idempotent_and_marks_post() {
        let harness = harness().await;
        let engine = engine(&harness).await;

        let first = engine.open("123").await.unwrap();
        assert_eq!(first.state, ConversationState::New);
        assert_eq!(first.recipient, "reporter");
        let second = engine.open("123").await.unwrap();
        assert_eq!(first.created_at, second.created_at);

        let post = harness.storage.get_post("123").await.unwrap().unwrap();
        assert!(post.contacted_at.is_some());
    }

    #[tokio::test]
    async fn open_unknown_post_is_not_found() {
        let harness = harness().await;
        let engine = engine(&harness).await;
        assert!(matches!(
            engine.open("999").await,
            Err(WitnessError::NotFound { kind: "post", .. })
        ));
    }

    #[tokio::test]
    async fn first_two_ticks_welcome_then_confirm() {
        let harness = harness().await;
        let engine = engine(&harness).await;
        engine.open("123").await.unwrap();

        let report = engine.advance_all().await.unwrap();
        assert_eq!(report.advanced, 1);
        assert_eq!(engine.get("123").await.unwrap().state, ConversationState::Contacted);

        engine.advance_all().await.unwrap();
        let conversation = engine.get("123").await.unwrap();
        assert_eq!(conversation.state, ConversationState::AwaitingReply);
        assert_eq!(conversation.contact_attempts, 1);
        assert_eq!(conversation.last_script_id.as_deref(), Some("confirmation-1"));

        let sent = harness.messaging.sent_messages().await;
        assert!(matches!(&sent[0], SentMessage::PublicReply { post_id, .. } if post_id == "123"));
        match &sent[1] {
            SentMessage::Direct { recipient, quick_replies, .. } => {
                assert_eq!(recipient, "reporter");
                assert_eq!(quick_replies.len(), 2);
                assert_eq!(quick_replies[0].metadata, CONFIRM_YES);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn reply_outside_awaiting_is_ignored() {
        let harness = harness().await;
        let engine = engine(&harness).await;
        engine.open("123").await.unwrap();

        let reply = InboundReply {
            subject_id: "123".into(),
            message_id: "m1".into(),
            text: "yes".into(),
            quick_reply: None,
            received_at: Utc::now(),
        };
        let conversation = engine.handle_reply(&reply).await.unwrap();
        assert_eq!(conversation.state, ConversationState::New);
        assert!(conversation.last_inbound_at.is_some());
        assert_eq!(harness.messaging.sent_count().await, 0);
    }

    #[tokio::test]
    async fn receive_form_requires_form_requested() {
        let harness = harness().await;
        let engine = engine(&harness).await;
        engine.open("123").await.unwrap();

        let submission = FormSubmission {
            subject_id: "123".into(),
            city: "Portland".into(),
            region: "OR".into(),
            incident_date: None,
            force_rank: None,
        };
        assert!(matches!(
            engine.receive_form(&submission).await,
            Err(WitnessError::InvalidTransition { from: ConversationState::New, .. })
        ));
    }

    #[tokio::test]
    async fn admin_override_bypasses_table() {
        let harness = harness().await;
        let engine = engine(&harness).await;
        engine.open("123").await.unwrap();

        let conversation = engine
            .admin_set_state("123", ConversationState::PendingApproval)
            .await
            .unwrap();
        assert_eq!(conversation.state, ConversationState::PendingApproval);
        assert!(conversation.archived_at.is_none());
        assert_eq!(engine.pending_approval().await.unwrap().len(), 1);

        let closed = engine
            .admin_set_state("123", ConversationState::Closed)
            .await
            .unwrap();
        assert!(closed.archived_at.is_some());
    }

    #[tokio::test]
    async fn form_link_joins_base_and_subject() {
        let harness = harness().await;
        let engine = engine(&harness).await;
        assert_eq!(engine.form_link("123"), "https://forms.test/edit/123");
    }
}

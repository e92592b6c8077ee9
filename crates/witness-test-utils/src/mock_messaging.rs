// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock messaging adapter for deterministic testing.
//!
//! Outbound messages are captured for assertions. Replies injected with
//! [`MockMessaging::inject_reply`] are returned by `poll_replies`.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use witness_core::types::{FormPayload, InboundReply, QuickReply};
use witness_core::{
    AdapterType, Fetch, HealthStatus, MessageId, MessagingAdapter, PluginAdapter, WitnessError,
};

/// Something the engine sent.
#[derive(Debug, Clone, PartialEq)]
pub enum SentMessage {
    Direct {
        recipient: String,
        text: String,
        quick_replies: Vec<QuickReply>,
    },
    Form {
        recipient: String,
        form: FormPayload,
    },
    PublicReply {
        post_id: String,
        text: String,
    },
}

impl SentMessage {
    pub fn text(&self) -> &str {
        match self {
            SentMessage::Direct { text, .. } | SentMessage::PublicReply { text, .. } => text,
            SentMessage::Form { form, .. } => &form.text,
        }
    }
}

/// A mock social platform.
#[derive(Default)]
pub struct MockMessaging {
    sent: Arc<Mutex<Vec<SentMessage>>>,
    replies: Arc<Mutex<Vec<InboundReply>>>,
    throttled_recipients: Arc<Mutex<HashSet<String>>>,
    poll_override: Arc<Mutex<Option<Fetch<InboundReply>>>>,
}

impl MockMessaging {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a reply for `poll_replies`.
    pub async fn inject_reply(&self, reply: InboundReply) {
        self.replies.lock().await.push(reply);
    }

    /// Shorthand for a text reply received now.
    pub async fn inject_text_reply(&self, subject_id: &str, text: &str) {
        self.inject_reply(InboundReply {
            subject_id: subject_id.to_string(),
            message_id: format!("mock-in-{}", uuid::Uuid::new_v4()),
            text: text.to_string(),
            quick_reply: None,
            received_at: Utc::now(),
        })
        .await;
    }

    /// Shorthand for a quick-reply tap received now.
    pub async fn inject_quick_reply(&self, subject_id: &str, metadata: &str) {
        self.inject_reply(InboundReply {
            subject_id: subject_id.to_string(),
            message_id: format!("mock-in-{}", uuid::Uuid::new_v4()),
            text: String::new(),
            quick_reply: Some(metadata.to_string()),
            received_at: Utc::now(),
        })
        .await;
    }

    /// Sends to `recipient` fail with `RateLimited` until cleared.
    pub async fn throttle_recipient(&self, recipient: &str) {
        self.throttled_recipients
            .lock()
            .await
            .insert(recipient.to_string());
    }

    /// Every poll returns `outcome` instead of the injected replies.
    pub async fn set_poll_outcome(&self, outcome: Option<Fetch<InboundReply>>) {
        *self.poll_override.lock().await = outcome;
    }

    pub async fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }

    async fn record(&self, recipient: &str, message: SentMessage) -> Result<MessageId, WitnessError> {
        if self.throttled_recipients.lock().await.contains(recipient) {
            return Err(WitnessError::RateLimited { retry_after: None });
        }
        self.sent.lock().await.push(message);
        Ok(MessageId(format!("mock-msg-{}", uuid::Uuid::new_v4())))
    }
}

#[async_trait]
impl PluginAdapter for MockMessaging {
    fn name(&self) -> &str {
        "mock-messaging"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Messaging
    }

    async fn health_check(&self) -> Result<HealthStatus, WitnessError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WitnessError> {
        Ok(())
    }
}

#[async_trait]
impl MessagingAdapter for MockMessaging {
    async fn send_direct_message(
        &self,
        recipient: &str,
        text: &str,
        quick_replies: Option<&[QuickReply]>,
    ) -> Result<MessageId, WitnessError> {
        let message = SentMessage::Direct {
            recipient: recipient.to_string(),
            text: text.to_string(),
            quick_replies: quick_replies.map(<[QuickReply]>::to_vec).unwrap_or_default(),
        };
        self.record(recipient, message).await
    }

    async fn send_form(
        &self,
        recipient: &str,
        form: &FormPayload,
    ) -> Result<MessageId, WitnessError> {
        let message = SentMessage::Form {
            recipient: recipient.to_string(),
            form: form.clone(),
        };
        self.record(recipient, message).await
    }

    async fn reply_to_post(&self, post_id: &str, text: &str) -> Result<MessageId, WitnessError> {
        let message = SentMessage::PublicReply {
            post_id: post_id.to_string(),
            text: text.to_string(),
        };
        self.record(post_id, message).await
    }

    async fn poll_replies(
        &self,
        subject_id: &str,
        _recipient: &str,
        since: Option<DateTime<Utc>>,
    ) -> Fetch<InboundReply> {
        if let Some(outcome) = self.poll_override.lock().await.clone() {
            return outcome;
        }
        let items: Vec<InboundReply> = self
            .replies
            .lock()
            .await
            .iter()
            .filter(|r| r.subject_id == subject_id)
            .filter(|r| since.is_none_or(|s| r.received_at > s))
            .cloned()
            .collect();
        if items.is_empty() {
            Fetch::EndOfStream
        } else {
            Fetch::Page {
                items,
                next_cursor: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sends_are_captured() {
        let messaging = MockMessaging::new();
        let id = messaging
            .send_direct_message("alice", "hello", None)
            .await
            .unwrap();
        assert!(id.0.starts_with("mock-msg-"));
        messaging.reply_to_post("123", "hi").await.unwrap();

        let sent = messaging.sent_messages().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].text(), "hello");
        assert!(matches!(&sent[1], SentMessage::PublicReply { post_id, .. } if post_id == "123"));
    }

    #[tokio::test]
    async fn polls_filter_by_subject_and_since() {
        let messaging = MockMessaging::new();
        messaging.inject_text_reply("1", "yes").await;
        messaging.inject_text_reply("2", "no").await;

        match messaging.poll_replies("1", "alice", None).await {
            Fetch::Page { items, .. } => assert_eq!(items[0].text, "yes"),
            other => panic!("expected a page, got {other:?}"),
        }
        let later = Utc::now() + chrono::Duration::seconds(1);
        assert_eq!(
            messaging.poll_replies("1", "alice", Some(later)).await,
            Fetch::EndOfStream
        );
    }

    #[tokio::test]
    async fn throttled_recipient_is_rate_limited() {
        let messaging = MockMessaging::new();
        messaging.throttle_recipient("bob").await;
        let err = messaging.send_direct_message("bob", "x", None).await.unwrap_err();
        assert!(matches!(err, WitnessError::RateLimited { .. }));
        assert_eq!(messaging.sent_count().await, 0);
    }
}

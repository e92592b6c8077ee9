// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging adapter trait for the social platform.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::WitnessError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Fetch, FormPayload, InboundReply, MessageId, QuickReply};

/// Adapter for talking to outreach subjects on the social platform.
///
/// Send operations fail with [`WitnessError::RateLimited`] or
/// [`WitnessError::UpstreamApi`]. Reply polling reports those conditions as
/// [`Fetch`] outcomes so the caller can tell throttling from end-of-stream.
#[async_trait]
pub trait MessagingAdapter: PluginAdapter {
    /// Sends a direct message, optionally with quick-reply buttons.
    async fn send_direct_message(
        &self,
        recipient: &str,
        text: &str,
        quick_replies: Option<&[QuickReply]>,
    ) -> Result<MessageId, WitnessError>;

    /// Sends a data-collection form invitation.
    async fn send_form(
        &self,
        recipient: &str,
        form: &FormPayload,
    ) -> Result<MessageId, WitnessError>;

    /// Publicly replies under a post.
    async fn reply_to_post(&self, post_id: &str, text: &str) -> Result<MessageId, WitnessError>;

    /// Lists replies from `recipient` about `subject_id` received after `since`.
    async fn poll_replies(
        &self,
        subject_id: &str,
        recipient: &str,
        since: Option<DateTime<Utc>>,
    ) -> Fetch<InboundReply>;
}

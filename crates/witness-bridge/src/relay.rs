// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON relay in front of the social platform.
//!
//! The relay owns platform credentials and exposes a small surface:
//!
//! | Method | Path | Body / query | Response |
//! |---|---|---|---|
//! | POST | `/dm` | `{recipient, text, quick_replies}` | `{id}` |
//! | POST | `/form` | `{recipient, text, link}` | `{id}` |
//! | POST | `/reply` | `{post_id, text}` | `{id}` |
//! | GET | `/replies` | `subject, recipient, since` | `{replies, next_cursor}` |
//! | GET | `/search` | `q, cursor` | `{posts, next_cursor}` |
//! | GET | `/health` | | any 2xx |

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use witness_config::model::BridgeConfig;
use witness_core::types::{FormPayload, InboundReply, QuickReply, RawPost};
use witness_core::{
    AdapterType, Fetch, HealthStatus, MessageId, MessagingAdapter, PluginAdapter, PostSource,
    WitnessError,
};

use crate::http::{build_client, check_status, endpoint, transport};

#[derive(Serialize)]
struct DirectMessageRequest<'a> {
    recipient: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "no_quick_replies")]
    quick_replies: &'a [QuickReply],
}

fn no_quick_replies(replies: &&[QuickReply]) -> bool {
    replies.is_empty()
}

#[derive(Serialize)]
struct FormRequest<'a> {
    recipient: &'a str,
    text: &'a str,
    link: &'a str,
}

#[derive(Serialize)]
struct PublicReplyRequest<'a> {
    post_id: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct SentResponse {
    id: String,
}

#[derive(Deserialize)]
struct RepliesResponse {
    #[serde(default)]
    replies: Vec<InboundReply>,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    posts: Vec<RawPost>,
    #[serde(default)]
    next_cursor: Option<String>,
}

/// Messaging and post search through the relay.
#[derive(Debug, Clone)]
pub struct RelayMessaging {
    client: reqwest::Client,
    base_url: String,
}

impl RelayMessaging {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, WitnessError> {
        Ok(Self {
            client: build_client(token, timeout)?,
            base_url: base_url.into(),
        })
    }

    /// Fails when `bridge.relay_url` is not configured.
    pub fn from_config(config: &BridgeConfig) -> Result<Self, WitnessError> {
        let url = config
            .relay_url
            .as_deref()
            .ok_or_else(|| WitnessError::Config("bridge.relay_url is not set".into()))?;
        Self::new(
            url,
            config.relay_token.as_deref(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<MessageId, WitnessError> {
        let response = self
            .client
            .post(endpoint(&self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        let sent: SentResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| WitnessError::upstream(format!("malformed relay response: {e}")))?;
        debug!(path, id = %sent.id, "relay accepted message");
        Ok(MessageId(sent.id))
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, WitnessError> {
        let url = reqwest::Url::parse_with_params(&endpoint(&self.base_url, path), params)
            .map_err(|e| WitnessError::Config(format!("invalid relay url: {e}")))?;
        let response = self.client.get(url).send().await.map_err(transport)?;
        check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| WitnessError::upstream(format!("malformed relay response: {e}")))
    }
}

/// Folds a listing result into the explicit upstream step type.
fn to_fetch<T>(result: Result<(Vec<T>, Option<String>), WitnessError>) -> Fetch<T> {
    match result {
        Ok((items, None)) if items.is_empty() => Fetch::EndOfStream,
        Ok((items, next_cursor)) => Fetch::Page { items, next_cursor },
        Err(WitnessError::RateLimited { retry_after }) => Fetch::RateLimited { retry_after },
        Err(e) => Fetch::ApiError(e.to_string()),
    }
}

#[async_trait]
impl PluginAdapter for RelayMessaging {
    fn name(&self) -> &str {
        "relay"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Messaging
    }

    async fn health_check(&self) -> Result<HealthStatus, WitnessError> {
        match self.client.get(endpoint(&self.base_url, "health")).send().await {
            Ok(r) if r.status().is_success() => Ok(HealthStatus::Healthy),
            Ok(r) => Ok(HealthStatus::Degraded(format!("relay returned {}", r.status()))),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), WitnessError> {
        Ok(())
    }
}

#[async_trait]
impl MessagingAdapter for RelayMessaging {
    async fn send_direct_message(
        &self,
        recipient: &str,
        text: &str,
        quick_replies: Option<&[QuickReply]>,
    ) -> Result<MessageId, WitnessError> {
        let body = DirectMessageRequest {
            recipient,
            text,
            quick_replies: quick_replies.unwrap_or_default(),
        };
        self.post("dm", &body).await
    }

    async fn send_form(
        &self,
        recipient: &str,
        form: &FormPayload,
    ) -> Result<MessageId, WitnessError> {
        let body = FormRequest {
            recipient,
            text: &form.text,
            link: &form.link,
        };
        self.post("form", &body).await
    }

    async fn reply_to_post(&self, post_id: &str, text: &str) -> Result<MessageId, WitnessError> {
        self.post("reply", &PublicReplyRequest { post_id, text }).await
    }

    async fn poll_replies(
        &self,
        subject_id: &str,
        recipient: &str,
        since: Option<DateTime<Utc>>,
    ) -> Fetch<InboundReply> {
        let mut params = vec![
            ("subject", subject_id.to_string()),
            ("recipient", recipient.to_string()),
        ];
        if let Some(since) = since {
            params.push(("since", since.to_rfc3339_opts(SecondsFormat::Millis, true)));
        }
        to_fetch(
            self.get::<RepliesResponse>("replies", &params)
                .await
                .map(|r| (r.replies, r.next_cursor)),
        )
    }
}

#[async_trait]
impl PostSource for RelayMessaging {
    async fn search(&self, query: &str, cursor: Option<&str>) -> Fetch<RawPost> {
        let mut params = vec![("q", query.to_string())];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor.to_string()));
        }
        to_fetch(
            self.get::<SearchResponse>("search", &params)
                .await
                .map(|r| (r.posts, r.next_cursor)),
        )
    }
}

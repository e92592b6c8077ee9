// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Witness engine.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::state::ConversationState;

/// Handle returned by the messaging collaborator for a sent message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Messaging,
    Classifier,
    Geocoder,
    PostSource,
    Lock,
}

// --- Scripts ---

/// The stage of the dialogue a script applies to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConversationNode {
    /// Public reply under the root post inviting a direct message.
    Welcome,
    /// Direct message asking whether the subject can share more, with yes/no quick replies.
    Confirmation,
    /// Direct message carrying the form link.
    FormRequest,
    /// Nudge while the form is outstanding.
    FormReminder,
    /// Sent after a decline.
    Closing,
}

impl ConversationNode {
    /// Whether scripts for this node must contain the form link placeholder.
    pub fn requires_form_link(self) -> bool {
        matches!(self, ConversationNode::FormRequest)
    }
}

/// Placeholder substituted with the subject's form link when a script is rendered.
pub const FORM_LINK_PLACEHOLDER: &str = "{form_link}";

/// A reusable scripted message template with usage and feedback counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub id: String,
    pub node: ConversationNode,
    pub text: String,
    pub active: bool,
    pub use_count: u64,
    pub positive_count: u64,
    /// Platform-side reference, e.g. a registered welcome-message id.
    pub external_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Script {
    /// `positive_count / use_count`, 0 for an unused script, clamped to [0, 1].
    pub fn success_rate(&self) -> f64 {
        if self.use_count == 0 {
            return 0.0;
        }
        (self.positive_count as f64 / self.use_count as f64).clamp(0.0, 1.0)
    }

    /// Renders the script text for delivery.
    pub fn render(&self, form_link: &str) -> String {
        self.text.replace(FORM_LINK_PLACEHOLDER, form_link)
    }
}

/// Administrator input for a new script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewScript {
    pub node: ConversationNode,
    pub text: String,
    #[serde(default)]
    pub external_ref: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

// --- Posts ---

/// Six-step use-of-force continuum assigned by the ranking collaborator.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumIter,
    Serialize,
    Deserialize,
)]
pub enum ForceRank {
    #[strum(to_string = "Rank 0")]
    NoPolicePresence,
    #[strum(to_string = "Rank 1")]
    PolicePresence,
    #[strum(to_string = "Rank 2")]
    EmptyHand,
    #[strum(to_string = "Rank 3")]
    BluntForce,
    #[strum(to_string = "Rank 4")]
    ChemicalElectric,
    #[strum(to_string = "Rank 5")]
    LethalForce,
}

impl ForceRank {
    /// Numeric level, 0 through 5.
    pub fn level(self) -> u8 {
        self as u8
    }

    /// Maps a numeric level back to a rank.
    pub fn from_level(level: u8) -> Option<Self> {
        use ForceRank::*;
        Some(match level {
            0 => NoPolicePresence,
            1 => PolicePresence,
            2 => EmptyHand,
            3 => BluntForce,
            4 => ChemicalElectric,
            5 => LethalForce,
            _ => return None,
        })
    }

    /// Parses `"3"`, `"Rank 3"` or `"rank3"`.
    pub fn parse_label(label: &str) -> Option<Self> {
        let lower = label.trim().to_ascii_lowercase();
        let digits = lower.strip_prefix("rank").unwrap_or(&lower).trim();
        digits.parse::<u8>().ok().and_then(Self::from_level)
    }
}

/// Output of the ranking collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub label: ForceRank,
    pub confidence: f32,
}

/// Review status of a candidate post / report.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// A post as returned by the post source, before scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPost {
    pub id: String,
    pub author: String,
    pub text: String,
    #[serde(default)]
    pub posted_at: Option<DateTime<Utc>>,
}

/// One ingested post considered for outreach or reporting. Keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePost {
    pub id: String,
    pub author: String,
    pub text: String,
    /// Topic query that surfaced the post.
    pub topic: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub ingested_at: DateTime<Utc>,
    pub rank: Option<ForceRank>,
    pub confidence: Option<f32>,
    pub status: ApprovalStatus,
    pub city: Option<String>,
    pub region: Option<String>,
    pub lat: Option<f64>,
    pub long: Option<f64>,
    pub incident_date: Option<NaiveDate>,
    /// Set when the post was selected for outreach.
    pub contacted_at: Option<DateTime<Utc>>,
}

impl CandidatePost {
    /// Builds a pending record from a fetched post and its ranking.
    pub fn from_raw(raw: RawPost, ranking: Ranking, topic: Option<String>) -> Self {
        Self {
            id: raw.id,
            author: raw.author,
            text: raw.text,
            topic,
            posted_at: raw.posted_at,
            ingested_at: Utc::now(),
            rank: Some(ranking.label),
            confidence: Some(ranking.confidence),
            status: ApprovalStatus::Pending,
            city: None,
            region: None,
            lat: None,
            long: None,
            incident_date: None,
            contacted_at: None,
        }
    }
}

// --- Conversations ---

/// Persistent record of one subject's progress. Keyed by the root post id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub subject_id: String,
    /// Platform user the bot messages.
    pub recipient: String,
    pub state: ConversationState,
    /// Raw location text as supplied, kept even when geocoding fails.
    pub root_location: Option<String>,
    pub root_city: Option<String>,
    pub root_region: Option<String>,
    pub root_lat: Option<f64>,
    pub root_long: Option<f64>,
    pub root_incident_date: Option<NaiveDate>,
    pub root_force_rank: Option<ForceRank>,
    pub last_script_id: Option<String>,
    pub last_inbound_at: Option<DateTime<Utc>>,
    pub last_outbound_at: Option<DateTime<Utc>>,
    pub contact_attempts: u32,
    /// Form reminders sent since the link went out.
    #[serde(default)]
    pub form_reminders: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl Conversation {
    /// A fresh conversation for a candidate post, in the initial state.
    pub fn for_post(post: &CandidatePost) -> Self {
        let now = Utc::now();
        Self {
            subject_id: post.id.clone(),
            recipient: post.author.clone(),
            state: ConversationState::INITIAL,
            root_location: None,
            root_city: post.city.clone(),
            root_region: post.region.clone(),
            root_lat: post.lat,
            root_long: post.long,
            root_incident_date: post.incident_date.or_else(|| post.posted_at.map(|t| t.date_naive())),
            root_force_rank: post.rank,
            last_script_id: None,
            last_inbound_at: None,
            last_outbound_at: None,
            contact_attempts: 0,
            form_reminders: 0,
            created_at: now,
            updated_at: now,
            archived_at: None,
        }
    }
}

// --- Messaging ---

/// A quick-reply button offered with a direct message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickReply {
    pub label: String,
    pub description: String,
    pub metadata: String,
}

/// Quick-reply metadata for an affirmative answer.
pub const CONFIRM_YES: &str = "confirm_yes";
/// Quick-reply metadata for a negative answer.
pub const CONFIRM_NO: &str = "confirm_no";

/// The Yes/No pair offered with the confirmation message.
pub fn confirmation_quick_replies() -> Vec<QuickReply> {
    vec![
        QuickReply {
            label: "Yes".to_string(),
            description: "Yes I can provide more information".to_string(),
            metadata: CONFIRM_YES.to_string(),
        },
        QuickReply {
            label: "No".to_string(),
            description: "No I can't provide more information".to_string(),
            metadata: CONFIRM_NO.to_string(),
        },
    ]
}

/// Form invitation delivered through the messaging collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormPayload {
    pub text: String,
    pub link: String,
}

/// A reply received from a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundReply {
    pub subject_id: String,
    pub message_id: String,
    pub text: String,
    /// Quick-reply metadata if the subject tapped a button.
    #[serde(default)]
    pub quick_reply: Option<String>,
    pub received_at: DateTime<Utc>,
}

/// An externally collected incident report for a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSubmission {
    pub subject_id: String,
    pub city: String,
    pub region: String,
    #[serde(default)]
    pub incident_date: Option<NaiveDate>,
    #[serde(default)]
    pub force_rank: Option<ForceRank>,
}

impl FormSubmission {
    /// Free-text location handed to the geocoder.
    pub fn location_text(&self) -> String {
        format!("{},{}", self.city.trim(), self.region.trim())
    }
}

// --- Geocoding ---

/// Status reported by the geocoding collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeocodeStatus {
    Ok,
    ZeroResults,
    OverQueryLimit,
    RequestDenied,
    InvalidRequest,
    UnknownError,
}

/// A resolved (or unresolved) location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub status: GeocodeStatus,
    pub city: Option<String>,
    pub region: Option<String>,
    pub lat: Option<f64>,
    pub long: Option<f64>,
}

impl GeocodeResult {
    /// An unresolved result carrying only a status.
    pub fn unresolved(status: GeocodeStatus) -> Self {
        Self {
            status,
            city: None,
            region: None,
            lat: None,
            long: None,
        }
    }

    /// Resolved means an OK status with coordinates.
    pub fn is_resolved(&self) -> bool {
        self.status == GeocodeStatus::Ok && self.lat.is_some() && self.long.is_some()
    }
}

// --- Upstream paging ---

/// One step of an upstream listing.
///
/// Callers decide what each outcome means for them: ingestion keeps what it
/// has on `RateLimited`, reply polling skips the subject until the next tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetch<T> {
    /// A page of items, with a cursor for the next page if there is one.
    Page {
        items: Vec<T>,
        next_cursor: Option<String>,
    },
    /// Nothing further.
    EndOfStream,
    /// The upstream asked us to back off.
    RateLimited { retry_after: Option<Duration> },
    /// The upstream failed.
    ApiError(String),
}

/// Result of an idempotent insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The key already existed; nothing was written.
    Duplicate,
}

// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation states and the transition table that governs them.
//!
//! States are persisted by name, never by number. The only way to move a
//! conversation between states outside this table is the explicit
//! administrative override in the conversation engine.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::error::WitnessError;

/// Progress of one outreach subject through the scripted dialogue.
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
pub enum ConversationState {
    /// Selected for outreach, nothing sent yet.
    New,
    /// Public contact made; the confirmation message is due.
    Contacted,
    /// Confirmation sent, waiting for a yes/no.
    AwaitingReply,
    /// Subject said yes; the form link is due.
    ConfirmedInterested,
    /// Form link sent, waiting for a submission.
    FormRequested,
    /// Submission received, geocoding attempted.
    FormSubmitted,
    /// Report waits for an administrator.
    PendingApproval,
    /// Report approved. Terminal.
    Approved,
    /// Report rejected. Terminal.
    Rejected,
    /// Subject said no (or something else); closing message due. Terminal for outreach.
    Declined,
    /// Conversation closed after a decline. Terminal.
    Closed,
}

use ConversationState::*;

/// Every allowed `(from, to)` edge.
pub const TRANSITIONS: &[(ConversationState, ConversationState)] = &[
    (New, Contacted),
    (AwaitingReply, Contacted),
    (Contacted, AwaitingReply),
    (AwaitingReply, ConfirmedInterested),
    (ConfirmedInterested, FormRequested),
    (AwaitingReply, Declined),
    (Declined, Closed),
    (FormRequested, FormSubmitted),
    (FormSubmitted, PendingApproval),
    (PendingApproval, Approved),
    (PendingApproval, Rejected),
];

impl ConversationState {
    /// The only state a conversation may be created in.
    pub const INITIAL: ConversationState = New;

    /// Terminal for the automated path. `Declined` still owes a closing
    /// message but is never re-opened automatically.
    pub fn is_terminal(self) -> bool {
        matches!(self, Approved | Rejected | Closed | Declined)
    }

    /// Conversations in these states are archived and never visited again.
    pub fn is_archived(self) -> bool {
        matches!(self, Approved | Rejected | Closed)
    }

    /// Whether `self -> to` is an edge of the transition table.
    pub fn can_transition_to(self, to: ConversationState) -> bool {
        TRANSITIONS.iter().any(|&(f, t)| f == self && t == to)
    }

    /// Validates `self -> to`, returning the new state.
    pub fn transition(self, to: ConversationState) -> Result<ConversationState, WitnessError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(WitnessError::InvalidTransition { from: self, to })
        }
    }

    /// States reachable in one step.
    pub fn successors(self) -> impl Iterator<Item = ConversationState> {
        TRANSITIONS
            .iter()
            .filter(move |&&(f, _)| f == self)
            .map(|&(_, t)| t)
    }

    /// States that still have work for the advancement job.
    pub fn needs_advancement(self) -> bool {
        !self.is_archived() && self != PendingApproval
    }
}

// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Heuristic classification of inbound replies.
//!
//! Quick-reply metadata is authoritative. Free text falls back to short
//! phrase matching with no network call.

use strum::Display;
use witness_core::types::{CONFIRM_NO, CONFIRM_YES, InboundReply};

/// What a subject's reply means for the dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ReplyKind {
    Affirmative,
    Negative,
    /// Anything unrecognised. Follows the negative path.
    Other,
}

impl ReplyKind {
    /// Only an affirmative reply leads to the form; the rest decline.
    pub fn is_affirmative(self) -> bool {
        self == ReplyKind::Affirmative
    }
}

/// Whole-reply affirmative answers (exact match, case-insensitive).
const AFFIRMATIVE_EXACT: &[&str] = &[
    "y", "yes", "yeah", "yep", "yup", "sure", "ok", "okay", "of course",
    "absolutely", "definitely", "i can", "happy to", "si", "sí",
];

/// Affirmative openers (prefix, case-insensitive).
const AFFIRMATIVE_PREFIXES: &[&str] = &[
    "yes ", "yes,", "yeah ", "sure ", "sure,", "ok ", "okay ", "i can ",
    "i'd be happy", "i would be happy", "happy to ", "i'll help", "i will help",
];

/// Whole-reply negative answers (exact match, case-insensitive).
const NEGATIVE_EXACT: &[&str] = &[
    "n", "no", "nope", "nah", "no thanks", "no thank you", "stop",
    "unsubscribe", "not interested", "i can't", "i cannot",
];

/// Negative phrases (contains, case-insensitive).
const NEGATIVE_CONTAINS: &[&str] = &[
    "no thanks", "not interested", "leave me alone", "don't message",
    "do not message", "don't contact", "do not contact", "i can't", "i cannot",
    "i won't", "rather not",
];

/// Classifies a reply. Quick-reply metadata wins over the text.
pub fn classify_reply(reply: &InboundReply) -> ReplyKind {
    match reply.quick_reply.as_deref() {
        Some(CONFIRM_YES) => return ReplyKind::Affirmative,
        Some(CONFIRM_NO) => return ReplyKind::Negative,
        _ => {}
    }
    classify_text(&reply.text)
}

/// Free-text fallback.
pub fn classify_text(text: &str) -> ReplyKind {
    let lower = text
        .trim()
        .trim_end_matches(['.', '!', '?'])
        .trim()
        .to_lowercase();
    if lower.is_empty() {
        return ReplyKind::Other;
    }

    // Negatives first: "no, I can't" must not read as "i can".
    if NEGATIVE_EXACT.contains(&lower.as_str())
        || NEGATIVE_CONTAINS.iter().any(|p| lower.contains(p))
        || lower.starts_with("no ")
        || lower.starts_with("no,")
    {
        return ReplyKind::Negative;
    }

    if AFFIRMATIVE_EXACT.contains(&lower.as_str())
        || AFFIRMATIVE_PREFIXES.iter().any(|p| lower.starts_with(p))
    {
        return ReplyKind::Affirmative;
    }

    ReplyKind::Other
}

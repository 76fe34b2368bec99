//! Conversation domain model.
//!
//! This module contains the types that make up the client-side state of a
//! conversation: individual exchanges, their sources, and the global status.

use serde::{Deserialize, Serialize};

use super::ledger::QueryLedger;

/// A single retrieved source backing an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Display title of the source document.
    pub title: String,
    /// Extracted text snippet shown to the user.
    pub text: String,
    /// Where the source came from (document path or URL).
    pub origin: String,
}

/// One question/answer exchange in a conversation.
///
/// During a streaming exchange `response` grows by ordered concatenation and
/// `sources`, once present, grows only by append. `error` is set at most once
/// per exchange; its presence marks the exchange failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// The question as the user asked it. Immutable once created.
    pub question: String,
    /// Accumulated answer text. Starts empty.
    #[serde(default)]
    pub response: String,
    /// Sources backing the answer. Absent until the exchange first emits one;
    /// an exchange that completes without sources leaves an explicit empty list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
    /// Failure message for this exchange, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Query {
    /// Creates a fresh exchange for `question` with an empty response.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            response: String::new(),
            sources: None,
            error: None,
        }
    }
}

/// Global status of the conversation, not per-query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    /// No exchange in flight.
    #[default]
    Idle,
    /// An exchange is in flight.
    Loading,
    /// The most recent exchange failed.
    Failed,
}

/// A partial update to shallow-merge into a ledger entry.
///
/// Every `Some` field replaces the corresponding field of the addressed
/// entry wholesale; streaming concatenation is the reducer's job, not the
/// patch's.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPatch {
    pub question: Option<String>,
    pub response: Option<String>,
    pub sources: Option<Vec<Source>>,
    pub error: Option<String>,
}

/// Entry in the persisted conversation listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Identifier of the persisted thread.
    pub id: String,
    /// Human-readable name shown in the listing.
    pub name: String,
}

/// The session-scoped conversation state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Ordered record of all exchanges in this conversation.
    pub ledger: QueryLedger,
    /// Global exchange status.
    #[serde(default)]
    pub status: ConversationStatus,
    /// Identifier of the persisted thread, set once the backend assigns it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

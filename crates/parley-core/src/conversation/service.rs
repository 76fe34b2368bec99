//! Service traits consumed by the conversation engine.
//!
//! These decouple the engine from the network, so the reconciliation logic
//! can be exercised against scripted frame sequences without a live backend.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use super::frame::StreamFrame;
use super::model::{Query, Source};
use crate::error::Result;

/// The lazy, ordered, finite sequence of event frames for one exchange.
///
/// The sequence is restartable only by beginning a new exchange, never
/// resumable mid-stream.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<StreamFrame>> + Send>>;

/// Which answer path the engine drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerMode {
    /// Incremental event frames.
    Streaming,
    /// One complete payload per exchange.
    Atomic,
}

/// A question posed to the answering service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerRequest {
    /// The question text.
    pub question: String,
    /// Snapshot of the conversation's exchanges, taken at dispatch time.
    pub history: Vec<Query>,
    /// The persisted thread to continue, if the backend assigned one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// The complete payload of a non-streaming exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomicAnswer {
    /// The full answer text.
    pub answer: String,
    /// Sources backing the answer.
    #[serde(default)]
    pub sources: Vec<Source>,
    /// Identifier of the persisted thread.
    #[serde(rename = "conversationId", default)]
    pub conversation_id: Option<String>,
}

/// The question-answering collaborator.
#[async_trait]
pub trait AnswerService: Send + Sync {
    /// Which answer path this service provides.
    fn mode(&self) -> AnswerMode;

    /// Opens a streaming exchange for `request`.
    ///
    /// # Returns
    ///
    /// - `Ok(stream)`: the ordered frame sequence of this exchange
    /// - `Err(_)`: the connection could not be established or was rejected
    async fn stream_answer(&self, request: AnswerRequest) -> Result<FrameStream>;

    /// Runs a non-streaming exchange for `request` to completion.
    async fn fetch_answer(&self, request: AnswerRequest) -> Result<AtomicAnswer>;
}

/// The conversation-listing and persistence collaborator.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Refetches the persisted list of conversations.
    ///
    /// Called once after every successfully completed exchange. A failed
    /// refresh is logged by the engine and never surfaced as an exchange
    /// failure.
    async fn refresh(&self) -> Result<()>;

    /// Loads the stored exchanges of a previously persisted conversation.
    async fn fetch_conversation(&self, conversation_id: &str) -> Result<Vec<Query>>;
}

//! Conversation engine: the streaming answer reconciliation core.
//!
//! The engine owns the conversation state and exposes the public operations
//! (`ask`, `retry`, `abort`, plus read-only selectors). Every exchange runs
//! under a cancellation token issued by the [`RequestCoordinator`]; the token
//! is re-checked under the state write lock before each transition, so a
//! superseded or aborted exchange can never corrupt the ledger, even if its
//! network call resolves later.
//!
//! Exchange failures are never returned to the caller. They are converted
//! into ledger state: an `error` on the addressed entry and a global
//! `Failed` status. Callers observe outcomes through the selectors.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use super::coordinator::RequestCoordinator;
use super::model::{Conversation, ConversationStatus, Query, QueryPatch, Source};
use super::reducer::{FrameProgress, FrameReducer};
use super::service::{AnswerMode, AnswerRequest, AnswerService, ConversationStore};
use crate::error::{ParleyError, Result};

/// Message attached to the relevant exchange when the connection fails.
pub const CONNECTIVITY_ERROR: &str =
    "Something went wrong. Please check your internet connection.";

/// Drives exchanges against the answering service and reconciles their
/// results into the conversation state.
pub struct ConversationEngine {
    /// The only shared mutable state: ledger, status, conversation id.
    state: Arc<RwLock<Conversation>>,
    /// Issues and invalidates exchange tokens.
    coordinator: RequestCoordinator,
    /// The question-answering collaborator.
    answers: Arc<dyn AnswerService>,
    /// The conversation-listing and persistence collaborator.
    store: Arc<dyn ConversationStore>,
}

impl ConversationEngine {
    /// Creates an engine with an empty conversation.
    pub fn new(answers: Arc<dyn AnswerService>, store: Arc<dyn ConversationStore>) -> Self {
        Self {
            state: Arc::new(RwLock::new(Conversation::default())),
            coordinator: RequestCoordinator::new(),
            answers,
            store,
        }
    }

    // ============================================================================
    // Selectors
    // ============================================================================

    /// Snapshot of all exchanges in the ledger.
    pub async fn queries(&self) -> Vec<Query> {
        self.state.read().await.ledger.as_slice().to_vec()
    }

    /// Current global status.
    pub async fn status(&self) -> ConversationStatus {
        self.state.read().await.status
    }

    /// Identifier of the persisted thread, if assigned.
    pub async fn conversation_id(&self) -> Option<String> {
        self.state.read().await.conversation_id.clone()
    }

    /// Full snapshot of the conversation state.
    pub async fn snapshot(&self) -> Conversation {
        self.state.read().await.clone()
    }

    // ============================================================================
    // Operations
    // ============================================================================

    /// Sends `question` to the answering service and reconciles the answer.
    ///
    /// With `target_index = None` a fresh exchange is appended to the ledger
    /// and addressed; with `Some(index)` the existing entry at `index` is
    /// addressed instead. The target is resolved here, once, and is not
    /// re-resolved per frame.
    ///
    /// Any exchange already in flight is superseded: its token is cancelled
    /// and every transition it would still produce is discarded.
    pub async fn ask(&self, question: &str, target_index: Option<usize>) {
        let token = self.coordinator.begin().await;

        let (target, request) = {
            let mut conversation = self.state.write().await;
            let target = match target_index {
                Some(index) => index,
                None => {
                    conversation.ledger.append(Query::new(question));
                    conversation.ledger.len() - 1
                }
            };
            conversation.status = ConversationStatus::Loading;
            let request = AnswerRequest {
                question: question.to_string(),
                history: conversation.ledger.as_slice().to_vec(),
                conversation_id: conversation.conversation_id.clone(),
            };
            (target, request)
        };

        self.run_exchange(request, target, token).await;
    }

    /// Edits and resends the question at `index`.
    ///
    /// Every exchange from `index` onward is dropped, a fresh exchange for
    /// `new_question` takes its place, and a new exchange is dispatched
    /// addressed at `index`.
    pub async fn retry(&self, index: usize, new_question: &str) {
        let token = self.coordinator.begin().await;

        let request = {
            let mut conversation = self.state.write().await;
            conversation
                .ledger
                .truncate_and_append(index, Query::new(new_question));
            conversation.status = ConversationStatus::Loading;
            AnswerRequest {
                question: new_question.to_string(),
                history: conversation.ledger.as_slice().to_vec(),
                conversation_id: conversation.conversation_id.clone(),
            }
        };

        self.run_exchange(request, index, token).await;
    }

    /// Cancels the in-flight exchange, if any.
    ///
    /// The addressed entry keeps whatever partial state it accumulated; no
    /// error is recorded and a `Loading` status returns to `Idle`.
    pub async fn abort(&self) {
        self.coordinator.abort().await;

        let mut conversation = self.state.write().await;
        if conversation.status == ConversationStatus::Loading {
            conversation.status = ConversationStatus::Idle;
        }
    }

    /// Loads a persisted conversation, replacing the current ledger.
    ///
    /// Aborts any in-flight exchange first.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored conversation cannot be fetched; the
    /// current state is left untouched in that case.
    pub async fn load_conversation(&self, conversation_id: &str) -> Result<()> {
        let queries = self.store.fetch_conversation(conversation_id).await?;

        self.coordinator.abort().await;
        let mut conversation = self.state.write().await;
        conversation.ledger.replace_all(queries);
        conversation.conversation_id = Some(conversation_id.to_string());
        conversation.status = ConversationStatus::Idle;
        Ok(())
    }

    /// Starts a new, empty conversation.
    ///
    /// Aborts any in-flight exchange and clears the ledger and the
    /// conversation id.
    pub async fn reset(&self) {
        self.coordinator.abort().await;

        let mut conversation = self.state.write().await;
        conversation.ledger.replace_all(Vec::new());
        conversation.conversation_id = None;
        conversation.status = ConversationStatus::Idle;
    }

    // ============================================================================
    // Exchange execution
    // ============================================================================

    async fn run_exchange(&self, request: AnswerRequest, target: usize, token: CancellationToken) {
        match self.answers.mode() {
            AnswerMode::Streaming => self.run_streaming(request, target, token).await,
            AnswerMode::Atomic => self.run_atomic(request, target, token).await,
        }
    }

    /// Consumes one exchange's frame sequence and folds it into the state.
    async fn run_streaming(
        &self,
        request: AnswerRequest,
        target: usize,
        token: CancellationToken,
    ) {
        let opened = tokio::select! {
            _ = token.cancelled() => return,
            opened = self.answers.stream_answer(request) => opened,
        };

        let mut stream = match opened {
            Ok(stream) => stream,
            Err(error) => {
                self.record_transport_failure(target, &token, error).await;
                return;
            }
        };

        let mut reducer = FrameReducer::new(target);
        loop {
            let item = tokio::select! {
                // Aborted or superseded mid-stream: stop immediately and
                // leave the entry in its accumulated partial state.
                _ = token.cancelled() => return,
                item = stream.next() => item,
            };

            let Some(item) = item else {
                // The stream ran dry without an `end` frame. The status is
                // intentionally left as-is; there is no timeout here.
                tracing::debug!(
                    target_index = target,
                    "frame stream ended without a completion frame"
                );
                return;
            };

            match item {
                Ok(frame) => {
                    let progress = {
                        let mut conversation = self.state.write().await;
                        if token.is_cancelled() {
                            return;
                        }
                        reducer.apply(&mut conversation, frame)
                    };
                    match progress {
                        FrameProgress::Continue => {}
                        FrameProgress::Completed => {
                            self.fire_refresh().await;
                            return;
                        }
                        FrameProgress::Failed => return,
                    }
                }
                Err(error) => {
                    self.record_transport_failure(target, &token, error).await;
                    return;
                }
            }
        }
    }

    /// Applies one complete answer payload in a single transition.
    async fn run_atomic(&self, request: AnswerRequest, target: usize, token: CancellationToken) {
        let fetched = tokio::select! {
            _ = token.cancelled() => return,
            fetched = self.answers.fetch_answer(request) => fetched,
        };

        match fetched {
            Ok(answer) => {
                {
                    let mut conversation = self.state.write().await;
                    if token.is_cancelled() {
                        return;
                    }
                    let sources = answer.sources.iter().map(source_basename).collect();
                    conversation.ledger.merge_partial(
                        target,
                        QueryPatch {
                            response: Some(answer.answer),
                            sources: Some(sources),
                            ..Default::default()
                        },
                    );
                    conversation.conversation_id = answer.conversation_id;
                    conversation.status = ConversationStatus::Idle;
                }
                self.fire_refresh().await;
            }
            Err(error) => {
                let mut conversation = self.state.write().await;
                if token.is_cancelled() {
                    return;
                }
                tracing::warn!(error = %error, "answer request failed");
                conversation.status = ConversationStatus::Failed;
                // This path has no index-addressed error frame; the failure
                // lands on the last exchange in the ledger.
                if let Some(last) = conversation.ledger.len().checked_sub(1) {
                    conversation.ledger.merge_partial(
                        last,
                        QueryPatch {
                            error: Some(CONNECTIVITY_ERROR.to_string()),
                            ..Default::default()
                        },
                    );
                }
            }
        }
    }

    /// Records a transport failure against the addressed exchange.
    ///
    /// A cancelled token means the exchange was superseded or aborted, which
    /// is not an error; in that case nothing is recorded.
    async fn record_transport_failure(
        &self,
        target: usize,
        token: &CancellationToken,
        error: ParleyError,
    ) {
        let mut conversation = self.state.write().await;
        if token.is_cancelled() {
            return;
        }

        tracing::warn!(error = %error, target_index = target, "streaming exchange failed");
        conversation.status = ConversationStatus::Failed;
        conversation.ledger.merge_partial(
            target,
            QueryPatch {
                error: Some(CONNECTIVITY_ERROR.to_string()),
                ..Default::default()
            },
        );
    }

    /// Asks the listing collaborator to resynchronize.
    ///
    /// Fired exactly once per successfully completed exchange, after the
    /// completing transition is fully applied. Failures are logged and do
    /// not alter the conversation status.
    async fn fire_refresh(&self) {
        if let Err(error) = self.store.refresh().await {
            tracing::warn!(error = %error, "failed to refresh conversation list");
        }
    }
}

/// Reduces a source title containing path separators to its final segment.
///
/// Pure and independent per source; titles without separators pass through
/// unchanged.
fn source_basename(source: &Source) -> Source {
    let title = source
        .title
        .rsplit('/')
        .next()
        .unwrap_or(source.title.as_str())
        .to_string();
    Source {
        title,
        text: source.text.clone(),
        origin: source.origin.clone(),
    }
}

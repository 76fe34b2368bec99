//! HTTP implementations of the Parley service traits.
//!
//! This crate talks to a document Q&A backend over HTTP: it opens streaming
//! answer exchanges (server-sent `data:` lines), runs non-streaming answer
//! requests, and fetches the persisted conversation listing. The engine in
//! `parley-core` consumes these through the `AnswerService` and
//! `ConversationStore` traits and never sees a socket.

mod answer_service;
pub mod config;
mod conversation_store;
mod sse;

use std::sync::Arc;

use parley_core::conversation::ConversationEngine;

pub use answer_service::HttpAnswerService;
pub use config::ClientConfig;
pub use conversation_store::HttpConversationStore;

/// Builds a [`ConversationEngine`] wired to the HTTP services.
pub fn engine_with_config(config: ClientConfig) -> ConversationEngine {
    let answers = Arc::new(HttpAnswerService::new(config.clone()));
    let store = Arc::new(HttpConversationStore::new(config));
    ConversationEngine::new(answers, store)
}

/// Builds a [`ConversationEngine`] configured from the environment.
pub fn engine_from_env() -> ConversationEngine {
    engine_with_config(ClientConfig::from_env())
}

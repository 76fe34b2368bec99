//! Conversation domain module.
//!
//! This module contains the streaming answer reconciliation engine and the
//! pieces it is built from.
//!
//! # Module Structure
//!
//! - `model`: Core conversation domain model (`Query`, `Source`, `Conversation`)
//! - `ledger`: Ordered, index-addressed record of exchanges (`QueryLedger`)
//! - `frame`: Event frames of a streaming exchange (`StreamFrame`)
//! - `coordinator`: Exchange lifecycle and cancellation (`RequestCoordinator`)
//! - `reducer`: Folds one exchange's frames into the conversation (`FrameReducer`)
//! - `service`: Traits for the answering and listing collaborators
//! - `engine`: The public operations (`ask`, `retry`, `abort`, selectors)
//!
//! # Usage
//!
//! ```ignore
//! use parley_core::conversation::{AnswerService, ConversationEngine, ConversationStore};
//! use parley_core::conversation::{Conversation, ConversationStatus, Query, Source};
//! use parley_core::conversation::{FrameReducer, StreamFrame};
//! ```

mod coordinator;
mod engine;
mod frame;
mod ledger;
mod model;
mod reducer;
mod service;

// Re-export public API
pub use coordinator::RequestCoordinator;
pub use engine::{CONNECTIVITY_ERROR, ConversationEngine};
pub use frame::StreamFrame;
pub use ledger::QueryLedger;
pub use model::{Conversation, ConversationStatus, ConversationSummary, Query, QueryPatch, Source};
pub use reducer::{FrameProgress, FrameReducer};
pub use service::{
    AnswerMode, AnswerRequest, AnswerService, AtomicAnswer, ConversationStore, FrameStream,
};

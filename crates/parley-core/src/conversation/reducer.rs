//! Streaming frame reducer.
//!
//! Folds the ordered, finite frame sequence of one exchange into the
//! conversation state.

use super::frame::StreamFrame;
use super::model::{Conversation, ConversationStatus};

/// Result of applying one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameProgress {
    /// The frame was applied (or ignored); more frames may follow.
    Continue,
    /// An `end` frame was applied; the exchange is complete.
    Completed,
    /// An `error` frame was applied; the exchange failed and every later
    /// frame of this exchange is ignored.
    Failed,
}

/// Applies the event frames of a single streaming exchange, in arrival order.
///
/// The target index is resolved once when the exchange is dispatched and is
/// never re-resolved, so the addressed entry stays stable even if the ledger
/// grows while the stream is in flight.
#[derive(Debug)]
pub struct FrameReducer {
    target: usize,
    failed: bool,
}

impl FrameReducer {
    /// Creates a reducer addressing the ledger entry at `target`.
    pub fn new(target: usize) -> Self {
        Self {
            target,
            failed: false,
        }
    }

    /// The ledger index this exchange addresses.
    pub fn target(&self) -> usize {
        self.target
    }

    /// Applies one frame to the conversation.
    ///
    /// Once an `error` frame has been applied the exchange is terminal:
    /// every subsequent frame, including `end`, is dropped without touching
    /// state.
    pub fn apply(&mut self, conversation: &mut Conversation, frame: StreamFrame) -> FrameProgress {
        if self.failed {
            tracing::debug!(
                target_index = self.target,
                "dropping frame after terminal error"
            );
            return FrameProgress::Failed;
        }

        match frame {
            StreamFrame::Id { id } => {
                conversation.conversation_id = Some(id);
                FrameProgress::Continue
            }
            StreamFrame::Source { source } => {
                match conversation.ledger.entry_mut(self.target) {
                    Some(entry) => match entry.sources.as_mut() {
                        Some(sources) => sources.push(source),
                        None => entry.sources = Some(vec![source]),
                    },
                    None => self.warn_out_of_range("source"),
                }
                FrameProgress::Continue
            }
            StreamFrame::Answer { answer } => {
                match conversation.ledger.entry_mut(self.target) {
                    Some(entry) => entry.response.push_str(&answer),
                    None => self.warn_out_of_range("answer"),
                }
                FrameProgress::Continue
            }
            StreamFrame::Error { error } => {
                self.failed = true;
                match conversation.ledger.entry_mut(self.target) {
                    Some(entry) => entry.error = Some(error),
                    None => self.warn_out_of_range("error"),
                }
                conversation.status = ConversationStatus::Failed;
                FrameProgress::Failed
            }
            StreamFrame::End => {
                if let Some(entry) = conversation.ledger.entry_mut(self.target) {
                    // An exchange that never emitted a source still ends with
                    // an explicit empty list, so readers are not left waiting.
                    if entry.sources.is_none() {
                        entry.sources = Some(Vec::new());
                    }
                }
                conversation.status = ConversationStatus::Idle;
                FrameProgress::Completed
            }
            StreamFrame::Unknown => {
                tracing::warn!(target_index = self.target, "ignoring unknown frame kind");
                FrameProgress::Continue
            }
        }
    }

    fn warn_out_of_range(&self, kind: &str) {
        tracing::warn!(
            target_index = self.target,
            kind,
            "dropping frame addressed outside the ledger"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::model::{Query, Source};
    use crate::conversation::QueryLedger;

    fn source(title: &str) -> Source {
        Source {
            title: title.to_string(),
            text: format!("text of {title}"),
            origin: format!("docs/{title}"),
        }
    }

    fn conversation_with_query(question: &str) -> Conversation {
        Conversation {
            ledger: QueryLedger::from_queries(vec![Query::new(question)]),
            status: ConversationStatus::Loading,
            conversation_id: None,
        }
    }

    #[test]
    fn applies_a_full_exchange_in_order() {
        let mut conversation = conversation_with_query("hi");
        let mut reducer = FrameReducer::new(0);

        let frames = vec![
            StreamFrame::Id {
                id: "c1".to_string(),
            },
            StreamFrame::Source {
                source: source("s1"),
            },
            StreamFrame::Source {
                source: source("s2"),
            },
            StreamFrame::Source {
                source: source("s3"),
            },
            StreamFrame::Answer {
                answer: "Hello".to_string(),
            },
            StreamFrame::Answer {
                answer: " world".to_string(),
            },
        ];
        for frame in frames {
            assert_eq!(
                reducer.apply(&mut conversation, frame),
                FrameProgress::Continue
            );
        }
        assert_eq!(
            reducer.apply(&mut conversation, StreamFrame::End),
            FrameProgress::Completed
        );

        assert_eq!(conversation.conversation_id.as_deref(), Some("c1"));
        assert_eq!(conversation.status, ConversationStatus::Idle);

        let entry = conversation.ledger.get(0).expect("entry");
        assert_eq!(entry.response, "Hello world");
        assert_eq!(entry.sources.as_ref().map(Vec::len), Some(3));
        assert_eq!(entry.error, None);
    }

    #[test]
    fn answer_deltas_concatenate_in_arrival_order() {
        let mut conversation = conversation_with_query("order");
        let mut reducer = FrameReducer::new(0);

        for delta in ["a", "b", "c", "d"] {
            reducer.apply(
                &mut conversation,
                StreamFrame::Answer {
                    answer: delta.to_string(),
                },
            );
        }

        assert_eq!(conversation.ledger.get(0).expect("entry").response, "abcd");
    }

    #[test]
    fn end_without_sources_defaults_to_an_empty_list() {
        let mut conversation = conversation_with_query("no sources");
        let mut reducer = FrameReducer::new(0);

        reducer.apply(
            &mut conversation,
            StreamFrame::Answer {
                answer: "x".to_string(),
            },
        );
        reducer.apply(&mut conversation, StreamFrame::End);

        let entry = conversation.ledger.get(0).expect("entry");
        assert_eq!(entry.sources, Some(Vec::new()));
        assert_eq!(conversation.status, ConversationStatus::Idle);
    }

    #[test]
    fn end_keeps_sources_already_emitted() {
        let mut conversation = conversation_with_query("sourced");
        let mut reducer = FrameReducer::new(0);

        reducer.apply(
            &mut conversation,
            StreamFrame::Source {
                source: source("s1"),
            },
        );
        reducer.apply(&mut conversation, StreamFrame::End);

        let entry = conversation.ledger.get(0).expect("entry");
        assert_eq!(entry.sources.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn error_frame_is_terminal() {
        let mut conversation = conversation_with_query("will fail");
        let mut reducer = FrameReducer::new(0);

        reducer.apply(
            &mut conversation,
            StreamFrame::Answer {
                answer: "partial".to_string(),
            },
        );
        assert_eq!(
            reducer.apply(
                &mut conversation,
                StreamFrame::Error {
                    error: "quota exceeded".to_string(),
                },
            ),
            FrameProgress::Failed
        );

        // Frames after the error must not mutate state, `end` included.
        reducer.apply(
            &mut conversation,
            StreamFrame::Answer {
                answer: " more".to_string(),
            },
        );
        reducer.apply(
            &mut conversation,
            StreamFrame::Source {
                source: source("late"),
            },
        );
        reducer.apply(&mut conversation, StreamFrame::End);

        let entry = conversation.ledger.get(0).expect("entry");
        assert_eq!(entry.response, "partial");
        assert_eq!(entry.sources, None);
        assert_eq!(entry.error.as_deref(), Some("quota exceeded"));
        assert_eq!(conversation.status, ConversationStatus::Failed);
    }

    #[test]
    fn unknown_frames_are_ignored() {
        let mut conversation = conversation_with_query("hi");
        let before = conversation.clone();
        let mut reducer = FrameReducer::new(0);

        assert_eq!(
            reducer.apply(&mut conversation, StreamFrame::Unknown),
            FrameProgress::Continue
        );
        assert_eq!(conversation, before);
    }

    #[test]
    fn frames_addressed_outside_the_ledger_are_dropped() {
        let mut conversation = conversation_with_query("hi");
        let mut reducer = FrameReducer::new(7);

        reducer.apply(
            &mut conversation,
            StreamFrame::Answer {
                answer: "lost".to_string(),
            },
        );

        assert_eq!(conversation.ledger.get(0).expect("entry").response, "");
    }

    #[test]
    fn id_frame_does_not_touch_the_addressed_entry() {
        let mut conversation = conversation_with_query("hi");
        let mut reducer = FrameReducer::new(0);

        reducer.apply(
            &mut conversation,
            StreamFrame::Id {
                id: "c9".to_string(),
            },
        );

        let entry = conversation.ledger.get(0).expect("entry");
        assert_eq!(entry.response, "");
        assert_eq!(entry.sources, None);
        assert_eq!(conversation.status, ConversationStatus::Loading);
    }
}

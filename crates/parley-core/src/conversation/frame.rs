//! Event frames of a streaming exchange.

use serde::{Deserialize, Serialize};

use super::model::Source;
use crate::error::Result;

/// One discrete event in a streaming exchange.
///
/// Frames arrive strictly in transmission order and must be applied in that
/// order: the answer text is built by ordered concatenation, so reordering
/// corrupts the output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamFrame {
    /// The backend assigned the persisted conversation id.
    Id { id: String },
    /// One retrieved source to record against the addressed exchange.
    Source { source: Source },
    /// An incremental piece of answer text.
    Answer { answer: String },
    /// The service reported a failure; terminal for this exchange.
    Error { error: String },
    /// The exchange completed normally.
    End,
    /// A frame kind this client does not recognize. Ignored by the reducer.
    #[serde(other)]
    Unknown,
}

impl StreamFrame {
    /// Parses a single frame from its JSON wire form.
    ///
    /// Unrecognized `type` tags deserialize to [`StreamFrame::Unknown`];
    /// only malformed JSON is an error.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_known_frame_kind() {
        assert_eq!(
            StreamFrame::from_json(r#"{"type":"id","id":"c1"}"#).unwrap(),
            StreamFrame::Id {
                id: "c1".to_string()
            }
        );
        assert_eq!(
            StreamFrame::from_json(
                r#"{"type":"source","source":{"title":"guide.md","text":"...","origin":"docs/guide.md"}}"#
            )
            .unwrap(),
            StreamFrame::Source {
                source: Source {
                    title: "guide.md".to_string(),
                    text: "...".to_string(),
                    origin: "docs/guide.md".to_string(),
                }
            }
        );
        assert_eq!(
            StreamFrame::from_json(r#"{"type":"answer","answer":"Hello"}"#).unwrap(),
            StreamFrame::Answer {
                answer: "Hello".to_string()
            }
        );
        assert_eq!(
            StreamFrame::from_json(r#"{"type":"error","error":"boom"}"#).unwrap(),
            StreamFrame::Error {
                error: "boom".to_string()
            }
        );
        assert_eq!(
            StreamFrame::from_json(r#"{"type":"end"}"#).unwrap(),
            StreamFrame::End
        );
    }

    #[test]
    fn unknown_frame_kind_parses_to_unknown() {
        assert_eq!(
            StreamFrame::from_json(r#"{"type":"telemetry","elapsed_ms":12}"#).unwrap(),
            StreamFrame::Unknown
        );
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(StreamFrame::from_json("{not json").is_err());
    }
}

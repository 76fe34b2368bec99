//! Decoding of the streaming answer wire format.
//!
//! The backend emits one event per line, `data: {json}` style. The decoder
//! buffers raw bytes, splits them on newlines, and parses each payload into
//! a [`StreamFrame`]. A line that fails to parse is logged and skipped
//! rather than terminating the exchange; only a transport error ends the
//! stream early.

use std::fmt::Display;
use std::pin::Pin;

use futures::{Stream, StreamExt};
use parley_core::conversation::{FrameStream, StreamFrame};
use parley_core::error::{ParleyError, Result};

/// Wraps a raw byte-chunk stream into an ordered frame sequence.
pub(crate) fn decode_frames<S, B, E>(chunks: S) -> FrameStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let decoder = FrameDecoder::new(chunks);
    Box::pin(futures::stream::unfold(decoder, |mut decoder| async move {
        decoder.next_frame().await.map(|frame| (frame, decoder))
    }))
}

struct FrameDecoder<S> {
    chunks: Pin<Box<S>>,
    buffer: Vec<u8>,
    done: bool,
}

impl<S, B, E> FrameDecoder<S>
where
    S: Stream<Item = std::result::Result<B, E>> + Send,
    B: AsRef<[u8]> + Send,
    E: Display + Send,
{
    fn new(chunks: S) -> Self {
        Self {
            chunks: Box::pin(chunks),
            buffer: Vec::new(),
            done: false,
        }
    }

    /// Yields the next parseable frame, or `None` once the stream ends.
    async fn next_frame(&mut self) -> Option<Result<StreamFrame>> {
        loop {
            // Drain complete lines already buffered before reading more.
            while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = self.buffer.drain(..=newline).collect();
                if let Some(frame) = parse_line(&line) {
                    return Some(Ok(frame));
                }
            }

            if self.done {
                return None;
            }

            match self.chunks.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(chunk.as_ref()),
                Some(Err(error)) => {
                    self.done = true;
                    return Some(Err(ParleyError::transport(format!(
                        "answer stream interrupted: {error}"
                    ))));
                }
                None => {
                    self.done = true;
                    // A trailing line without a final newline still counts.
                    if !self.buffer.is_empty() {
                        let line = std::mem::take(&mut self.buffer);
                        if let Some(frame) = parse_line(&line) {
                            return Some(Ok(frame));
                        }
                    }
                    return None;
                }
            }
        }
    }
}

/// Parses one wire line into a frame.
///
/// Returns `None` for blank lines, non-data lines (comments, `event:` and
/// `retry:` fields), and malformed payloads.
fn parse_line(line: &[u8]) -> Option<StreamFrame> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let payload = match line.strip_prefix("data:") {
        Some(rest) => rest.trim(),
        // Tolerate bare NDJSON lines; skip everything else.
        None if line.starts_with('{') => line,
        None => {
            tracing::debug!(line = %line, "skipping non-data stream line");
            return None;
        }
    };

    match StreamFrame::from_json(payload) {
        Ok(frame) => Some(frame),
        Err(error) => {
            tracing::warn!(%error, "skipping malformed stream frame");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    type Chunk = std::result::Result<&'static [u8], String>;

    async fn collect(chunks: Vec<Chunk>) -> Vec<Result<StreamFrame>> {
        decode_frames(stream::iter(chunks)).collect().await
    }

    #[tokio::test]
    async fn decodes_one_frame_per_data_line() {
        let frames = collect(vec![Ok(
            b"data: {\"type\":\"id\",\"id\":\"c1\"}\n\ndata: {\"type\":\"end\"}\n\n" as &[u8],
        )])
        .await;

        assert_eq!(frames.len(), 2);
        assert_eq!(
            *frames[0].as_ref().unwrap(),
            StreamFrame::Id {
                id: "c1".to_string()
            }
        );
        assert_eq!(*frames[1].as_ref().unwrap(), StreamFrame::End);
    }

    #[tokio::test]
    async fn reassembles_frames_split_across_chunks() {
        let frames = collect(vec![
            Ok(b"data: {\"type\":\"answer\",\"ans" as &[u8]),
            Ok(b"wer\":\"Hello\"}\nda" as &[u8]),
            Ok(b"ta: {\"type\":\"end\"}\n" as &[u8]),
        ])
        .await;

        assert_eq!(frames.len(), 2);
        assert_eq!(
            *frames[0].as_ref().unwrap(),
            StreamFrame::Answer {
                answer: "Hello".to_string()
            }
        );
        assert_eq!(*frames[1].as_ref().unwrap(), StreamFrame::End);
    }

    #[tokio::test]
    async fn skips_malformed_and_non_data_lines() {
        let frames = collect(vec![Ok(
            b": keep-alive\nretry: 3000\ndata: {broken\ndata: {\"type\":\"end\"}\n" as &[u8],
        )])
        .await;

        assert_eq!(frames.len(), 1);
        assert_eq!(*frames[0].as_ref().unwrap(), StreamFrame::End);
    }

    #[tokio::test]
    async fn parses_a_trailing_line_without_newline() {
        let frames = collect(vec![Ok(b"data: {\"type\":\"end\"}" as &[u8])]).await;

        assert_eq!(frames.len(), 1);
        assert_eq!(*frames[0].as_ref().unwrap(), StreamFrame::End);
    }

    #[tokio::test]
    async fn accepts_bare_ndjson_lines() {
        let frames =
            collect(vec![Ok(b"{\"type\":\"answer\",\"answer\":\"hi\"}\n" as &[u8])]).await;

        assert_eq!(frames.len(), 1);
        assert_eq!(
            *frames[0].as_ref().unwrap(),
            StreamFrame::Answer {
                answer: "hi".to_string()
            }
        );
    }

    #[tokio::test]
    async fn transport_error_ends_the_stream() {
        let frames = collect(vec![
            Ok(b"data: {\"type\":\"answer\",\"answer\":\"x\"}\n" as &[u8]),
            Err("connection reset".to_string()),
        ])
        .await;

        assert_eq!(frames.len(), 2);
        assert!(frames[0].is_ok());
        assert!(matches!(
            frames[1].as_ref().unwrap_err(),
            ParleyError::Transport(_)
        ));
    }
}

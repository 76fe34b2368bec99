//! HTTP implementation of the answering service.

use std::time::Duration;

use async_trait::async_trait;
use parley_core::conversation::{
    AnswerMode, AnswerRequest, AnswerService, AtomicAnswer, FrameStream, Query,
};
use parley_core::error::{ParleyError, Result};
use reqwest::Client;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::sse::decode_frames;

const ANSWER_TIMEOUT: Duration = Duration::from_secs(120);

/// Talks to a document Q&A backend over HTTP.
///
/// Streaming exchanges go through `POST {base}/stream`, which responds with
/// one `data: {json}` event frame per line; non-streaming exchanges go
/// through `POST {base}/api/answer`, which responds with one complete JSON
/// payload.
#[derive(Clone)]
pub struct HttpAnswerService {
    client: Client,
    config: ClientConfig,
}

#[derive(Debug, Serialize)]
struct AnswerBody<'a> {
    question: &'a str,
    history: &'a [Query],
    #[serde(skip_serializing_if = "Option::is_none")]
    conversation_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

impl HttpAnswerService {
    /// Creates a service with the provided configuration.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn body<'a>(&'a self, request: &'a AnswerRequest) -> AnswerBody<'a> {
        AnswerBody {
            question: &request.question,
            history: &request.history,
            conversation_id: request.conversation_id.as_deref(),
            api_key: self.config.api_key.as_deref(),
        }
    }
}

#[async_trait]
impl AnswerService for HttpAnswerService {
    fn mode(&self) -> AnswerMode {
        self.config.mode
    }

    async fn stream_answer(&self, request: AnswerRequest) -> Result<FrameStream> {
        let url = format!("{}/stream", self.config.api_url);

        let response = self
            .client
            .post(&url)
            .json(&self.body(&request))
            .send()
            .await
            .map_err(|e| ParleyError::transport(format!("failed to open answer stream: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ParleyError::service(format!(
                "answer stream rejected ({status}): {error_text}"
            )));
        }

        Ok(decode_frames(response.bytes_stream()))
    }

    async fn fetch_answer(&self, request: AnswerRequest) -> Result<AtomicAnswer> {
        let url = format!("{}/api/answer", self.config.api_url);

        let response = self
            .client
            .post(&url)
            .json(&self.body(&request))
            .timeout(ANSWER_TIMEOUT)
            .send()
            .await
            .map_err(|e| ParleyError::transport(format!("answer request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ParleyError::service(format!(
                "answer request rejected ({status}): {error_text}"
            )));
        }

        Ok(response.json::<AtomicAnswer>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_omits_absent_optional_fields() {
        let service = HttpAnswerService::new(ClientConfig::new("http://example.test"));
        let request = AnswerRequest {
            question: "q".to_string(),
            history: Vec::new(),
            conversation_id: None,
        };

        let body = serde_json::to_value(service.body(&request)).unwrap();

        assert_eq!(body["question"], "q");
        assert!(body.get("conversation_id").is_none());
        assert!(body.get("api_key").is_none());
    }

    #[test]
    fn body_carries_conversation_id_and_api_key() {
        let service =
            HttpAnswerService::new(ClientConfig::new("http://example.test").with_api_key("k"));
        let request = AnswerRequest {
            question: "q".to_string(),
            history: vec![Query::new("earlier")],
            conversation_id: Some("c1".to_string()),
        };

        let body = serde_json::to_value(service.body(&request)).unwrap();

        assert_eq!(body["conversation_id"], "c1");
        assert_eq!(body["api_key"], "k");
        assert_eq!(body["history"][0]["question"], "earlier");
    }
}

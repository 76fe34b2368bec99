//! HTTP implementation of the conversation listing and persistence service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parley_core::conversation::{ConversationStore, ConversationSummary, Query};
use parley_core::error::{ParleyError, Result};
use reqwest::Client;
use tokio::sync::RwLock;

use crate::config::ClientConfig;

const LISTING_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches the persisted conversation list and stored conversations.
///
/// The most recently fetched listing is cached so collaborators can read it
/// without another round trip; `refresh` replaces the cache wholesale.
#[derive(Clone)]
pub struct HttpConversationStore {
    client: Client,
    config: ClientConfig,
    conversations: Arc<RwLock<Vec<ConversationSummary>>>,
}

impl HttpConversationStore {
    /// Creates a store with the provided configuration and an empty cache.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            conversations: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Returns the most recently fetched conversation listing.
    pub async fn conversations(&self) -> Vec<ConversationSummary> {
        self.conversations.read().await.clone()
    }
}

#[async_trait]
impl ConversationStore for HttpConversationStore {
    async fn refresh(&self) -> Result<()> {
        let url = format!("{}/api/get_conversations", self.config.api_url);

        let response = self
            .client
            .get(&url)
            .timeout(LISTING_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                ParleyError::transport(format!("failed to fetch conversation list: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ParleyError::service(format!(
                "conversation list request rejected ({status})"
            )));
        }

        let fetched = response.json::<Vec<ConversationSummary>>().await?;
        *self.conversations.write().await = fetched;
        Ok(())
    }

    async fn fetch_conversation(&self, conversation_id: &str) -> Result<Vec<Query>> {
        let url = format!("{}/api/get_single_conversation", self.config.api_url);

        let response = self
            .client
            .get(&url)
            .query(&[("id", conversation_id)])
            .timeout(LISTING_TIMEOUT)
            .send()
            .await
            .map_err(|e| ParleyError::transport(format!("failed to fetch conversation: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ParleyError::service(format!(
                "conversation request rejected ({status}): {conversation_id}"
            )));
        }

        Ok(response.json::<Vec<Query>>().await?)
    }
}

//! Exchange lifecycle coordination.

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Enforces "at most one active exchange" for a conversation.
///
/// The coordinator owns the cancellation token of the current exchange.
/// Beginning a new exchange cancels the previous token, so transitions still
/// tagged with it are dropped at the mutation choke point even if the
/// superseded network call eventually resolves.
///
/// This is an owned instance rather than process-global state, so engines
/// can run and be tested in isolation.
#[derive(Debug, Default)]
pub struct RequestCoordinator {
    current: Mutex<Option<CancellationToken>>,
}

impl RequestCoordinator {
    /// Creates a coordinator with no active exchange.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels any in-flight exchange and opens a new one.
    ///
    /// Returns the token bound to the new exchange. The exchange must check
    /// the token before every state transition it applies.
    pub async fn begin(&self) -> CancellationToken {
        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            previous.cancel();
        }

        let token = CancellationToken::new();
        *current = Some(token.clone());
        token
    }

    /// Explicitly cancels the current exchange, if any.
    ///
    /// Cancellation is not an error: the aborted exchange leaves whatever
    /// partial state it had accumulated and records no failure.
    pub async fn abort(&self) {
        let mut current = self.current.lock().await;
        if let Some(token) = current.take() {
            token.cancel();
        }
    }
}

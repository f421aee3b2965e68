//! Seams between the decision pipeline and the outside world.
//!
//! The pipeline only depends on these traits; the HTTP service wires in the
//! Postgres store, the OpenAI-compatible gateway and the Chatra notifier.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::mode::Stage;
use crate::turns::{NewTurn, Turn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("message store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway call timed out")]
    Timeout,
    #[error("gateway transport error: {0}")]
    Transport(String),
    #[error("gateway returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("gateway returned no completion")]
    EmptyResponse,
}

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("notifier transport error: {0}")]
    Transport(String),
    #[error("notifier returned status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Durable, append-only conversation history.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append(&self, turn: NewTurn) -> Result<Turn, StoreError>;

    /// All turns of a conversation, oldest first.
    async fn load_history(&self, conversation_id: &str) -> Result<Vec<Turn>, StoreError>;

    async fn health(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// One prompt/response exchange with the language model.
#[derive(Debug, Clone)]
pub struct StageRequest {
    pub stage: Stage,
    pub prompt: &'static str,
    pub input: Value,
}

#[async_trait]
pub trait Gateway: Send + Sync {
    /// Returns the raw completion text; parsing is the caller's job.
    async fn invoke(&self, request: StageRequest) -> Result<String, GatewayError>;
}

/// Delivers client-visible replies and operator-visible notes.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver_to_client(&self, client_id: &str, text: &str) -> Result<(), NotifierError>;

    async fn escalate_to_operator(&self, client_id: &str, note: &str)
    -> Result<(), NotifierError>;
}

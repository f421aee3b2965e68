use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use crate::ports::{MessageStore, StoreError};
use crate::turns::{NewTurn, Turn};

/// Process-local message store. Used by tests and local runs without Postgres.
#[derive(Debug)]
pub struct MemoryStore {
    turns: Mutex<Vec<Turn>>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            turns: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every call fails with `StoreError::Unavailable` until re-enabled.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Every turn across all conversations, in insertion order.
    pub fn all_turns(&self) -> Vec<Turn> {
        self.turns.lock().map(|t| t.clone()).unwrap_or_default()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store disabled".to_string()))
        }
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn append(&self, turn: NewTurn) -> Result<Turn, StoreError> {
        self.check_available()?;
        let mut turns = self
            .turns
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".to_string()))?;
        let stored = Turn {
            id: turns.len() as i64 + 1,
            conversation_id: turn.conversation_id,
            originator: turn.originator,
            client_id: turn.client_id,
            text: turn.text,
            created_at: Utc::now(),
        };
        turns.push(stored.clone());
        Ok(stored)
    }

    async fn load_history(&self, conversation_id: &str) -> Result<Vec<Turn>, StoreError> {
        self.check_available()?;
        let turns = self
            .turns
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".to_string()))?;
        Ok(turns
            .iter()
            .filter(|turn| turn.conversation_id == conversation_id)
            .cloned()
            .collect())
    }

    async fn health(&self) -> Result<(), StoreError> {
        self.check_available()
    }
}

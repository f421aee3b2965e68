use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockTable = DashMap<String, Arc<Mutex<()>>>;

/// Keyed async mutexes, one per conversation.
///
/// A guard serialises everything that reads and then appends to one
/// conversation's history. Entries are removed once nobody holds or waits on them.
#[derive(Debug, Clone, Default)]
pub struct ConversationLocks {
    table: Arc<LockTable>,
}

impl ConversationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, conversation_id: &str) -> ConversationGuard {
        let mutex = self
            .table
            .entry(conversation_id.to_string())
            .or_default()
            .clone();
        let guard = mutex.lock_owned().await;
        ConversationGuard {
            guard: Some(guard),
            conversation_id: conversation_id.to_string(),
            table: self.table.clone(),
        }
    }

    /// Number of conversations with a live lock entry.
    pub fn active(&self) -> usize {
        self.table.len()
    }
}

/// Held for the duration of one run. Released on drop, including when the
/// owning future is cancelled.
#[derive(Debug)]
pub struct ConversationGuard {
    guard: Option<OwnedMutexGuard<()>>,
    conversation_id: String,
    table: Arc<LockTable>,
}

impl Drop for ConversationGuard {
    fn drop(&mut self) {
        self.guard.take();
        self.table
            .remove_if(&self.conversation_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

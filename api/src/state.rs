use std::sync::Arc;

use bridge_core::orchestrator::Orchestrator;
use bridge_core::ports::MessageStore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub store: Arc<dyn MessageStore>,
    /// Webhook processing runs after the ACK; shutdown waits on this tracker.
    pub tasks: TaskTracker,
    pub shutdown: CancellationToken,
    pub webhook_secret: Option<String>,
}

pub mod conversations;
pub mod health;
pub mod webhook;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use bridge_core::orchestrator::{Orchestrator, PipelineConfig};
    use bridge_core::routing::DeliveryPolicy;
    use bridge_core::store::MemoryStore;
    use bridge_core::testing::{RecordingNotifier, ScriptedGateway};
    use tokio_util::sync::CancellationToken;
    use tokio_util::task::TaskTracker;

    use crate::state::AppState;

    pub struct TestApp {
        pub state: AppState,
        pub store: Arc<MemoryStore>,
        pub gateway: Arc<ScriptedGateway>,
        pub notifier: Arc<RecordingNotifier>,
    }

    impl TestApp {
        pub fn new(
            gateway: ScriptedGateway,
            delivery: DeliveryPolicy,
            secret: Option<&str>,
        ) -> Self {
            let store = Arc::new(MemoryStore::new());
            let gateway = Arc::new(gateway);
            let notifier = Arc::new(RecordingNotifier::new());
            let orchestrator = Orchestrator::new(
                store.clone(),
                gateway.clone(),
                notifier.clone(),
                PipelineConfig {
                    delivery,
                    ..PipelineConfig::default()
                },
            );
            let state = AppState {
                orchestrator: Arc::new(orchestrator),
                store: store.clone(),
                tasks: TaskTracker::new(),
                shutdown: CancellationToken::new(),
                webhook_secret: secret.map(str::to_string),
            };
            Self {
                state,
                store,
                gateway,
                notifier,
            }
        }

        /// Wait for every background task spawned so far.
        pub async fn drain(&self) {
            self.state.tasks.close();
            self.state.tasks.wait().await;
        }
    }
}

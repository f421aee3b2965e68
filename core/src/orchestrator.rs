use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::context::{ConversationContext, InboundMessage};
use crate::locks::ConversationLocks;
use crate::mode::{Mode, Stage};
use crate::pipeline::{self, DEFAULT_STAGE_TIMEOUT, PipelineOutcome, PipelineState};
use crate::ports::{Gateway, MessageStore, Notifier, NotifierError, StoreError};
use crate::routing::{DeliveryPolicy, RoutingAction, RoutingDecision, RoutingGate};
use crate::turns::{HistoryView, NewTurn, Originator, Turn};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub stage_timeout: Duration,
    pub delivery: DeliveryPolicy,
    /// Static reference text offered to the fact selector
    pub domain_knowledge: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
            delivery: DeliveryPolicy::disabled(),
            domain_knowledge: String::new(),
        }
    }
}

/// Faults that abort an invocation. Stage problems never end up here.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("notifier failed after deciding to {action:?}: {source}")]
    Notifier {
        action: RoutingAction,
        #[source]
        source: NotifierError,
    },
}

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationReport {
    pub decision: RoutingDecision,
    pub final_mode: Option<Mode>,
    pub reached: Option<PipelineState>,
    pub stages_run: Vec<Stage>,
    pub client_turn_id: Option<i64>,
    pub automated_turn_id: Option<i64>,
}

impl InvocationReport {
    fn dropped() -> Self {
        Self {
            decision: RoutingDecision::drop(),
            final_mode: None,
            reached: None,
            stages_run: Vec::new(),
            client_turn_id: None,
            automated_turn_id: None,
        }
    }
}

/// Runs the decision pipeline for inbound messages and acts on the result.
pub struct Orchestrator {
    store: Arc<dyn MessageStore>,
    gateway: Arc<dyn Gateway>,
    notifier: Arc<dyn Notifier>,
    locks: ConversationLocks,
    gate: RoutingGate,
    config: PipelineConfig,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn MessageStore>,
        gateway: Arc<dyn Gateway>,
        notifier: Arc<dyn Notifier>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            notifier,
            locks: ConversationLocks::new(),
            gate: RoutingGate::new(config.delivery),
            config,
        }
    }

    pub fn locks(&self) -> &ConversationLocks {
        &self.locks
    }

    /// Handle one client message end to end.
    ///
    /// The client turn is persisted before any gateway call. The conversation
    /// lock is held until the notifier returns; dropping the returned future
    /// releases it.
    pub async fn handle_incoming(
        &self,
        message: InboundMessage,
    ) -> Result<InvocationReport, BridgeError> {
        if message.text.trim().is_empty() {
            tracing::debug!(
                conversation_id = %message.conversation_id,
                "dropping empty client message"
            );
            return Ok(InvocationReport::dropped());
        }

        let _guard = self.locks.acquire(&message.conversation_id).await;
        tracing::info!(
            conversation_id = %message.conversation_id,
            client_id = %message.client_id,
            "handling client message"
        );

        let client_turn = self
            .store
            .append(NewTurn {
                conversation_id: message.conversation_id.clone(),
                originator: Originator::Client,
                client_id: Some(message.client_id.clone()),
                text: message.text.clone(),
            })
            .await?;

        let turns = self.store.load_history(&message.conversation_id).await?;
        let history = HistoryView::from_turns(turns, Some(client_turn.id));
        let context = ConversationContext::new(&message, &self.config.domain_knowledge);
        tracing::debug!(
            conversation_id = %message.conversation_id,
            history_len = history.len(),
            "history loaded"
        );

        let run = pipeline::run(
            self.gateway.as_ref(),
            self.config.stage_timeout,
            &history,
            &context,
        )
        .await;
        let decision = self.gate.decide(&run.outcome);

        tracing::info!(
            conversation_id = %message.conversation_id,
            final_mode = %run.final_mode,
            reached = ?run.reached,
            action = ?decision.action,
            "pipeline finished"
        );

        let mut automated_turn_id = None;
        match decision.action {
            RoutingAction::Deliver => {
                debug_assert!(matches!(run.outcome, PipelineOutcome::Verified(_)));
                let turn = self
                    .store
                    .append(NewTurn {
                        conversation_id: message.conversation_id.clone(),
                        originator: Originator::Automated,
                        client_id: Some(message.client_id.clone()),
                        text: decision.payload_text.clone(),
                    })
                    .await?;
                automated_turn_id = Some(turn.id);
                self.notifier
                    .deliver_to_client(&message.client_id, &decision.payload_text)
                    .await
                    .map_err(|source| BridgeError::Notifier {
                        action: RoutingAction::Deliver,
                        source,
                    })?;
            }
            RoutingAction::Escalate => {
                self.notifier
                    .escalate_to_operator(&message.client_id, &decision.payload_text)
                    .await
                    .map_err(|source| BridgeError::Notifier {
                        action: RoutingAction::Escalate,
                        source,
                    })?;
            }
            RoutingAction::Drop => {}
        }

        Ok(InvocationReport {
            decision,
            final_mode: Some(run.final_mode),
            reached: Some(run.reached),
            stages_run: run.stages_run,
            client_turn_id: Some(client_turn.id),
            automated_turn_id,
        })
    }

    /// Persist a turn without running the pipeline (operator replies).
    /// Shares the conversation lock so history order stays consistent.
    pub async fn record_only(&self, turn: NewTurn) -> Result<Turn, BridgeError> {
        let _guard = self.locks.acquire(&turn.conversation_id).await;
        tracing::info!(
            conversation_id = %turn.conversation_id,
            originator = turn.originator.as_str(),
            "recording turn"
        );
        Ok(self.store.append(turn).await?)
    }

    pub async fn history(&self, conversation_id: &str) -> Result<Vec<Turn>, BridgeError> {
        let turns = self.store.load_history(conversation_id).await?;
        Ok(HistoryView::from_turns(turns, None).turns().to_vec())
    }
}

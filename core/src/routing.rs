use std::fmt;

use serde::Serialize;
use utoipa::ToSchema;

use crate::mode::{Mode, Stage};
use crate::pipeline::PipelineOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoutingAction {
    Deliver,
    Escalate,
    Drop,
}

/// Whether a terminal mode may reach the client. Injected, never global.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryPolicy {
    pub auto_delivery: bool,
}

impl DeliveryPolicy {
    pub fn enabled() -> Self {
        Self {
            auto_delivery: true,
        }
    }

    pub fn disabled() -> Self {
        Self {
            auto_delivery: false,
        }
    }

    pub fn permits(&self, mode: Mode) -> bool {
        self.auto_delivery && action_for(mode) == RoutingAction::Deliver
    }
}

/// Where and why automation stopped, as shown to the operator.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Diagnostic {
    pub stage: Stage,
    pub mode: Mode,
    pub facts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[AI] automation stopped")?;
        writeln!(f, "stage: {}", self.stage)?;
        writeln!(f, "mode: {}", self.mode)?;
        if let Some(reason) = &self.reason {
            writeln!(f, "reason: {reason}")?;
        }
        if self.facts.is_empty() {
            writeln!(f, "facts: (none)")?;
        } else {
            writeln!(f, "facts:")?;
            for fact in &self.facts {
                writeln!(f, "- {fact}")?;
            }
        }
        if let Some(draft) = self.draft_answer.as_deref().filter(|d| !d.is_empty()) {
            write!(f, "\ndraft:\n{draft}")?;
        }
        Ok(())
    }
}

/// The pipeline's externally visible decision.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RoutingDecision {
    pub action: RoutingAction,
    pub payload_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<Diagnostic>,
}

impl RoutingDecision {
    pub fn drop() -> Self {
        Self {
            action: RoutingAction::Drop,
            payload_text: String::new(),
            diagnostic: None,
        }
    }

    fn escalate(diagnostic: Diagnostic) -> Self {
        Self {
            action: RoutingAction::Escalate,
            payload_text: diagnostic.to_string(),
            diagnostic: Some(diagnostic),
        }
    }
}

/// `SELF_CONFIDENCE` delivers; every other mode escalates.
pub fn action_for(mode: Mode) -> RoutingAction {
    match mode {
        Mode::SelfConfidence => RoutingAction::Deliver,
        Mode::NeedOperator | Mode::ParseError | Mode::AiError => RoutingAction::Escalate,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RoutingGate {
    policy: DeliveryPolicy,
}

impl RoutingGate {
    pub fn new(policy: DeliveryPolicy) -> Self {
        Self { policy }
    }

    /// Only a verified answer can be delivered. When the policy withholds
    /// delivery the operator receives the verified draft instead.
    pub fn decide(&self, outcome: &PipelineOutcome) -> RoutingDecision {
        match outcome {
            PipelineOutcome::Verified(answer) if self.policy.permits(Mode::SelfConfidence) => {
                RoutingDecision {
                    action: RoutingAction::Deliver,
                    payload_text: answer.text().to_string(),
                    diagnostic: None,
                }
            }
            PipelineOutcome::Verified(answer) => RoutingDecision::escalate(Diagnostic {
                stage: Stage::AnswerValidator,
                mode: Mode::SelfConfidence,
                facts: answer.facts_used().to_vec(),
                draft_answer: Some(answer.text().to_string()),
                reason: Some("automatic delivery is disabled".to_string()),
            }),
            PipelineOutcome::Escalated(diagnostic) => {
                RoutingDecision::escalate(diagnostic.clone())
            }
        }
    }
}

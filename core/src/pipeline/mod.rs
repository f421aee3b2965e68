//! The four-stage decision pipeline.
//!
//! `FACT_SELECTOR → FACT_VALIDATOR → ANSWER_BUILDER → ANSWER_VALIDATOR`, each
//! backed by one gateway call. A stage that does not return `SELF_CONFIDENCE`
//! ends the run with an escalation; only a passing answer validation yields
//! a [`VerifiedAnswer`].

pub mod answer_builder;
pub mod answer_validator;
pub mod fact_selector;
pub mod fact_validator;
pub mod parse;
pub mod prompts;

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::ConversationContext;
use crate::mode::{Mode, Stage};
use crate::ports::{Gateway, GatewayError, StageRequest};
use crate::routing::Diagnostic;
use crate::turns::HistoryView;

pub use answer_builder::DraftAnswer;
pub use answer_validator::VerifiedAnswer;
pub use fact_selector::FactSet;

/// Default bound on a single stage call.
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    Start,
    FactsSelected,
    FactsValidated,
    AnswerBuilt,
    AnswerValidated,
    Done,
}

/// A stage that produced no verdict at all.
#[derive(Debug, Clone, PartialEq)]
pub struct StageFailure {
    /// `AI_ERROR` or `PARSE_ERROR`
    pub mode: Mode,
    pub reason: String,
}

/// A validator's verdict with the model's optional explanation.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub mode: Mode,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    Verified(VerifiedAnswer),
    Escalated(Diagnostic),
}

/// Result of one full pass through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRun {
    pub outcome: PipelineOutcome,
    /// Last state reached before `DONE`
    pub reached: PipelineState,
    /// Mode reported by the last stage that ran
    pub final_mode: Mode,
    pub stages_run: Vec<Stage>,
}

/// Issues stage calls with a fixed timeout and turns transport or parse
/// problems into failure modes.
pub struct StageRunner<'a> {
    gateway: &'a dyn Gateway,
    timeout: Duration,
}

impl<'a> StageRunner<'a> {
    pub fn new(gateway: &'a dyn Gateway, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }

    pub async fn call<T: DeserializeOwned>(
        &self,
        stage: Stage,
        prompt: &'static str,
        input: Value,
    ) -> Result<T, StageFailure> {
        let request = StageRequest {
            stage,
            prompt,
            input,
        };
        let raw = match tokio::time::timeout(self.timeout, self.gateway.invoke(request)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(err)) => return Err(ai_error(stage, err)),
            Err(_) => return Err(ai_error(stage, GatewayError::Timeout)),
        };

        parse::parse_stage_output(&raw).map_err(|reason| {
            tracing::warn!(stage = %stage, reason = %reason, "malformed stage output");
            StageFailure {
                mode: Mode::ParseError,
                reason,
            }
        })
    }
}

fn ai_error(stage: Stage, err: GatewayError) -> StageFailure {
    tracing::warn!(stage = %stage, error = %err, "gateway call failed");
    StageFailure {
        mode: Mode::AiError,
        reason: err.to_string(),
    }
}

struct RunTrace {
    reached: PipelineState,
    final_mode: Mode,
    stages_run: Vec<Stage>,
}

impl RunTrace {
    fn new() -> Self {
        Self {
            reached: PipelineState::Start,
            final_mode: Mode::NeedOperator,
            stages_run: Vec::with_capacity(4),
        }
    }

    fn record(&mut self, stage: Stage, mode: Mode) {
        self.stages_run.push(stage);
        self.final_mode = mode;
        tracing::debug!(stage = %stage, mode = %mode, "stage verdict");
    }

    fn advance(&mut self, state: PipelineState) {
        self.reached = state;
    }

    fn escalate(self, diagnostic: Diagnostic) -> PipelineRun {
        PipelineRun {
            outcome: PipelineOutcome::Escalated(diagnostic),
            reached: self.reached,
            final_mode: self.final_mode,
            stages_run: self.stages_run,
        }
    }

    fn fail(
        mut self,
        stage: Stage,
        failure: StageFailure,
        facts: &[String],
        draft_answer: Option<String>,
    ) -> PipelineRun {
        self.record(stage, failure.mode);
        self.escalate(Diagnostic {
            stage,
            mode: failure.mode,
            facts: facts.to_vec(),
            draft_answer,
            reason: Some(failure.reason),
        })
    }
}

/// Run all stages for one inbound message.
///
/// Never fails: every stage-local problem becomes a mode and the run always
/// reaches `DONE` with an outcome.
pub async fn run(
    gateway: &dyn Gateway,
    stage_timeout: Duration,
    history: &HistoryView,
    context: &ConversationContext,
) -> PipelineRun {
    let runner = StageRunner::new(gateway, stage_timeout);
    let mut trace = RunTrace::new();

    let fact_set = match fact_selector::select(&runner, history, context).await {
        Ok(fact_set) => fact_set,
        Err(failure) => return trace.fail(Stage::FactSelector, failure, &[], None),
    };
    trace.record(Stage::FactSelector, fact_set.mode);
    if !fact_set.mode.is_confident() {
        return trace.escalate(Diagnostic {
            stage: Stage::FactSelector,
            mode: fact_set.mode,
            facts: fact_set.facts,
            draft_answer: None,
            reason: fact_set.reason,
        });
    }
    trace.advance(PipelineState::FactsSelected);

    let verdict =
        match fact_validator::validate(&runner, history, context, &fact_set.facts).await {
            Ok(verdict) => verdict,
            Err(failure) => {
                return trace.fail(Stage::FactValidator, failure, &fact_set.facts, None);
            }
        };
    trace.record(Stage::FactValidator, verdict.mode);
    if !verdict.mode.is_confident() {
        return trace.escalate(Diagnostic {
            stage: Stage::FactValidator,
            mode: verdict.mode,
            facts: fact_set.facts,
            draft_answer: None,
            reason: verdict.reason,
        });
    }
    trace.advance(PipelineState::FactsValidated);

    let draft = match answer_builder::build(&runner, history, context, &fact_set.facts).await {
        Ok(draft) => draft,
        Err(failure) => {
            return trace.fail(Stage::AnswerBuilder, failure, &fact_set.facts, None);
        }
    };
    trace.record(Stage::AnswerBuilder, draft.mode);
    if !draft.mode.is_confident() {
        return trace.escalate(Diagnostic {
            stage: Stage::AnswerBuilder,
            mode: draft.mode,
            facts: fact_set.facts,
            draft_answer: None,
            reason: draft.reason,
        });
    }
    trace.advance(PipelineState::AnswerBuilt);

    match answer_validator::validate(&runner, context, draft).await {
        Ok(answer_validator::Validation::Passed(answer)) => {
            trace.record(Stage::AnswerValidator, Mode::SelfConfidence);
            trace.advance(PipelineState::AnswerValidated);
            PipelineRun {
                outcome: PipelineOutcome::Verified(answer),
                reached: trace.reached,
                final_mode: trace.final_mode,
                stages_run: trace.stages_run,
            }
        }
        Ok(answer_validator::Validation::Rejected { verdict, draft }) => {
            trace.record(Stage::AnswerValidator, verdict.mode);
            trace.escalate(Diagnostic {
                stage: Stage::AnswerValidator,
                mode: verdict.mode,
                facts: draft.facts_used,
                draft_answer: Some(draft.text),
                reason: verdict.reason,
            })
        }
        Err((failure, draft)) => trace.fail(
            Stage::AnswerValidator,
            failure,
            &draft.facts_used,
            Some(draft.text),
        ),
    }
}

/// Output shape shared by both validators.
#[derive(Debug, Deserialize)]
pub(crate) struct VerdictOutput {
    #[serde(deserialize_with = "parse::verdict")]
    pub mode: Mode,
    #[serde(default)]
    pub reason: Option<String>,
}

impl From<VerdictOutput> for Verdict {
    fn from(output: VerdictOutput) -> Self {
        Self {
            mode: output.mode,
            reason: output.reason.filter(|r| !r.trim().is_empty()),
        }
    }
}

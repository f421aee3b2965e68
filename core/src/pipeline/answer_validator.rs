use serde_json::json;

use super::{DraftAnswer, StageFailure, StageRunner, Verdict, VerdictOutput, prompts};
use crate::context::ConversationContext;
use crate::mode::{Mode, Stage};

/// A drafted answer that passed answer validation.
///
/// There is no public constructor: the only way to obtain one is a
/// `SELF_CONFIDENCE` verdict from [`validate`], and it is the only input the
/// routing gate will deliver to a client.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedAnswer {
    text: String,
    facts_used: Vec<String>,
}

impl VerifiedAnswer {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn facts_used(&self) -> &[String] {
        &self.facts_used
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    Passed(VerifiedAnswer),
    Rejected { verdict: Verdict, draft: DraftAnswer },
}

/// Audit `draft` against the facts it claims to use and the client's question.
///
/// On a stage failure the draft is handed back so the operator note can show it.
pub async fn validate(
    runner: &StageRunner<'_>,
    context: &ConversationContext,
    draft: DraftAnswer,
) -> Result<Validation, (StageFailure, DraftAnswer)> {
    if !draft.mode.is_confident() || draft.text.is_empty() {
        return Ok(Validation::Rejected {
            verdict: Verdict {
                mode: Mode::NeedOperator,
                reason: Some("draft is not deliverable".to_string()),
            },
            draft,
        });
    }

    let input = json!({
        "last_user_text": context.client_text(),
        "answer": draft.text,
        "facts": draft.facts_used,
    });

    let output: VerdictOutput = match runner
        .call(Stage::AnswerValidator, prompts::ANSWER_VALIDATOR, input)
        .await
    {
        Ok(output) => output,
        Err(failure) => return Err((failure, draft)),
    };
    let verdict: Verdict = output.into();

    if verdict.mode.is_confident() {
        Ok(Validation::Passed(VerifiedAnswer {
            text: draft.text,
            facts_used: draft.facts_used,
        }))
    } else {
        Ok(Validation::Rejected { verdict, draft })
    }
}

use serde::Deserialize;
use serde_json::json;

use super::{StageFailure, StageRunner, parse, prompts};
use crate::context::{ConversationContext, normalize};
use crate::mode::{Mode, Stage};
use crate::turns::HistoryView;

/// An answer drafted from validated facts. `text` is empty unless `mode` is
/// `SELF_CONFIDENCE`.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftAnswer {
    pub text: String,
    pub facts_used: Vec<String>,
    pub mode: Mode,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BuilderOutput {
    #[serde(default)]
    answer: String,
    #[serde(default)]
    facts: Vec<String>,
    #[serde(deserialize_with = "parse::verdict")]
    mode: Mode,
    #[serde(default)]
    reason: Option<String>,
}

pub async fn build(
    runner: &StageRunner<'_>,
    history: &HistoryView,
    context: &ConversationContext,
    facts: &[String],
) -> Result<DraftAnswer, StageFailure> {
    let input = json!({
        "history": history.entries(),
        "last_user_text": context.client_text(),
        "facts": facts,
    });

    let output: BuilderOutput = runner
        .call(Stage::AnswerBuilder, prompts::ANSWER_BUILDER, input)
        .await?;

    Ok(finalize(output, facts))
}

/// Cited facts are matched against `validated_facts` and replaced by the
/// validated wording. Citing anything outside that set withdraws confidence.
fn finalize(output: BuilderOutput, validated_facts: &[String]) -> DraftAnswer {
    let text = output.answer.trim().to_string();
    let reason = output.reason.filter(|r| !r.trim().is_empty());

    let mut facts_used: Vec<String> = Vec::new();
    let mut unvalidated: Vec<String> = Vec::new();
    for fact in output.facts {
        let fact = fact.trim();
        if fact.is_empty() {
            continue;
        }
        let needle = normalize(fact);
        match validated_facts.iter().find(|v| normalize(v) == needle) {
            Some(validated) if !facts_used.contains(validated) => {
                facts_used.push(validated.clone())
            }
            Some(_) => {}
            None => unvalidated.push(fact.to_string()),
        }
    }
    if facts_used.is_empty() {
        facts_used = validated_facts.to_vec();
    }

    match output.mode {
        Mode::SelfConfidence if !unvalidated.is_empty() => DraftAnswer {
            text: String::new(),
            facts_used,
            mode: Mode::NeedOperator,
            reason: Some(format!(
                "answer cites facts outside the validated set: {}",
                unvalidated.join("; ")
            )),
        },
        Mode::SelfConfidence if !text.is_empty() => DraftAnswer {
            text,
            facts_used,
            mode: Mode::SelfConfidence,
            reason,
        },
        Mode::SelfConfidence => DraftAnswer {
            text: String::new(),
            facts_used,
            mode: Mode::NeedOperator,
            reason: reason.or_else(|| Some("empty answer".to_string())),
        },
        mode => DraftAnswer {
            text: String::new(),
            facts_used,
            mode,
            reason,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validated() -> Vec<String> {
        vec!["vpn_status: disconnected".to_string()]
    }

    fn output(answer: &str, facts: &[&str], mode: Mode) -> BuilderOutput {
        BuilderOutput {
            answer: answer.to_string(),
            facts: facts.iter().map(|f| f.to_string()).collect(),
            mode,
            reason: None,
        }
    }

    #[test]
    fn confident_answer_is_kept() {
        let draft = finalize(
            output(
                " Your VPN is disconnected. ",
                &["vpn_status: disconnected"],
                Mode::SelfConfidence,
            ),
            &validated(),
        );
        assert_eq!(draft.mode, Mode::SelfConfidence);
        assert_eq!(draft.text, "Your VPN is disconnected.");
        assert_eq!(draft.facts_used, validated());
    }

    #[test]
    fn missing_facts_used_falls_back_to_validated_facts() {
        let draft = finalize(
            output("Your VPN is disconnected.", &[], Mode::SelfConfidence),
            &validated(),
        );
        assert_eq!(draft.facts_used, validated());
    }

    #[test]
    fn need_operator_clears_any_text() {
        let draft = finalize(
            output("I think it might work", &[], Mode::NeedOperator),
            &validated(),
        );
        assert_eq!(draft.mode, Mode::NeedOperator);
        assert!(draft.text.is_empty());
    }

    #[test]
    fn confident_but_empty_answer_needs_operator() {
        let draft = finalize(output("   ", &[], Mode::SelfConfidence), &validated());
        assert_eq!(draft.mode, Mode::NeedOperator);
        assert_eq!(draft.reason.as_deref(), Some("empty answer"));
    }

    #[test]
    fn cited_facts_take_the_validated_wording() {
        let draft = finalize(
            output(
                "Your VPN is disconnected.",
                &["VPN_STATUS:   disconnected", "vpn_status: disconnected"],
                Mode::SelfConfidence,
            ),
            &validated(),
        );
        assert_eq!(draft.mode, Mode::SelfConfidence);
        assert_eq!(draft.facts_used, validated());
    }

    #[test]
    fn citing_an_unvalidated_fact_needs_operator() {
        let draft = finalize(
            output(
                "Our Frankfurt server is down, refunds are automatic.",
                &["Frankfurt server is down", "refunds are automatic"],
                Mode::SelfConfidence,
            ),
            &validated(),
        );
        assert_eq!(draft.mode, Mode::NeedOperator);
        assert!(draft.text.is_empty());
        assert_eq!(draft.facts_used, validated());
        assert_eq!(
            draft.reason.as_deref(),
            Some(
                "answer cites facts outside the validated set: \
                 Frankfurt server is down; refunds are automatic"
            )
        );
    }
}

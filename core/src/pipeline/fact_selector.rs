use serde::Deserialize;
use serde_json::json;

use super::{StageFailure, StageRunner, parse, prompts};
use crate::context::{ConversationContext, normalize};
use crate::mode::{Mode, Stage};
use crate::turns::HistoryView;

/// Literal fragments an answer may rely on.
#[derive(Debug, Clone, PartialEq)]
pub struct FactSet {
    pub facts: Vec<String>,
    pub mode: Mode,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SelectorOutput {
    #[serde(default)]
    facts: Vec<String>,
    #[serde(deserialize_with = "parse::verdict")]
    mode: Mode,
    #[serde(default)]
    reason: Option<String>,
}

pub async fn select(
    runner: &StageRunner<'_>,
    history: &HistoryView,
    context: &ConversationContext,
) -> Result<FactSet, StageFailure> {
    let input = json!({
        "history": history.entries(),
        "last_user_text": context.client_text(),
        "client_info": context.client_profile(),
        "client_integration_data": context.client_integration_data(),
        "cases": context.domain_knowledge(),
    });

    let output: SelectorOutput = runner
        .call(Stage::FactSelector, prompts::FACT_SELECTOR, input)
        .await?;

    Ok(finalize(output, context))
}

fn finalize(output: SelectorOutput, context: &ConversationContext) -> FactSet {
    let mut facts: Vec<String> = Vec::with_capacity(output.facts.len());
    for fact in output.facts {
        let fact = fact.trim().to_string();
        if !fact.is_empty() && !facts.contains(&fact) {
            facts.push(fact);
        }
    }
    sort_by_source_priority(&mut facts, context);

    let reason = output.reason.filter(|r| !r.trim().is_empty());
    if output.mode.is_confident() && facts.is_empty() {
        return FactSet {
            facts,
            mode: Mode::NeedOperator,
            reason: reason.or_else(|| Some("no facts selected".to_string())),
        };
    }

    FactSet {
        facts,
        mode: output.mode,
        reason,
    }
}

/// Client profile facts first, then integration data, then domain knowledge.
/// Facts found in no source keep their relative order at the end.
fn sort_by_source_priority(facts: &mut [String], context: &ConversationContext) {
    let sources: Vec<String> = context
        .fact_sources()
        .iter()
        .map(|s| normalize(s))
        .collect();
    facts.sort_by_key(|fact| {
        let needle = normalize(fact);
        sources
            .iter()
            .position(|source| source.contains(&needle))
            .unwrap_or(sources.len())
    });
}

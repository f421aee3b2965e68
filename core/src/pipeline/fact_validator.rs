use serde_json::json;

use super::{StageFailure, StageRunner, Verdict, VerdictOutput, prompts};
use crate::context::ConversationContext;
use crate::mode::{Mode, Stage};
use crate::turns::HistoryView;

/// Gate progression on whether `facts` can ground an answer.
///
/// Facts that do not occur verbatim in the client data or domain knowledge
/// fail the stage locally, without spending a gateway call.
pub async fn validate(
    runner: &StageRunner<'_>,
    history: &HistoryView,
    context: &ConversationContext,
    facts: &[String],
) -> Result<Verdict, StageFailure> {
    if let Some(verdict) = check_grounding(context, facts) {
        return Ok(verdict);
    }

    let input = json!({
        "history": history.entries(),
        "last_user_text": context.client_text(),
        "facts": facts,
    });

    let output: VerdictOutput = runner
        .call(Stage::FactValidator, prompts::FACT_VALIDATOR, input)
        .await?;
    Ok(output.into())
}

fn check_grounding(context: &ConversationContext, facts: &[String]) -> Option<Verdict> {
    if facts.is_empty() {
        return Some(Verdict {
            mode: Mode::NeedOperator,
            reason: Some("no facts to validate".to_string()),
        });
    }

    let ungrounded: Vec<&str> = facts
        .iter()
        .filter(|fact| !context.is_grounded(fact))
        .map(String::as_str)
        .collect();
    if ungrounded.is_empty() {
        return None;
    }

    tracing::info!(count = ungrounded.len(), "selected facts are not verbatim");
    Some(Verdict {
        mode: Mode::NeedOperator,
        reason: Some(format!("facts not found verbatim: {}", ungrounded.join("; "))),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::context::InboundMessage;

    fn context() -> ConversationContext {
        ConversationContext::new(
            &InboundMessage {
                conversation_id: "chat-1".to_string(),
                client_id: "client-1".to_string(),
                text: "my VPN won't connect".to_string(),
                client_profile: json!({"vpn_status": "disconnected"})
                    .as_object()
                    .cloned()
                    .unwrap_or_default(),
                client_integration_data: Default::default(),
            },
            "",
        )
    }

    #[test]
    fn grounded_facts_defer_to_the_gateway() {
        assert_eq!(
            check_grounding(&context(), &["vpn_status: disconnected".to_string()]),
            None
        );
    }

    #[test]
    fn invented_fact_needs_operator() {
        let verdict = check_grounding(
            &context(),
            &[
                "vpn_status: disconnected".to_string(),
                "server is down for maintenance".to_string(),
            ],
        )
        .expect("ungrounded fact should short-circuit");
        assert_eq!(verdict.mode, Mode::NeedOperator);
        assert_eq!(
            verdict.reason.as_deref(),
            Some("facts not found verbatim: server is down for maintenance")
        );
    }

    #[test]
    fn empty_fact_list_needs_operator() {
        let verdict = check_grounding(&context(), &[]).expect("empty facts should short-circuit");
        assert_eq!(verdict.mode, Mode::NeedOperator);
    }
}

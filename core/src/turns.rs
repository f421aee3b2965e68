use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Who produced a turn. Stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Originator {
    Client,
    Operator,
    Automated,
}

impl Originator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Originator::Client => "client",
            Originator::Operator => "operator",
            Originator::Automated => "automated",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "client" => Some(Originator::Client),
            "operator" => Some(Originator::Operator),
            "automated" => Some(Originator::Automated),
            _ => None,
        }
    }

    /// Role the language model sees for this originator.
    pub fn chat_role(&self) -> ChatRole {
        match self {
            Originator::Client => ChatRole::User,
            Originator::Operator | Originator::Automated => ChatRole::Assistant,
        }
    }
}

/// One persisted message in a conversation. Immutable once written.
///
/// Turns are ordered by `created_at`; `id` is assigned monotonically by the
/// store and breaks ties between turns written in the same instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Turn {
    pub id: i64,
    pub conversation_id: String,
    pub originator: Originator,
    /// Provider-side client identifier, when the provider supplied one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A turn that has not been persisted yet. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTurn {
    pub conversation_id: String,
    pub originator: Originator,
    pub client_id: Option<String>,
    pub text: String,
}

/// Role of a history entry as presented to the language model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: ChatRole,
    pub text: String,
}

/// Read-only, oldest-first view of a conversation's prior turns.
#[derive(Debug, Clone, Default)]
pub struct HistoryView {
    turns: Vec<Turn>,
}

impl HistoryView {
    /// Build a view from turns as returned by the store, dropping the turn
    /// identified by `exclude_id` (the inbound message currently being handled).
    pub fn from_turns(mut turns: Vec<Turn>, exclude_id: Option<i64>) -> Self {
        if let Some(id) = exclude_id {
            turns.retain(|turn| turn.id != id);
        }
        turns.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Self { turns }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Project turns into model-facing user/assistant entries.
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.turns
            .iter()
            .map(|turn| HistoryEntry {
                role: turn.originator.chat_role(),
                text: turn.text.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn turn(id: i64, originator: Originator, text: &str, offset_secs: i64) -> Turn {
        Turn {
            id,
            conversation_id: "chat-1".to_string(),
            originator,
            client_id: None,
            text: text.to_string(),
            created_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[test]
    fn originator_round_trips_through_text() {
        for originator in [Originator::Client, Originator::Operator, Originator::Automated] {
            assert_eq!(Originator::parse(originator.as_str()), Some(originator));
        }
        assert_eq!(Originator::parse("supporter"), None);
    }

    #[test]
    fn operator_and_automated_turns_are_assistant_role() {
        assert_eq!(Originator::Client.chat_role(), ChatRole::User);
        assert_eq!(Originator::Operator.chat_role(), ChatRole::Assistant);
        assert_eq!(Originator::Automated.chat_role(), ChatRole::Assistant);
    }

    #[test]
    fn history_view_orders_oldest_first_with_id_tie_break() {
        let now = Utc::now();
        let mut a = turn(2, Originator::Client, "second", 0);
        let mut b = turn(1, Originator::Client, "first", 0);
        a.created_at = now;
        b.created_at = now;
        let c = turn(3, Originator::Operator, "earliest", -60);

        let view = HistoryView::from_turns(vec![a, b, c], None);
        let texts: Vec<&str> = view.turns().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["earliest", "first", "second"]);
    }

    #[test]
    fn history_view_excludes_the_inbound_turn() {
        let view = HistoryView::from_turns(
            vec![
                turn(1, Originator::Client, "hello", -10),
                turn(2, Originator::Automated, "hi there", -5),
                turn(3, Originator::Client, "current question", 0),
            ],
            Some(3),
        );

        assert_eq!(view.len(), 2);
        assert_eq!(
            view.entries(),
            vec![
                HistoryEntry {
                    role: ChatRole::User,
                    text: "hello".to_string()
                },
                HistoryEntry {
                    role: ChatRole::Assistant,
                    text: "hi there".to_string()
                },
            ]
        );
    }
}

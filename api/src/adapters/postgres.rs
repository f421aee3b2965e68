use async_trait::async_trait;
use bridge_core::ports::{MessageStore, StoreError};
use bridge_core::turns::{NewTurn, Originator, Turn};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// Postgres-backed conversation history (`turns` table).
#[derive(Clone)]
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Internal row type for sqlx mapping
#[derive(sqlx::FromRow)]
struct TurnRow {
    id: i64,
    conversation_id: String,
    originator: String,
    client_id: Option<String>,
    text: String,
    created_at: DateTime<Utc>,
}

impl TurnRow {
    fn into_turn(self) -> Result<Turn, StoreError> {
        let originator = Originator::parse(&self.originator).ok_or_else(|| {
            StoreError::Unavailable(format!(
                "turn {} has unknown originator '{}'",
                self.id, self.originator
            ))
        })?;
        Ok(Turn {
            id: self.id,
            conversation_id: self.conversation_id,
            originator,
            client_id: self.client_id,
            text: self.text,
            created_at: self.created_at,
        })
    }
}

fn unavailable(err: sqlx::Error) -> StoreError {
    tracing::error!(error = ?err, "Database error");
    StoreError::Unavailable(err.to_string())
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn append(&self, turn: NewTurn) -> Result<Turn, StoreError> {
        let row = sqlx::query_as::<_, TurnRow>(
            r#"
            INSERT INTO turns (conversation_id, originator, client_id, text)
            VALUES ($1, $2, $3, $4)
            RETURNING id, conversation_id, originator, client_id, text, created_at
            "#,
        )
        .bind(&turn.conversation_id)
        .bind(turn.originator.as_str())
        .bind(turn.client_id.as_deref())
        .bind(&turn.text)
        .fetch_one(&self.pool)
        .await
        .map_err(unavailable)?;

        row.into_turn()
    }

    async fn load_history(&self, conversation_id: &str) -> Result<Vec<Turn>, StoreError> {
        let rows = sqlx::query_as::<_, TurnRow>(
            r#"
            SELECT id, conversation_id, originator, client_id, text, created_at
            FROM turns
            WHERE conversation_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        rows.into_iter().map(TurnRow::into_turn).collect()
    }

    async fn health(&self) -> Result<(), StoreError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
            .map_err(unavailable)
    }
}

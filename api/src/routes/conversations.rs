use axum::extract::{Path, State};
use axum::{Json, Router, routing::get};
use bridge_core::turns::Turn;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::middleware::webhook_secret::require_webhook_secret;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct ConversationTurnsResponse {
    pub conversation_id: String,
    /// Oldest first
    pub turns: Vec<Turn>,
}

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/v1/conversations/{conversation_id}/turns",
            get(list_turns),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_webhook_secret,
        ))
}

/// Stored history of one conversation
#[utoipa::path(
    get,
    path = "/v1/conversations/{conversation_id}/turns",
    params(("conversation_id" = String, Path, description = "Chatra chat id")),
    responses(
        (status = 200, description = "Conversation history", body = ConversationTurnsResponse),
        (status = 401, description = "Bad webhook secret", body = bridge_core::error::ApiError),
        (status = 404, description = "No turns stored for this conversation", body = bridge_core::error::ApiError),
        (status = 503, description = "Message store is unreachable", body = bridge_core::error::ApiError)
    ),
    tag = "conversations"
)]
pub async fn list_turns(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Result<Json<ConversationTurnsResponse>, AppError> {
    let turns = state.orchestrator.history(&conversation_id).await?;
    if turns.is_empty() {
        return Err(AppError::NotFound {
            resource: "conversation",
            id: conversation_id,
        });
    }
    Ok(Json(ConversationTurnsResponse {
        conversation_id,
        turns,
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use bridge_core::ports::MessageStore;
    use bridge_core::routing::DeliveryPolicy;
    use bridge_core::testing::ScriptedGateway;
    use bridge_core::turns::{NewTurn, Originator};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::routes::test_support::TestApp;

    async fn get(app: &TestApp, conversation_id: &str) -> (StatusCode, Value) {
        let response = router(&app.state)
            .with_state(app.state.clone())
            .oneshot(
                Request::get(format!("/v1/conversations/{conversation_id}/turns"))
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("endpoint should respond");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        (status, serde_json::from_slice(&body).expect("body should be JSON"))
    }

    async fn seed(app: &TestApp, originator: Originator, text: &str) {
        app.store
            .append(NewTurn {
                conversation_id: "chat-1".to_string(),
                originator,
                client_id: Some("client-1".to_string()),
                text: text.to_string(),
            })
            .await
            .expect("seed turn should be stored");
    }

    #[tokio::test]
    async fn returns_turns_in_order() {
        let app = TestApp::new(ScriptedGateway::new(), DeliveryPolicy::disabled(), None);
        seed(&app, Originator::Client, "VPN down again").await;
        seed(&app, Originator::Operator, "Checking now").await;

        let (status, body) = get(&app, "chat-1").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["conversation_id"], "chat-1");
        let texts: Vec<&str> = body["turns"]
            .as_array()
            .expect("turns should be an array")
            .iter()
            .filter_map(|t| t["text"].as_str())
            .collect();
        assert_eq!(texts, vec!["VPN down again", "Checking now"]);
    }

    #[tokio::test]
    async fn unknown_conversation_is_not_found() {
        let app = TestApp::new(ScriptedGateway::new(), DeliveryPolicy::disabled(), None);

        let (status, body) = get(&app, "missing").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
        assert_eq!(body["field"], "conversation_id");
        assert_eq!(body["received"], "missing");
    }

    #[tokio::test]
    async fn store_outage_is_service_unavailable() {
        let app = TestApp::new(ScriptedGateway::new(), DeliveryPolicy::disabled(), None);
        app.store.set_available(false);

        let (status, body) = get(&app, "chat-1").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "store_unavailable");
    }
}

use axum::extract::State;
use axum::{Router, routing::post};
use bridge_core::context::{Attributes, InboundMessage};
use bridge_core::orchestrator::Orchestrator;
use bridge_core::turns::{NewTurn, Originator};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::extract::AppJson;
use crate::middleware::webhook_secret::require_webhook_secret;
use crate::state::AppState;

/// The only Chatra event that carries new chat messages.
pub const CHAT_FRAGMENT: &str = "chatFragment";

/// Chatra webhook body. Unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatraWebhook {
    pub event_name: String,
    #[serde(default)]
    pub messages: Vec<ChatraMessage>,
    pub client: ChatraClient,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatraMessage {
    /// `client`, `agent` or `system`
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatraClient {
    pub chat_id: String,
    pub id: String,
    /// Client card attributes (name, plan, device state, ...)
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub info: Option<Attributes>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub integration_data: Option<Attributes>,
}

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/chatra/webhook", post(receive_webhook))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_webhook_secret,
        ))
}

/// Receive a Chatra webhook
///
/// Acknowledges immediately; messages are processed in the background, in
/// payload order.
#[utoipa::path(
    post,
    path = "/chatra/webhook",
    request_body = ChatraWebhook,
    responses(
        (status = 200, description = "Webhook acknowledged", body = String),
        (status = 400, description = "Malformed payload", body = bridge_core::error::ApiError),
        (status = 401, description = "Bad webhook secret", body = bridge_core::error::ApiError)
    ),
    tag = "chatra"
)]
pub async fn receive_webhook(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ChatraWebhook>,
) -> &'static str {
    tracing::info!(
        event = %payload.event_name,
        chat_id = %payload.client.chat_id,
        client_id = %payload.client.id,
        messages = payload.messages.len(),
        "Chatra webhook received"
    );

    if payload.event_name != CHAT_FRAGMENT {
        tracing::debug!(event = %payload.event_name, "Skipping non-message event");
        return "ok";
    }

    let orchestrator = state.orchestrator.clone();
    let shutdown = state.shutdown.clone();
    state.tasks.spawn(async move {
        let chat_id = payload.client.chat_id.clone();
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::warn!(chat_id = %chat_id, "Webhook processing cancelled by shutdown");
            }
            _ = process_fragment(&orchestrator, payload) => {}
        }
    });

    "ok"
}

async fn process_fragment(orchestrator: &Orchestrator, payload: ChatraWebhook) {
    let client = payload.client;
    for message in payload.messages {
        if message.text.trim().is_empty() {
            continue;
        }
        match message.message_type.as_str() {
            "client" => {
                let inbound = InboundMessage {
                    conversation_id: client.chat_id.clone(),
                    client_id: client.id.clone(),
                    text: message.text,
                    client_profile: client.info.clone().unwrap_or_default(),
                    client_integration_data: client.integration_data.clone().unwrap_or_default(),
                };
                match orchestrator.handle_incoming(inbound).await {
                    Ok(report) => tracing::info!(
                        chat_id = %client.chat_id,
                        action = ?report.decision.action,
                        final_mode = ?report.final_mode,
                        "Client message handled"
                    ),
                    Err(err) => tracing::error!(
                        chat_id = %client.chat_id,
                        error = %err,
                        "Client message handling failed"
                    ),
                }
            }
            "agent" => {
                let turn = NewTurn {
                    conversation_id: client.chat_id.clone(),
                    originator: Originator::Operator,
                    client_id: Some(client.id.clone()),
                    text: message.text,
                };
                if let Err(err) = orchestrator.record_only(turn).await {
                    tracing::error!(
                        chat_id = %client.chat_id,
                        error = %err,
                        "Failed to record operator message"
                    );
                }
            }
            other => {
                tracing::debug!(
                    chat_id = %client.chat_id,
                    message_type = other,
                    "Ignoring message"
                );
            }
        }
    }
}

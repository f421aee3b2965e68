use async_trait::async_trait;
use bridge_core::ports::{Notifier, NotifierError};
use serde::Serialize;

use crate::config::ChatraConfig;

/// Chatra REST client. Replies go out as pushed messages; operator notes
/// replace the client card's `notes` field.
#[derive(Clone)]
pub struct ChatraNotifier {
    client: reqwest::Client,
    base_url: String,
    authorization: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PushedMessage<'a> {
    client_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct ClientNotes<'a> {
    notes: &'a str,
}

impl ChatraNotifier {
    pub fn new(config: &ChatraConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            authorization: format!(
                "Chatra.Simple {}:{}",
                config.public_key, config.secret_key
            ),
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<(), NotifierError> {
        let response = request
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .send()
            .await
            .map_err(|e| NotifierError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(NotifierError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Notifier for ChatraNotifier {
    async fn deliver_to_client(&self, client_id: &str, text: &str) -> Result<(), NotifierError> {
        let request = self
            .client
            .post(format!("{}/pushedMessages", self.base_url))
            .json(&PushedMessage { client_id, text });
        self.send(request).await?;
        tracing::info!(client_id, "Reply pushed to client");
        Ok(())
    }

    async fn escalate_to_operator(
        &self,
        client_id: &str,
        note: &str,
    ) -> Result<(), NotifierError> {
        let request = self
            .client
            .put(format!("{}/clients/{}", self.base_url, client_id))
            .json(&ClientNotes { notes: note });
        self.send(request).await?;
        tracing::info!(client_id, "Operator note written");
        Ok(())
    }
}

//! Deterministic collaborators for exercising the pipeline without network or
//! database access. Enabled for this crate's tests and via the `test-support`
//! feature for dependants.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::context::InboundMessage;
use crate::mode::Stage;
use crate::ports::{Gateway, GatewayError, Notifier, NotifierError, StageRequest};

#[derive(Debug, Clone)]
enum Scripted {
    Reply(String),
    Fail,
    Hang,
}

/// Gateway that answers each stage with a fixed script and records every call.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    script: HashMap<Stage, Scripted>,
    latency: Option<Duration>,
    requests: Mutex<Vec<StageRequest>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, stage: Stage, raw: &str) -> Self {
        self.script.insert(stage, Scripted::Reply(raw.to_string()));
        self
    }

    /// Answer `stage` with a transport error.
    pub fn fail(mut self, stage: Stage) -> Self {
        self.script.insert(stage, Scripted::Fail);
        self
    }

    /// Never answer `stage`.
    pub fn hang(mut self, stage: Stage) -> Self {
        self.script.insert(stage, Scripted::Hang);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self) -> Vec<Stage> {
        self.requests
            .lock()
            .map(|r| r.iter().map(|req| req.stage).collect())
            .unwrap_or_default()
    }

    pub fn requests_input(&self) -> Vec<Value> {
        self.requests
            .lock()
            .map(|r| r.iter().map(|req| req.input.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn invoke(&self, request: StageRequest) -> Result<String, GatewayError> {
        let stage = request.stage;
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match self.script.get(&stage) {
            Some(Scripted::Reply(raw)) => Ok(raw.clone()),
            Some(Scripted::Fail) => Err(GatewayError::Transport("connection reset".to_string())),
            Some(Scripted::Hang) => std::future::pending().await,
            None => Err(GatewayError::Transport(format!("no scripted reply for {stage}"))),
        }
    }
}

/// Notifier that records what would have been sent.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    deliveries: Mutex<Vec<(String, String)>>,
    notes: Mutex<Vec<(String, String)>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn deliveries(&self) -> Vec<(String, String)> {
        self.deliveries.lock().map(|d| d.clone()).unwrap_or_default()
    }

    pub fn notes(&self) -> Vec<(String, String)> {
        self.notes.lock().map(|n| n.clone()).unwrap_or_default()
    }

    fn check(&self) -> Result<(), NotifierError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(NotifierError::Status {
                status: 502,
                body: "bad gateway".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver_to_client(&self, client_id: &str, text: &str) -> Result<(), NotifierError> {
        self.check()?;
        if let Ok(mut deliveries) = self.deliveries.lock() {
            deliveries.push((client_id.to_string(), text.to_string()));
        }
        Ok(())
    }

    async fn escalate_to_operator(
        &self,
        client_id: &str,
        note: &str,
    ) -> Result<(), NotifierError> {
        self.check()?;
        if let Ok(mut notes) = self.notes.lock() {
            notes.push((client_id.to_string(), note.to_string()));
        }
        Ok(())
    }
}

/// Client message from `client-1` with the given profile and no integration data.
pub fn inbound(conversation_id: &str, text: &str, profile: Value) -> InboundMessage {
    InboundMessage {
        conversation_id: conversation_id.to_string(),
        client_id: "client-1".to_string(),
        text: text.to_string(),
        client_profile: profile.as_object().cloned().unwrap_or_default(),
        client_integration_data: Default::default(),
    }
}

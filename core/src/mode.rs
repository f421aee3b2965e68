use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Categorical verdict emitted by a pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    SelfConfidence,
    NeedOperator,
    ParseError,
    AiError,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::SelfConfidence => "SELF_CONFIDENCE",
            Mode::NeedOperator => "NEED_OPERATOR",
            Mode::ParseError => "PARSE_ERROR",
            Mode::AiError => "AI_ERROR",
        }
    }

    /// Parse a verdict as emitted by the model. Only the two verdicts a stage
    /// is allowed to produce are accepted; the failure modes are ours.
    pub fn parse_verdict(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SELF_CONFIDENCE" => Some(Mode::SelfConfidence),
            "NEED_OPERATOR" => Some(Mode::NeedOperator),
            _ => None,
        }
    }

    pub fn is_confident(&self) -> bool {
        matches!(self, Mode::SelfConfidence)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four gateway-backed stages of the decision pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    FactSelector,
    FactValidator,
    AnswerBuilder,
    AnswerValidator,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::FactSelector,
        Stage::FactValidator,
        Stage::AnswerBuilder,
        Stage::AnswerValidator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::FactSelector => "FACT_SELECTOR",
            Stage::FactValidator => "FACT_VALIDATOR",
            Stage::AnswerBuilder => "ANSWER_BUILDER",
            Stage::AnswerValidator => "ANSWER_VALIDATOR",
        }
    }

    /// Sampling temperature for this stage. Selection and both validators are
    /// deterministic; the builder gets a little room for phrasing.
    pub fn temperature(&self) -> f32 {
        match self {
            Stage::FactSelector | Stage::FactValidator | Stage::AnswerValidator => 0.0,
            Stage::AnswerBuilder => 0.3,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model settings for one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageProfile {
    pub model: String,
    pub temperature: f32,
}

/// Static `{stage → model, temperature}` lookup used by gateways.
#[derive(Debug, Clone)]
pub struct StageProfiles {
    profiles: [StageProfile; 4],
}

impl StageProfiles {
    /// Every stage on `default_model` with its built-in temperature.
    pub fn uniform(default_model: &str) -> Self {
        Self {
            profiles: Stage::ALL.map(|stage| StageProfile {
                model: default_model.to_string(),
                temperature: stage.temperature(),
            }),
        }
    }

    pub fn with_model(mut self, stage: Stage, model: impl Into<String>) -> Self {
        self.profiles[stage as usize].model = model.into();
        self
    }

    pub fn get(&self, stage: Stage) -> &StageProfile {
        &self.profiles[stage as usize]
    }
}

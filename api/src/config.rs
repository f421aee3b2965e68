use std::path::PathBuf;
use std::time::Duration;

use bridge_core::mode::{Stage, StageProfiles};
use bridge_core::orchestrator::PipelineConfig;
use bridge_core::routing::DeliveryPolicy;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_OPENAI_MAX_RETRIES: u32 = 2;
const DEFAULT_CHATRA_BASE_URL: &str = "https://app.chatra.io/api";
const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("failed to read domain knowledge from {path}: {source}")]
    DomainKnowledge {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub profiles: StageProfiles,
    pub max_retries: u32,
}

#[derive(Debug, Clone)]
pub struct ChatraConfig {
    pub base_url: String,
    pub public_key: String,
    pub secret_key: String,
}

/// Service configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub openai: OpenAiConfig,
    pub chatra: ChatraConfig,
    pub stage_timeout: Duration,
    pub auto_delivery: bool,
    pub domain_knowledge_path: Option<PathBuf>,
    pub webhook_secret: Option<String>,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let default_model = get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
        let mut profiles = StageProfiles::uniform(&default_model);
        for stage in Stage::ALL {
            if let Some(model) = get(&format!("OPENAI_MODEL_{}", stage.as_str())) {
                profiles = profiles.with_model(stage, model);
            }
        }

        Ok(Self {
            database_url: require("DATABASE_URL")?,
            port: parse_or("PORT", get("PORT"), DEFAULT_PORT)?,
            openai: OpenAiConfig {
                api_key: require("OPENAI_API_KEY")?,
                base_url: get("OPENAI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                profiles,
                max_retries: parse_or(
                    "OPENAI_MAX_RETRIES",
                    get("OPENAI_MAX_RETRIES"),
                    DEFAULT_OPENAI_MAX_RETRIES,
                )?,
            },
            chatra: ChatraConfig {
                base_url: get("CHATRA_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_CHATRA_BASE_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                public_key: require("CHATRA_PUBLIC_KEY")?,
                secret_key: require("CHATRA_API_TOKEN")?,
            },
            stage_timeout: Duration::from_secs(parse_positive(
                "BRIDGE_STAGE_TIMEOUT_SECS",
                get("BRIDGE_STAGE_TIMEOUT_SECS"),
                DEFAULT_STAGE_TIMEOUT_SECS,
            )?),
            auto_delivery: parse_flag("BRIDGE_AUTO_DELIVERY", get("BRIDGE_AUTO_DELIVERY"))?,
            domain_knowledge_path: get("BRIDGE_DOMAIN_KNOWLEDGE_PATH").map(PathBuf::from),
            webhook_secret: get("BRIDGE_WEBHOOK_SECRET"),
            cors_origins: get("BRIDGE_CORS_ORIGINS")
                .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect(),
        })
    }

    pub fn load_domain_knowledge(&self) -> Result<String, ConfigError> {
        match &self.domain_knowledge_path {
            Some(path) => {
                std::fs::read_to_string(path).map_err(|source| ConfigError::DomainKnowledge {
                    path: path.clone(),
                    source,
                })
            }
            None => Ok(String::new()),
        }
    }

    pub fn pipeline(&self, domain_knowledge: String) -> PipelineConfig {
        PipelineConfig {
            stage_timeout: self.stage_timeout,
            delivery: DeliveryPolicy {
                auto_delivery: self.auto_delivery,
            },
            domain_knowledge,
        }
    }
}

fn parse_or<T>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

fn parse_positive(
    key: &'static str,
    value: Option<String>,
    default: u64,
) -> Result<u64, ConfigError> {
    match parse_or(key, value, default)? {
        0 => Err(ConfigError::Invalid {
            key,
            value: "0".to_string(),
            reason: "must be greater than zero".to_string(),
        }),
        n => Ok(n),
    }
}

fn parse_flag(key: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::to_lowercase).as_deref() {
        None | Some("false") | Some("0") | Some("no") => Ok(false),
        Some("true") | Some("1") | Some("yes") => Ok(true),
        Some(_) => Err(ConfigError::Invalid {
            key,
            value: value.unwrap_or_default(),
            reason: "expected true or false".to_string(),
        }),
    }
}

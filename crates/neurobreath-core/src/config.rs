//! Assistant configuration: defaults, then an optional TOML file, then environment.
//!
//! | Key | Env | Default |
//! |-----|-----|---------|
//! | bind_addr | NEUROBREATH__BIND_ADDR | 127.0.0.1:8000 |
//! | environment | NEUROBREATH__ENVIRONMENT | production |
//! | evidence_lookup | NEUROBREATH__EVIDENCE_LOOKUP | true |
//! | model.api_url | NEUROBREATH__MODEL__API_URL | Abacus chat completions |
//! | model.name | NEUROBREATH__MODEL__NAME | gpt-4.1-mini |
//! | model.max_tokens | NEUROBREATH__MODEL__MAX_TOKENS | 800 |
//! | model.temperature | NEUROBREATH__MODEL__TEMPERATURE | 0.4 |
//! | model.timeout_secs | NEUROBREATH__MODEL__TIMEOUT_SECS | 30 |
//! | model.history_limit | NEUROBREATH__MODEL__HISTORY_LIMIT | 12 |
//! | model.api_key | NEUROBREATH__MODEL__API_KEY, ABACUSAI_API_KEY, OPENROUTER_API_KEY | unset |
//! | nhs.base_url | NEUROBREATH__NHS__BASE_URL | NHS website content API |
//! | nhs.api_key | NEUROBREATH__NHS__API_KEY, NHS_WEBSITE_CONTENT_API_KEY | unset |
//!
//! The file path comes from `NEUROBREATH_CONFIG` (default `config/assistant`, extension optional).

use crate::evidence::NHS_CONTENT_BASE;
use crate::model::{DEFAULT_API_URL, DEFAULT_MODEL};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

const ENV_PREFIX: &str = "NEUROBREATH";
const CONFIG_PATH_VAR: &str = "NEUROBREATH_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/assistant";
/// Checked in order when `model.api_key` is not set.
const API_KEY_FALLBACKS: &[&str] = &["ABACUSAI_API_KEY", "OPENROUTER_API_KEY"];
const NHS_KEY_FALLBACKS: &[&str] = &["NHS_WEBSITE_CONTENT_API_KEY"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    Development,
    #[default]
    Production,
    Test,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub api_url: String,
    pub name: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Most recent non-system history turns forwarded to the model.
    pub history_limit: usize,
    pub api_key: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            name: DEFAULT_MODEL.to_string(),
            max_tokens: 800,
            temperature: 0.4,
            timeout_secs: 30,
            history_limit: 12,
            api_key: None,
        }
    }
}

impl ModelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("api_url", &self.api_url)
            .field("name", &self.name)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .field("history_limit", &self.history_limit)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// NHS website content API. Lookups against it only run when a key is set.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NhsContentConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl Default for NhsContentConfig {
    fn default() -> Self {
        Self {
            base_url: NHS_CONTENT_BASE.to_string(),
            api_key: None,
        }
    }
}

impl NhsContentConfig {
    pub fn credential(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

impl fmt::Debug for NhsContentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NhsContentConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub bind_addr: String,
    pub environment: RuntimeEnvironment,
    /// Live NHS / MedlinePlus / PubMed lookups for the buddy endpoint.
    pub evidence_lookup: bool,
    pub model: ModelConfig,
    pub nhs: NhsContentConfig,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            environment: RuntimeEnvironment::Production,
            evidence_lookup: true,
            model: ModelConfig::default(),
            nhs: NhsContentConfig::default(),
        }
    }
}

impl AssistantConfig {
    pub fn is_development(&self) -> bool {
        self.environment == RuntimeEnvironment::Development
    }

    /// Load from the process environment (call after `dotenvy::dotenv()`).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_vars(std::env::vars().collect())
    }

    /// Same as [`AssistantConfig::load`] with an explicit variable map instead of the process env.
    pub fn load_from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let path = vars
            .get(CONFIG_PATH_VAR)
            .cloned()
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
        let defaults = ModelConfig::default();

        let built = config::Config::builder()
            .set_default("bind_addr", "127.0.0.1:8000")?
            .set_default("environment", "production")?
            .set_default("evidence_lookup", true)?
            .set_default("model.api_url", defaults.api_url.as_str())?
            .set_default("model.name", defaults.name.as_str())?
            .set_default("model.max_tokens", defaults.max_tokens as i64)?
            .set_default("model.temperature", defaults.temperature as f64)?
            .set_default("model.timeout_secs", defaults.timeout_secs as i64)?
            .set_default("model.history_limit", defaults.history_limit as i64)?
            .set_default("nhs.base_url", NHS_CONTENT_BASE)?
            .add_source(config::File::with_name(&path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(vars.clone())),
            )
            .build()?;

        let mut cfg: AssistantConfig = built.try_deserialize()?;

        cfg.model.api_key = with_fallback(cfg.model.api_key.take(), &vars, API_KEY_FALLBACKS);
        cfg.nhs.api_key = with_fallback(cfg.nhs.api_key.take(), &vars, NHS_KEY_FALLBACKS);

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.timeout_secs == 0 {
            return Err(ConfigError::Invalid("model.timeout_secs must be > 0".into()));
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError::Invalid(format!(
                "model.temperature {} outside 0.0..=2.0",
                self.model.temperature
            )));
        }
        if self.model.max_tokens == 0 {
            return Err(ConfigError::Invalid("model.max_tokens must be > 0".into()));
        }
        Ok(())
    }
}

/// `configured` unless blank, else the first non-blank variable in `names`.
fn with_fallback(configured: Option<String>, vars: &HashMap<String, String>, names: &[&str]) -> Option<String> {
    configured.filter(|k| !k.trim().is_empty()).or_else(|| {
        names
            .iter()
            .filter_map(|name| vars.get(*name))
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        let mut m: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        m.entry(CONFIG_PATH_VAR.to_string())
            .or_insert_with(|| "does/not/exist".to_string());
        m
    }

    #[test]
    fn defaults_apply_without_file_or_env() {
        let cfg = AssistantConfig::load_from_vars(vars(&[])).unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:8000");
        assert_eq!(cfg.environment, RuntimeEnvironment::Production);
        assert!(cfg.evidence_lookup);
        assert_eq!(cfg.model.name, "gpt-4.1-mini");
        assert_eq!(cfg.model.history_limit, 12);
        assert!(!cfg.model.has_credential());
    }

    #[test]
    fn env_overrides_nested_keys() {
        let cfg = AssistantConfig::load_from_vars(vars(&[
            ("NEUROBREATH__ENVIRONMENT", "development"),
            ("NEUROBREATH__MODEL__TIMEOUT_SECS", "5"),
            ("NEUROBREATH__EVIDENCE_LOOKUP", "false"),
        ]))
        .unwrap();
        assert!(cfg.is_development());
        assert_eq!(cfg.model.timeout(), Duration::from_secs(5));
        assert!(!cfg.evidence_lookup);
    }

    #[test]
    fn api_key_falls_back_in_order_and_ignores_blanks() {
        let cfg = AssistantConfig::load_from_vars(vars(&[
            ("ABACUSAI_API_KEY", "  "),
            ("OPENROUTER_API_KEY", "sk-or"),
        ]))
        .unwrap();
        assert_eq!(cfg.model.api_key.as_deref(), Some("sk-or"));

        let cfg = AssistantConfig::load_from_vars(vars(&[
            ("ABACUSAI_API_KEY", "sk-abacus"),
            ("OPENROUTER_API_KEY", "sk-or"),
        ]))
        .unwrap();
        assert_eq!(cfg.model.api_key.as_deref(), Some("sk-abacus"));
    }

    #[test]
    fn toml_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assistant.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "bind_addr = \"0.0.0.0:9000\"\n[model]\nname = \"local-model\"").unwrap();
        let cfg = AssistantConfig::load_from_vars(vars(&[(
            CONFIG_PATH_VAR,
            path.to_str().unwrap(),
        )]))
        .unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:9000");
        assert_eq!(cfg.model.name, "local-model");
        assert_eq!(cfg.model.max_tokens, 800);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = AssistantConfig::load_from_vars(vars(&[("NEUROBREATH__MODEL__TIMEOUT_SECS", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn debug_redacts_key() {
        let cfg = ModelConfig {
            api_key: Some("sk-secret".into()),
            ..Default::default()
        };
        assert!(!format!("{:?}", cfg).contains("sk-secret"));
    }

    #[test]
    fn nhs_key_comes_from_prefixed_or_legacy_variable() {
        let cfg = AssistantConfig::load_from_vars(vars(&[])).unwrap();
        assert_eq!(cfg.nhs.base_url, NHS_CONTENT_BASE);
        assert!(cfg.nhs.credential().is_none());

        let cfg = AssistantConfig::load_from_vars(vars(&[("NHS_WEBSITE_CONTENT_API_KEY", "nhs-legacy")])).unwrap();
        assert_eq!(cfg.nhs.credential(), Some("nhs-legacy"));

        let cfg = AssistantConfig::load_from_vars(vars(&[
            ("NEUROBREATH__NHS__API_KEY", "nhs-prefixed"),
            ("NEUROBREATH__NHS__BASE_URL", "http://localhost:4010/nhs"),
            ("NHS_WEBSITE_CONTENT_API_KEY", "nhs-legacy"),
        ]))
        .unwrap();
        assert_eq!(cfg.nhs.credential(), Some("nhs-prefixed"));
        assert_eq!(cfg.nhs.base_url, "http://localhost:4010/nhs");
        assert!(!format!("{:?}", cfg).contains("nhs-prefixed"));
    }
}

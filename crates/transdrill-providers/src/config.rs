//! Configuration loading and service factories.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use transdrill_core::similarity::SimilarityScorer;
use transdrill_core::streak::{StreakPolicy, DEFAULT_PASS_THRESHOLD, DEFAULT_STREAK_TARGET};
use transdrill_core::traits::{AnswerScorer, LlmProvider, QuestionGenerator};

use crate::generator::{
    GeneratorSettings, LlmQuestionGenerator, TemplateGenerator, DEFAULT_TEMPLATE_TOPIC,
};
use crate::openai::{OpenAiProvider, DEFAULT_TIMEOUT_SECS};
use crate::oracle::{OracleScorer, OracleSettings};

/// Environment variables that override the configured API key, in priority order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["TRANSDRILL_OPENAI_KEY", "OPENAI_API_KEY"];

/// Configuration for the chat-completion backend.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    OpenAI {
        #[serde(default)]
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::OpenAI {
                api_key: _,
                base_url,
                org_id,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("org_id", org_id)
                .finish(),
        }
    }
}

impl ProviderConfig {
    /// The API key, if one is set.
    pub fn api_key(&self) -> Option<&str> {
        match self {
            ProviderConfig::OpenAI { api_key, .. } => {
                Some(api_key.as_str()).filter(|k| !k.trim().is_empty())
            }
        }
    }
}

/// Top-level transdrill configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransdrillConfig {
    /// Chat-completion backend. Absent means AI features are unconfigured.
    #[serde(default)]
    pub provider: Option<ProviderConfig>,
    /// Model used for both scoring and generation.
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_scoring_temperature")]
    pub scoring_temperature: f64,
    #[serde(default = "default_generation_temperature")]
    pub generation_temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Minimum score (0–100) that counts as a pass.
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: u8,
    /// Consecutive passes needed to master a level.
    #[serde(default = "default_streak_target")]
    pub streak_target: u32,
    /// Level catalog file or directory. The built-in catalog is used when unset.
    #[serde(default)]
    pub levels_path: Option<PathBuf>,
    /// Where progress is stored. See [`TransdrillConfig::progress_file`].
    #[serde(default)]
    pub progress_path: Option<PathBuf>,
    /// Topic used for generated questions when none is given.
    #[serde(default)]
    pub default_topic: Option<String>,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_scoring_temperature() -> f64 {
    0.3
}
fn default_generation_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_pass_threshold() -> u8 {
    DEFAULT_PASS_THRESHOLD
}
fn default_streak_target() -> u32 {
    DEFAULT_STREAK_TARGET
}

impl Default for TransdrillConfig {
    fn default() -> Self {
        Self {
            provider: None,
            model: default_model(),
            scoring_temperature: default_scoring_temperature(),
            generation_temperature: default_generation_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout(),
            pass_threshold: default_pass_threshold(),
            streak_target: default_streak_target(),
            levels_path: None,
            progress_path: None,
            default_topic: None,
        }
    }
}

impl TransdrillConfig {
    /// The API key, if the provider is configured with a non-empty one.
    pub fn api_key(&self) -> Option<&str> {
        self.provider.as_ref().and_then(ProviderConfig::api_key)
    }

    pub fn is_configured(&self) -> bool {
        self.api_key().is_some()
    }

    pub fn streak_policy(&self) -> StreakPolicy {
        StreakPolicy {
            target: self.streak_target.max(1),
            pass_threshold: self.pass_threshold.min(100),
        }
    }

    pub fn oracle_settings(&self) -> OracleSettings {
        OracleSettings {
            model: self.model.clone(),
            temperature: self.scoring_temperature,
            max_tokens: self.max_tokens,
        }
    }

    pub fn generator_settings(&self) -> GeneratorSettings {
        GeneratorSettings {
            model: self.model.clone(),
            temperature: self.generation_temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Progress file path: the configured one, else
    /// `~/.config/transdrill/progress.json`, else `./transdrill-progress.json`.
    pub fn progress_file(&self) -> PathBuf {
        self.progress_path.clone().unwrap_or_else(|| {
            dirs_path()
                .map(|d| d.join("progress.json"))
                .unwrap_or_else(|| PathBuf::from("transdrill-progress.json"))
        })
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    substitute_vars(s, |name| std::env::var(name).ok())
}

/// Replace each `${NAME}` with `lookup(NAME)`, or nothing when unset.
///
/// Substituted values are copied verbatim and never rescanned.
fn substitute_vars<F>(s: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        result.push_str(&lookup(&rest[start + 2..start + len]).unwrap_or_default());
        rest = &rest[start + len + 1..];
    }
    result.push_str(rest);
    result
}

/// Resolve env vars in a provider config.
fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => ProviderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
            org_id: org_id.as_ref().map(|o| resolve_env_vars(o)),
        },
    }
}

/// Apply the first non-empty key found by `lookup` over [`API_KEY_ENV_VARS`].
fn apply_key_override<F>(config: &mut TransdrillConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let Some(key) = API_KEY_ENV_VARS
        .iter()
        .filter_map(|var| lookup(var))
        .find(|k| !k.trim().is_empty())
    else {
        return;
    };

    match config.provider.as_mut() {
        Some(ProviderConfig::OpenAI { api_key, .. }) => *api_key = key,
        None => {
            config.provider = Some(ProviderConfig::OpenAI {
                api_key: key,
                base_url: None,
                org_id: None,
            })
        }
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `transdrill.toml` in the current directory
/// 2. `~/.config/transdrill/config.toml`
///
/// Environment variable overrides: `TRANSDRILL_OPENAI_KEY`, then `OPENAI_API_KEY`.
pub fn load_config() -> Result<TransdrillConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<TransdrillConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("transdrill.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<TransdrillConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => TransdrillConfig::default(),
    };

    apply_key_override(&mut config, |var| std::env::var(var).ok());
    config.provider = config.provider.as_ref().map(resolve_provider_config);

    Ok(config)
}

/// `~/.config/transdrill`, when `HOME` is set.
pub fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("transdrill"))
}

/// Create the chat-completion backend, or `None` when no API key is set.
pub fn create_provider(
    config: &ProviderConfig,
    timeout_secs: u64,
) -> Result<Option<Arc<dyn LlmProvider>>> {
    let Some(key) = config.api_key() else {
        return Ok(None);
    };
    match config {
        ProviderConfig::OpenAI {
            base_url, org_id, ..
        } => {
            let provider =
                OpenAiProvider::new(key, base_url.clone(), org_id.clone(), timeout_secs)?;
            Ok(Some(Arc::new(provider)))
        }
    }
}

fn configured_provider(config: &TransdrillConfig) -> Result<Option<Arc<dyn LlmProvider>>> {
    match &config.provider {
        Some(provider) => create_provider(provider, config.timeout_secs),
        None => Ok(None),
    }
}

/// Build the answer scorer.
///
/// `offline` selects local similarity scoring. Otherwise the oracle is used,
/// and without an API key it returns the "not configured" placeholder.
pub fn create_scorer(config: &TransdrillConfig, offline: bool) -> Result<Arc<dyn AnswerScorer>> {
    if offline {
        return Ok(Arc::new(SimilarityScorer));
    }
    let scorer = match configured_provider(config)? {
        Some(provider) => OracleScorer::new(provider, config.oracle_settings()),
        None => {
            tracing::info!("no API key configured; scoring will return a placeholder");
            OracleScorer::unconfigured()
        }
    };
    Ok(Arc::new(scorer))
}

/// Build the question generator.
///
/// Offline or unconfigured, this is the [`TemplateGenerator`].
pub fn create_generator(
    config: &TransdrillConfig,
    offline: bool,
) -> Result<Arc<dyn QuestionGenerator>> {
    let provider = if offline {
        None
    } else {
        configured_provider(config)?
    };
    match provider {
        Some(provider) => Ok(Arc::new(LlmQuestionGenerator::new(
            provider,
            config.generator_settings(),
        ))),
        None => {
            let topic = config
                .default_topic
                .clone()
                .unwrap_or_else(|| DEFAULT_TEMPLATE_TOPIC.to_string());
            Ok(Arc::new(TemplateGenerator::with_default_topic(topic)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn openai(key: &str) -> ProviderConfig {
        ProviderConfig::OpenAI {
            api_key: key.into(),
            base_url: None,
            org_id: None,
        }
    }

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_TRANSDRILL_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_TRANSDRILL_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_TRANSDRILL_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("${_TRANSDRILL_UNSET_VAR}"), "");
        assert_eq!(resolve_env_vars("no refs"), "no refs");
        std::env::remove_var("_TRANSDRILL_TEST_VAR");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let lookup = |name: &str| match name {
            "SELF" => Some("${SELF}".to_string()),
            "A" => Some("${B}".to_string()),
            "B" => Some("b".to_string()),
            _ => None,
        };
        assert_eq!(substitute_vars("${SELF}", lookup), "${SELF}");
        assert_eq!(substitute_vars("x${A}y${B}z", lookup), "x${B}ybz");
        assert_eq!(substitute_vars("open ${A", lookup), "open ${A");
    }

    #[test]
    fn default_config() {
        let config = TransdrillConfig::default();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.scoring_temperature, 0.3);
        assert_eq!(config.generation_temperature, 0.7);
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.streak_policy(), StreakPolicy::default());
        assert!(!config.is_configured());
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
model = "gpt-4o"
pass_threshold = 75
streak_target = 0
default_topic = "education"
levels_path = "levels"

[provider]
type = "openai"
api_key = "sk-test"
base_url = "http://localhost:8080"
"#;
        let config: TransdrillConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.api_key(), Some("sk-test"));
        assert_eq!(config.levels_path, Some(PathBuf::from("levels")));
        assert_eq!(config.default_topic.as_deref(), Some("education"));

        let policy = config.streak_policy();
        assert_eq!(policy.target, 1);
        assert_eq!(policy.pass_threshold, 75);
    }

    #[test]
    fn empty_key_is_unconfigured() {
        let config = TransdrillConfig {
            provider: Some(openai("  ")),
            ..Default::default()
        };
        assert!(!config.is_configured());
    }

    #[test]
    fn debug_masks_api_key() {
        let rendered = format!("{:?}", openai("sk-very-secret"));
        assert!(!rendered.contains("sk-very-secret"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn key_override_priority() {
        let env: HashMap<&str, &str> = [
            ("TRANSDRILL_OPENAI_KEY", "sk-transdrill"),
            ("OPENAI_API_KEY", "sk-openai"),
        ]
        .into_iter()
        .collect();

        let mut config = TransdrillConfig::default();
        apply_key_override(&mut config, |var| env.get(var).map(|v| v.to_string()));
        assert_eq!(config.api_key(), Some("sk-transdrill"));

        let mut config = TransdrillConfig {
            provider: Some(ProviderConfig::OpenAI {
                api_key: "sk-file".into(),
                base_url: Some("http://proxy".into()),
                org_id: None,
            }),
            ..Default::default()
        };
        apply_key_override(&mut config, |var| {
            (var == "OPENAI_API_KEY").then(|| "sk-openai".to_string())
        });
        assert_eq!(config.api_key(), Some("sk-openai"));
        assert!(matches!(
            config.provider,
            Some(ProviderConfig::OpenAI { base_url: Some(ref u), .. }) if u == "http://proxy"
        ));
    }

    #[test]
    fn empty_override_is_ignored() {
        let mut config = TransdrillConfig {
            provider: Some(openai("sk-file")),
            ..Default::default()
        };
        apply_key_override(&mut config, |_| Some(String::new()));
        assert_eq!(config.api_key(), Some("sk-file"));
    }

    #[test]
    fn explicit_missing_path_errors() {
        let err = load_config_from(Some(Path::new("/nonexistent/transdrill.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transdrill.toml");
        std::fs::write(&path, "pass_threshold = 90\nprogress_path = \"p.json\"\n").unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.pass_threshold, 90);
        assert_eq!(config.progress_file(), PathBuf::from("p.json"));
    }

    #[test]
    fn malformed_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "pass_threshold = \"high\"").unwrap();

        let err = load_config_from(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("bad.toml"));
    }

    #[tokio::test]
    async fn factories_respect_offline_and_credentials() {
        let unconfigured = TransdrillConfig::default();
        assert_eq!(create_scorer(&unconfigured, true).unwrap().name(), "similarity");
        assert_eq!(create_scorer(&unconfigured, false).unwrap().name(), "oracle");
        assert_eq!(create_generator(&unconfigured, false).unwrap().name(), "template");

        let configured = TransdrillConfig {
            provider: Some(openai("sk-test")),
            ..Default::default()
        };
        assert_eq!(create_scorer(&configured, false).unwrap().name(), "oracle");
        assert_eq!(create_generator(&configured, false).unwrap().name(), "llm");
        assert_eq!(create_generator(&configured, true).unwrap().name(), "template");
    }

    #[tokio::test]
    async fn unconfigured_scorer_makes_no_call() {
        let scorer = create_scorer(&TransdrillConfig::default(), false).unwrap();
        let result = scorer.evaluate("hello", "hello", None).await;
        assert_eq!(result, crate::oracle::unconfigured_result());
    }
}

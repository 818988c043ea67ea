//! Layered configuration: defaults, then an optional TOML file, then the
//! environment.
//!
//! ```toml
//! max_retries = 3
//!
//! [transformer]
//! model = "llama-3.3-70b-versatile"
//! base_url = "https://api.groq.com/openai/v1"
//!
//! [executor]
//! program = "python3"
//! timeout_secs = 60
//!
//! [executor.module]
//! module_name = "main_module"
//! test_file = "test_main.py"
//! ```
//!
//! Environment overrides: `REFACTOR_MODEL`, `GROQ_API_KEY` (falling back to
//! `OPENAI_API_KEY`), `REFACTOR_BASE_URL`, `REFACTOR_MAX_RETRIES`,
//! `REFACTOR_PYTHON`, `REFACTOR_TEST_TIMEOUT_SECS`.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::{ConfigError, Result};
use crate::orchestrator::{Orchestrator, DEFAULT_MAX_RETRIES};
use crate::prompts::TemplateSet;
use crate::sandbox::{ExecutorConfig, PytestExecutor};
use crate::transformer::{ChatCompletionsTransformer, TransformerConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefactorConfig {
    pub max_retries: u32,
    pub transformer: TransformerConfig,
    pub executor: ExecutorConfig,
    /// Template overrides; built-ins are used when absent.
    pub templates: Option<TemplateSet>,
}

impl Default for RefactorConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            transformer: TransformerConfig::default(),
            executor: ExecutorConfig::default(),
            templates: None,
        }
    }
}

impl RefactorConfig {
    /// Defaults, overlaid by `path` when given, overlaid by the process
    /// environment, then validated.
    pub fn load(path: Option<&Path>) -> std::result::Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> std::result::Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> std::result::Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply overrides from `lookup` (the process environment in production).
    pub fn apply_env<F>(&mut self, lookup: F) -> std::result::Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup("REFACTOR_MODEL") {
            self.transformer.model = model;
        }
        if let Some(key) = lookup("GROQ_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            self.transformer.api_key = Some(key);
        }
        if let Some(url) = lookup("REFACTOR_BASE_URL") {
            self.transformer.base_url = url;
        }
        if let Some(program) = lookup("REFACTOR_PYTHON") {
            self.executor.program = program;
        }
        if let Some(raw) = lookup("REFACTOR_MAX_RETRIES") {
            self.max_retries = parse_count("REFACTOR_MAX_RETRIES", &raw)?;
        }
        if let Some(raw) = lookup("REFACTOR_TEST_TIMEOUT_SECS") {
            self.executor.timeout_secs =
                u64::from(parse_count("REFACTOR_TEST_TIMEOUT_SECS", &raw)?);
        }
        Ok(())
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.max_retries == 0 {
            return Err(ConfigError::Invalid("max_retries must be at least 1".into()));
        }
        if self.max_retries > 20 {
            return Err(ConfigError::Invalid("max_retries must be at most 20".into()));
        }
        if self.transformer.temperature != 0.0 {
            return Err(ConfigError::Invalid(format!(
                "transformer temperature is fixed at 0, got {}",
                self.transformer.temperature
            )));
        }
        if self.executor.program.trim().is_empty() {
            return Err(ConfigError::Invalid("executor program must not be empty".into()));
        }
        self.executor.module.validate()?;
        self.templates()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }

    /// Configured templates, or the built-ins for the executor's module.
    pub fn templates(&self) -> TemplateSet {
        self.templates
            .clone()
            .unwrap_or_else(|| TemplateSet::for_module(&self.executor.module))
    }

    /// Construct the live collaborators and wire them into an orchestrator.
    pub fn build_orchestrator(&self) -> Result<Orchestrator> {
        let transformer = ChatCompletionsTransformer::new(self.transformer.clone())?;
        let executor = PytestExecutor::new(self.executor.clone());
        Ok(Orchestrator::new(Arc::new(transformer), Arc::new(executor))
            .with_templates(self.templates())
            .with_max_retries(self.max_retries))
    }
}

fn parse_count(key: &str, raw: &str) -> std::result::Result<u32, ConfigError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| {
            ConfigError::Invalid(format!(
                "{key} must be a non-negative integer, got {raw:?}"
            ))
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::domain::RefactorError;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults_validate() {
        let cfg = RefactorConfig::default();
        assert_eq!(cfg.max_retries, 3);
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn test_toml_overlays_defaults() {
        let cfg = RefactorConfig::from_toml_str(
            r#"
max_retries = 5

[transformer]
model = "llama-3.1-8b-instant"

[executor]
timeout_secs = 30

[executor.module]
module_name = "legacy"
test_file = "test_legacy.py"
"#,
        )
        .unwrap();
        assert_eq!(cfg.max_retries, 5);
        assert_eq!(cfg.transformer.model, "llama-3.1-8b-instant");
        assert_eq!(cfg.transformer.temperature, 0.0);
        assert_eq!(cfg.executor.program, "python3");
        assert_eq!(cfg.executor.timeout_secs, 30);
        assert!(cfg.templates().generate_tests.text().contains("from legacy import *"));
        cfg.validate().unwrap();
    }

    #[test]
    fn test_env_overrides() {
        let mut cfg = RefactorConfig::default();
        cfg.apply_env(env(&[
            ("OPENAI_API_KEY", "sk-fallback"),
            ("REFACTOR_MAX_RETRIES", "4"),
            ("REFACTOR_PYTHON", "/usr/bin/python3.12"),
        ]))
        .unwrap();
        assert_eq!(cfg.transformer.api_key.as_deref(), Some("sk-fallback"));
        assert_eq!(cfg.max_retries, 4);
        assert_eq!(cfg.executor.program, "/usr/bin/python3.12");

        cfg.apply_env(env(&[("GROQ_API_KEY", "gsk-primary"), ("OPENAI_API_KEY", "sk-x")]))
            .unwrap();
        assert_eq!(cfg.transformer.api_key.as_deref(), Some("gsk-primary"));
    }

    #[test]
    fn test_bad_env_value_is_rejected() {
        let mut cfg = RefactorConfig::default();
        let err = cfg
            .apply_env(env(&[("REFACTOR_MAX_RETRIES", "three")]))
            .unwrap_err();
        assert!(err.to_string().contains("REFACTOR_MAX_RETRIES"));
    }

    #[test]
    fn test_validate_rejects_zero_retries_and_bad_templates() {
        let cfg = RefactorConfig {
            max_retries: 0,
            ..RefactorConfig::default()
        };
        assert!(cfg.validate().is_err());

        let mut templates = TemplateSet::default();
        templates.refactor = crate::prompts::PromptTemplate::new("no placeholders here");
        let cfg = RefactorConfig {
            templates: Some(templates),
            ..RefactorConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_nonzero_temperature() {
        let cfg = RefactorConfig::from_toml_str("[transformer]\ntemperature = 0.7\n").unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn test_build_orchestrator_requires_credentials() {
        let err = RefactorConfig::default().build_orchestrator().err().unwrap();
        assert!(matches!(err, RefactorError::Transform(_)));

        let mut cfg = RefactorConfig::default();
        cfg.transformer.api_key = Some("gsk_test".into());
        cfg.max_retries = 2;
        let orchestrator = cfg.build_orchestrator().unwrap();
        assert_eq!(orchestrator.max_retries(), 2);
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refactor.toml");
        std::fs::write(&path, "max_retries = 2\n").unwrap();
        let cfg = RefactorConfig::load(Some(&path)).unwrap();
        // REFACTOR_MAX_RETRIES in the test environment would override the file.
        if std::env::var("REFACTOR_MAX_RETRIES").is_err() {
            assert_eq!(cfg.max_retries, 2);
        }
    }
}

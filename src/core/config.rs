//! Configuration management for Specrun.
//!
//! Handles loading and saving configuration from TOML files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment variable holding the task API key.
pub const API_KEY_ENV: &str = "MANUS_API_KEY";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// AI backend settings
    pub api: ApiConfig,

    /// Spec-driven workflow settings
    pub workflow: WorkflowConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Role used when none is given on the command line
    pub default_role: String,

    /// Project name used in generated documents (defaults to the directory name)
    pub project_name: Option<String>,

    /// Directory (relative to the working directory) holding `memory/` and `specs/`
    pub root_dir: String,
}

/// AI backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Backend provider (task-api, ollama, offline)
    pub provider: String,

    /// Task API base URL
    pub base_url: String,

    /// Task execution mode sent with each request (speed, balanced, quality)
    pub mode: String,

    /// API key; `MANUS_API_KEY` takes precedence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Delay between task status polls in milliseconds
    pub poll_interval_ms: u64,

    /// Maximum number of status polls before giving up on a task
    pub max_poll_attempts: u32,

    /// Retry attempts for transient request failures
    pub max_retries: u32,

    /// Ollama-specific settings
    pub ollama: OllamaConfig,
}

/// Ollama configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Ollama server URL
    pub base_url: String,

    /// Model to use
    pub model: String,
}

/// Spec-driven workflow settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Whether the workflow runs at all
    pub enabled: bool,

    /// Run the workflow only when the trigger classifier fires
    pub auto_detect: bool,

    /// Skip the clarification phase for simple requests
    pub skip_clarification_for_simple: bool,

    /// Maximum number of clarification questions
    pub max_clarifications: usize,

    /// Directory with `<kind>-template.md` overrides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub templates_dir: Option<String>,

    /// Fall back to the built-in templates when an override is missing
    pub builtin_templates: bool,

    /// Offer to reuse a feature whose request matches exactly
    pub reuse_matching_feature: bool,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. `.specrun.toml` in current directory
    /// 2. `~/.config/specrun/config.toml`
    /// 3. Falls back to defaults
    pub fn load() -> anyhow::Result<Self> {
        let local_config = PathBuf::from(".specrun.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(config_dir) = Self::config_dir() {
            let global_config = config_dir.join("config.toml");
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("specrun"))
    }

    /// Resolve the API key, preferring the environment over the file.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.api.api_key.clone().filter(|k| !k.trim().is_empty()))
    }

    /// Template override directory with `~` and env vars expanded.
    pub fn templates_dir(&self) -> Option<PathBuf> {
        self.workflow.templates_dir.as_deref().map(|dir| {
            shellexpand::full(dir)
                .map(|expanded| PathBuf::from(expanded.as_ref()))
                .unwrap_or_else(|_| PathBuf::from(shellexpand::tilde(dir).as_ref()))
        })
    }

    /// Project name, falling back to the name of `dir`.
    pub fn project_name(&self, dir: &Path) -> String {
        self.general.project_name.clone().unwrap_or_else(|| {
            dir.canonicalize()
                .ok()
                .as_deref()
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "project".to_string())
        })
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_role: "assistant".to_string(),
            project_name: None,
            root_dir: ".specrun".to_string(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            provider: "task-api".to_string(),
            base_url: "https://api.manus.ai/v1/tasks".to_string(),
            mode: "speed".to_string(),
            api_key: None,
            timeout_secs: 60,
            poll_interval_ms: 2000,
            max_poll_attempts: 150,
            max_retries: 3,
            ollama: OllamaConfig::default(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self { base_url: "http://localhost:11434".to_string(), model: "llama3.2".to_string() }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_detect: true,
            skip_clarification_for_simple: true,
            max_clarifications: 3,
            templates_dir: None,
            builtin_templates: true,
            reuse_matching_feature: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.default_role, "assistant");
        assert_eq!(config.api.provider, "task-api");
        assert_eq!(config.workflow.max_clarifications, 3);
        assert!(config.workflow.enabled);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[api]"));
        assert!(toml_str.contains("[workflow]"));
        assert!(!toml_str.contains("api_key"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            default_role = "architect"

            [api]
            provider = "offline"
            poll_interval_ms = 10

            [workflow]
            max_clarifications = 1
            templates_dir = "~/my-templates"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.default_role, "architect");
        assert_eq!(config.general.root_dir, ".specrun");
        assert_eq!(config.api.provider, "offline");
        assert_eq!(config.api.poll_interval_ms, 10);
        assert_eq!(config.api.mode, "speed");
        assert_eq!(config.workflow.max_clarifications, 1);
        assert!(config.workflow.auto_detect);

        let dir = config.templates_dir().unwrap();
        assert!(dir.ends_with("my-templates"));
        assert!(!dir.to_string_lossy().starts_with('~'));
    }

    #[test]
    fn test_load_from_file_reports_path() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("broken.toml");
        std::fs::write(&path, "[general\nnot toml").unwrap();

        let err = Config::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_project_name_override() {
        let mut config = Config::default();
        config.general.project_name = Some("todo".to_string());
        assert_eq!(config.project_name(Path::new(".")), "todo");
    }

    #[test]
    #[serial]
    fn test_api_key_env_takes_precedence() {
        let mut config = Config::default();
        config.api.api_key = Some("from-file".to_string());

        std::env::set_var(API_KEY_ENV, "from-env");
        assert_eq!(config.api_key().as_deref(), Some("from-env"));

        std::env::remove_var(API_KEY_ENV);
        assert_eq!(config.api_key().as_deref(), Some("from-file"));
    }

    #[test]
    #[serial]
    fn test_api_key_missing() {
        std::env::remove_var(API_KEY_ENV);
        let config = Config::default();
        assert!(config.api_key().is_none());
    }
}

//! AI backends.
//!
//! Model-backed content generation for the workflow phases, and the final
//! submission of the enhanced prompt.
//!
//! ## Providers
//!
//! - `TaskApiProvider` - hosted task API (create task, poll for the result)
//! - `OllamaProvider` - local LLM fallback

mod ollama;
mod task_api;

pub use ollama::OllamaProvider;
pub use task_api::TaskApiProvider;

use std::time::Duration;

use async_trait::async_trait;

use crate::core::{Config, RetryAction};
use crate::error::WorkflowError;
use crate::workflow::{ContentGenerator, GenerationError, GenerationRequest};

/// Trait for AI providers.
#[async_trait]
pub trait AIProvider: Send + Sync {
    /// Answer `prompt` under the given system prompt.
    async fn complete(&self, system: &str, prompt: &str) -> anyhow::Result<String>;

    /// Get the provider name.
    fn name(&self) -> &str;

    /// Check if the provider is available.
    async fn is_available(&self) -> bool;
}

/// AI error types.
#[derive(Debug, thiserror::Error)]
pub enum AIError {
    #[error("Provider not available: {0}")]
    ProviderNotAvailable(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Connection error: {0}")]
    Transport(String),

    #[error("Rate limited, retry after {0}s")]
    RateLimited(u64),

    #[error("Task failed: {0}")]
    TaskFailed(String),

    #[error("Task did not finish after {0} status checks")]
    Timeout(u32),

    #[error("No response from AI")]
    NoResponse,
}

impl AIError {
    /// Whether and when to retry the same request.
    pub fn retry_action(&self) -> RetryAction {
        match self {
            Self::RateLimited(secs) => RetryAction::After(Duration::from_secs(*secs)),
            Self::Transport(_) => RetryAction::Backoff,
            _ => RetryAction::Stop,
        }
    }
}

/// AI provider manager with fallback support.
///
/// Tries providers in order: task API (if a key is configured) -> Ollama.
pub struct AIManager {
    providers: Vec<Box<dyn AIProvider>>,
}

impl AIManager {
    /// Build the provider chain from `[api]`.
    ///
    /// The task API without a key is a configuration error.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut providers: Vec<Box<dyn AIProvider>> = Vec::new();

        match config.api.provider.as_str() {
            "task-api" => {
                let Some(key) = config.api_key() else {
                    return Err(WorkflowError::Config(format!(
                        "Missing API key: set {} or api.api_key",
                        crate::core::API_KEY_ENV
                    ))
                    .into());
                };
                providers.push(Box::new(TaskApiProvider::new(key, &config.api)?));
                providers.push(Box::new(OllamaProvider::from_config(&config.api.ollama)));
            }
            "ollama" => providers.push(Box::new(OllamaProvider::from_config(&config.api.ollama))),
            other => {
                return Err(WorkflowError::Config(format!("Unknown AI provider '{other}'")).into());
            }
        }

        Ok(Self { providers })
    }

    /// Use an explicit provider chain.
    pub fn with_providers(providers: Vec<Box<dyn AIProvider>>) -> Self {
        Self { providers }
    }

    /// Check if any AI provider is configured.
    pub fn is_available(&self) -> bool {
        !self.providers.is_empty()
    }

    /// Get the active provider name.
    pub fn active_provider(&self) -> Option<&str> {
        self.providers.first().map(|p| p.name())
    }

    /// Ask each reachable provider in turn until one answers.
    pub async fn complete(&self, system: &str, prompt: &str) -> anyhow::Result<String> {
        for provider in &self.providers {
            if !provider.is_available().await {
                tracing::debug!(provider = provider.name(), "Provider unavailable, skipping");
                continue;
            }
            match provider.complete(system, prompt).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    tracing::warn!(provider = provider.name(), error = %e, "Provider failed, trying next");
                }
            }
        }

        Err(AIError::ProviderNotAvailable("No AI provider available".to_string()).into())
    }
}

/// Content generator backed by [`AIManager`].
///
/// Owns a private runtime and blocks on each request, so the workflow core
/// stays synchronous.
pub struct ProviderGenerator {
    runtime: tokio::runtime::Runtime,
    manager: AIManager,
}

impl ProviderGenerator {
    /// Wrap a provider chain.
    pub fn new(manager: AIManager) -> anyhow::Result<Self> {
        Ok(Self { runtime: tokio::runtime::Runtime::new()?, manager })
    }

    /// Send a free-form prompt, blocking until the answer arrives.
    pub fn complete(&self, system: &str, prompt: &str) -> anyhow::Result<String> {
        self.runtime.block_on(self.manager.complete(system, prompt))
    }
}

impl ContentGenerator for ProviderGenerator {
    fn name(&self) -> &str {
        self.manager.active_provider().unwrap_or("none")
    }

    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError> {
        if !self.manager.is_available() {
            return Err(GenerationError::Unavailable("no AI provider configured".to_string()));
        }

        let prompt = request.prompt();
        let text = self
            .complete(&request.context.system_prompt, &prompt)
            .map_err(|e| GenerationError::Failed(e.to_string()))?;

        let text = strip_fence(&text);
        if text.is_empty() {
            return Err(GenerationError::Empty);
        }
        Ok(text.to_string())
    }
}

/// Remove a code fence wrapped around the whole answer.
fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else { return trimmed };
    let Some(body) = rest.strip_suffix("```") else { return trimmed };
    // Drop the info string (```markdown).
    body.split_once('\n').map_or("", |(_, inner)| inner).trim()
}

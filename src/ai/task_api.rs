//! Hosted task API integration.
//!
//! A task is created with `POST {base_url}` and polled with
//! `GET {base_url}/{task_id}` until it completes or fails.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{AIError, AIProvider};
use crate::core::{retry_async, ApiConfig, RetryConfig};

/// Provider for the hosted task API.
pub struct TaskApiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    mode: String,
    poll_interval: Duration,
    max_poll_attempts: u32,
    retry: RetryConfig,
    session_id: String,
}

impl TaskApiProvider {
    /// Create a provider from the `[api]` settings.
    pub fn new(api_key: impl Into<String>, config: &ApiConfig) -> anyhow::Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            anyhow::bail!("API key is empty");
        }

        let client = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            mode: config.mode.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_poll_attempts: config.max_poll_attempts,
            retry: RetryConfig::from_api(config),
            session_id: format!("specrun-{}", uuid::Uuid::new_v4()),
        })
    }

    /// Create a task and return its id.
    async fn create_task(&self, system: &str, prompt: &str) -> Result<String, AIError> {
        let request = CreateTaskRequest {
            prompt,
            mode: &self.mode,
            session_id: &self.session_id,
            system_prompt: Some(system).filter(|s| !s.is_empty()),
        };

        let request = &request;
        let outcome = retry_async(
            &self.retry,
            move || async move {
                let response = self
                    .client
                    .post(&self.base_url)
                    .header("accept", "application/json")
                    .header("content-type", "application/json")
                    .header("API_KEY", &self.api_key)
                    .json(request)
                    .send()
                    .await
                    .map_err(|e| AIError::Transport(e.to_string()))?;

                let response = check_status(response).await?;
                response
                    .json::<CreateTaskResponse>()
                    .await
                    .map_err(|e| AIError::ApiError(format!("Invalid task response: {e}")))
            },
            AIError::retry_action,
        )
        .await;

        if outcome.was_retried() {
            tracing::debug!(
                attempts = outcome.attempts,
                elapsed_ms = outcome.total_time.as_millis() as u64,
                "Task creation retried"
            );
        }
        outcome.into_result()?.task_id.ok_or(AIError::NoResponse)
    }

    /// Fetch a task's current status.
    async fn task_status(&self, task_id: &str) -> Result<TaskStatus, AIError> {
        let response = self
            .client
            .get(format!("{}/{task_id}", self.base_url))
            .header("accept", "application/json")
            .header("API_KEY", &self.api_key)
            .send()
            .await
            .map_err(|e| AIError::Transport(e.to_string()))?;

        check_status(response)
            .await?
            .json::<TaskStatus>()
            .await
            .map_err(|e| AIError::ApiError(format!("Invalid status response: {e}")))
    }

    /// Poll until the task reaches a terminal state.
    async fn wait_for(&self, task_id: &str) -> Result<String, AIError> {
        for attempt in 1..=self.max_poll_attempts {
            let status = self.task_status(task_id).await?;
            match status.status.as_str() {
                "completed" => return status.assistant_text().ok_or(AIError::NoResponse),
                "failed" => {
                    let error = status.error.unwrap_or_else(|| "Unknown error".to_string());
                    return Err(AIError::TaskFailed(error));
                }
                "pending" | "running" => {
                    tracing::debug!(task_id, attempt, "Task still running");
                    tokio::time::sleep(self.poll_interval).await;
                }
                other => return Err(AIError::ApiError(format!("Unknown task status: {other}"))),
            }
        }
        Err(AIError::Timeout(self.max_poll_attempts))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, AIError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);
        return Err(AIError::RateLimited(retry_after));
    }

    let body = response.text().await.unwrap_or_default();
    if status.is_server_error() {
        Err(AIError::Transport(format!("HTTP {status}: {body}")))
    } else {
        Err(AIError::ApiError(format!("HTTP {status}: {body}")))
    }
}

#[async_trait]
impl AIProvider for TaskApiProvider {
    async fn complete(&self, system: &str, prompt: &str) -> anyhow::Result<String> {
        let task_id = self.create_task(system, prompt).await?;
        tracing::info!(task_id = %task_id, "Task created");
        Ok(self.wait_for(&task_id).await?)
    }

    fn name(&self) -> &str {
        "task-api"
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// Task creation payload.
#[derive(Debug, Serialize)]
struct CreateTaskRequest<'a> {
    prompt: &'a str,
    mode: &'a str,
    session_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_prompt: Option<&'a str>,
}

/// Task creation response.
#[derive(Debug, Deserialize)]
struct CreateTaskResponse {
    #[serde(alias = "id")]
    task_id: Option<String>,
}

/// Task status response.
#[derive(Debug, Deserialize)]
struct TaskStatus {
    status: String,

    #[serde(default, alias = "result")]
    output: Vec<OutputItem>,

    #[serde(default)]
    error: Option<String>,
}

impl TaskStatus {
    /// Text of the last assistant message with content.
    fn assistant_text(&self) -> Option<String> {
        self.output
            .iter()
            .rev()
            .filter(|item| item.role == "assistant")
            .find_map(|item| item.content.first().map(|c| c.text.clone()).filter(|t| !t.is_empty()))
    }
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(default)]
    role: String,

    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(default)]
    text: String,
}

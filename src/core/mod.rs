//! Core configuration and resilience helpers for Specrun.

mod config;
mod retry;

pub use config::{ApiConfig, Config, GeneralConfig, OllamaConfig, WorkflowConfig, API_KEY_ENV};
pub use retry::{retry_async, RetryAction, RetryConfig, RetryResult};

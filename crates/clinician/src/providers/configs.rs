use std::time::Duration;

use super::retry::RetryConfig;
use crate::tasks::TaskOverrides;

pub const OPENAI_HOST: &str = "https://api.openai.com";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4";
pub const YOU_HOST: &str = "https://api.you.com";
pub const YOU_DEFAULT_AGENT: &str = "express";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

// Unified enum to wrap the supported provider configurations
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    OpenAi(OpenAiProviderConfig),
    You(YouProviderConfig),
}

impl ProviderConfig {
    pub fn api_key(&self) -> &str {
        match self {
            ProviderConfig::OpenAi(config) => &config.api_key,
            ProviderConfig::You(config) => &config.api_key,
        }
    }

    /// Name of the credential, used in configuration errors.
    pub fn credential_name(&self) -> &'static str {
        match self {
            ProviderConfig::OpenAi(_) => "OpenAI API key",
            ProviderConfig::You(_) => "You.com API key",
        }
    }
}

/// Chat-completions style provider.
#[derive(Debug, Clone)]
pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: String,
    pub default_model: String,
    pub temperature: f32,
}

impl OpenAiProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            host: OPENAI_HOST.to_string(),
            api_key: api_key.into(),
            default_model: OPENAI_DEFAULT_MODEL.to_string(),
            temperature: 0.0,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }
}

/// Agent-run style provider.
#[derive(Debug, Clone)]
pub struct YouProviderConfig {
    pub host: String,
    pub api_key: String,
    pub default_agent: String,
}

impl YouProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            host: YOU_HOST.to_string(),
            api_key: api_key.into(),
            default_agent: YOU_DEFAULT_AGENT.to_string(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }
}

/// Everything an [`AgentClient`](crate::client::AgentClient) needs, built
/// once at start-up and never read from the environment afterwards.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub provider: ProviderConfig,
    pub tasks: TaskOverrides,
    pub retry: RetryConfig,
    /// Applied to every attempt, up to the response headers for streaming
    /// calls and up to the full body otherwise.
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            tasks: TaskOverrides::default(),
            retry: RetryConfig::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_tasks(mut self, tasks: TaskOverrides) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

use crate::error::{to_env_var, ConfigError};
use clinician::providers::{
    configs::{
        ClientConfig, OpenAiProviderConfig, ProviderConfig, YouProviderConfig,
        OPENAI_DEFAULT_MODEL, OPENAI_HOST, YOU_DEFAULT_AGENT, YOU_HOST,
    },
    factory::ProviderType,
};
use clinician::{AgentTask, RetryConfig, TaskOverrides, TaskSettings};
use config::{Config, Environment};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum ProviderSettings {
    OpenAi {
        #[serde(default = "default_openai_host")]
        host: String,
        api_key: String,
        #[serde(default = "default_model")]
        model: String,
        #[serde(default)]
        temperature: f32,
    },
    You {
        #[serde(default = "default_you_host")]
        host: String,
        api_key: String,
        #[serde(default = "default_agent")]
        agent: String,
    },
}

impl ProviderSettings {
    pub fn provider_type(&self) -> ProviderType {
        match self {
            ProviderSettings::OpenAi { .. } => ProviderType::OpenAi,
            ProviderSettings::You { .. } => ProviderType::You,
        }
    }

    // Convert to the clinician ProviderConfig
    pub fn into_config(self) -> ProviderConfig {
        match self {
            ProviderSettings::OpenAi {
                host,
                api_key,
                model,
                temperature,
            } => ProviderConfig::OpenAi(OpenAiProviderConfig {
                host,
                api_key,
                default_model: model,
                temperature,
            }),
            ProviderSettings::You {
                host,
                api_key,
                agent,
            } => ProviderConfig::You(YouProviderConfig {
                host,
                api_key,
                default_agent: agent,
            }),
        }
    }
}

/// Per-task model, agent and prompt overrides.
#[derive(Debug, Default, Deserialize)]
pub struct TasksSettings {
    #[serde(default)]
    pub summarize: TaskSettings,
    #[serde(default)]
    pub triage: TaskSettings,
    #[serde(default)]
    pub reply: TaskSettings,
}

impl TasksSettings {
    pub fn into_overrides(self) -> TaskOverrides {
        TaskOverrides::new()
            .with(AgentTask::Summarize, self.summarize)
            .with(AgentTask::Triage, self.triage)
            .with(AgentTask::Reply, self.reply)
    }
}

#[derive(Debug, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default)]
    pub jitter: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: false,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RetrySettings {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            backoff_base: Duration::from_millis(self.backoff_base_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            jitter: self.jitter,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Connection string for the user store. Only normalised here, never opened.
#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

impl DatabaseSettings {
    /// The URL with any async driver suffix removed from the scheme,
    /// e.g. `sqlite+aiosqlite:///./app.db` -> `sqlite:///./app.db`.
    pub fn sync_url(&self) -> String {
        match self.url.split_once("://") {
            Some((scheme, rest)) => match scheme.split_once('+') {
                Some((dialect, _driver)) => format!("{}://{}", dialect, rest),
                None => self.url.clone(),
            },
            None => self.url.clone(),
        }
    }

    /// Scheme of the sync URL, safe to log.
    pub fn dialect(&self) -> String {
        self.sync_url()
            .split_once("://")
            .map(|(scheme, _)| scheme.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub provider: ProviderSettings,
    #[serde(default)]
    pub tasks: TasksSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub database: DatabaseSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .add_source(
                Environment::with_prefix("CLINICIAN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        match result {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                if let Some(field) = missing_field(&err.to_string()) {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(&field),
                    })
                } else if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }

    /// Everything the agent client needs. Consumes the provider settings so
    /// the credential only lives in one place.
    pub fn client_config(self) -> ClientConfig {
        let timeout = self.retry.timeout();
        let retry = self.retry.retry_config();
        ClientConfig::new(self.provider.into_config())
            .with_tasks(self.tasks.into_overrides())
            .with_retry(retry)
            .with_timeout(timeout)
    }
}

/// Dotted path of the field named in a "missing field `x` [for key `y`]" message.
fn missing_field(message: &str) -> Option<String> {
    let rest = message.strip_prefix("missing field `")?;
    let (field, rest) = rest.split_once('`')?;

    match rest
        .strip_prefix(" for key `")
        .and_then(|key| key.split_once('`'))
    {
        Some((key, _)) if !key.is_empty() => Some(format!("{}.{}", key, field)),
        _ => Some(field.to_string()),
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_model() -> String {
    OPENAI_DEFAULT_MODEL.to_string()
}

fn default_agent() -> String {
    YOU_DEFAULT_AGENT.to_string()
}

fn default_openai_host() -> String {
    OPENAI_HOST.to_string()
}

fn default_you_host() -> String {
    YOU_HOST.to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_database_url() -> String {
    "sqlite+aiosqlite:///./app.db".to_string()
}

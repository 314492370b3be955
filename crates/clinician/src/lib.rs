pub mod client;
pub mod errors;
pub mod prompt;
pub mod providers;
pub mod tasks;

pub use client::{AgentClient, AgentOutput, AgentRunner};
pub use errors::{ProviderError, ProviderResult};
pub use providers::configs::{ClientConfig, OpenAiProviderConfig, ProviderConfig, YouProviderConfig};
pub use providers::retry::RetryConfig;
pub use providers::streaming::TextStream;
pub use tasks::{AgentTask, RunRequest, TaskOverrides, TaskSettings};

//! Public entry point: run a task over a note and get text back.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::debug;

use crate::errors::{ProviderError, ProviderResult};
use crate::providers::base::Provider;
use crate::providers::configs::ClientConfig;
use crate::providers::factory::get_provider;
use crate::providers::streaming::{collect_text, decode_response, TextStream};
use crate::providers::transport::{ProviderResponse, Transport};
use crate::tasks::{AgentTask, RunRequest};

/// Result of [`AgentClient::run`].
pub enum AgentOutput {
    /// Trimmed answer text. May be empty, which is not an error.
    Text(String),
    /// Answer fragments; the provider connection is already open.
    Stream(TextStream),
}

impl std::fmt::Debug for AgentOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentOutput::Text(text) => f.debug_tuple("Text").field(text).finish(),
            AgentOutput::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// What the HTTP layer needs from a client.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn complete(&self, task: AgentTask, content: &str) -> ProviderResult<String>;

    async fn stream(&self, task: AgentTask, content: &str) -> ProviderResult<TextStream>;
}

pub struct AgentClient {
    provider: Box<dyn Provider>,
    transport: Transport,
}

impl AgentClient {
    /// Fails when the provider credential is missing; nothing is sent.
    pub fn new(config: ClientConfig) -> ProviderResult<Self> {
        if config.provider.api_key().trim().is_empty() {
            return Err(ProviderError::Configuration(
                config.provider.credential_name().to_string(),
            ));
        }

        let provider = get_provider(config.provider, config.tasks);
        let transport = Transport::new(
            provider.name(),
            provider.endpoint(),
            provider.api_key(),
            config.retry,
            config.timeout,
        );

        Ok(Self {
            provider,
            transport,
        })
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub async fn run(
        &self,
        task: AgentTask,
        content: &str,
        stream: bool,
    ) -> ProviderResult<AgentOutput> {
        let request = RunRequest::new(task, content, stream)?;
        let candidates = self.provider.candidates(&request);
        debug!(
            provider = self.provider.name(),
            %task,
            stream,
            candidates = candidates.len(),
            "Running agent task"
        );

        match self.transport.send(&candidates, stream).await? {
            ProviderResponse::Document(document) => Ok(AgentOutput::Text(
                self.provider.extractor().extract(&document),
            )),
            ProviderResponse::Stream(response) => Ok(AgentOutput::Stream(decode_response(
                self.provider.name(),
                response,
                self.provider.fragment_path(),
            ))),
        }
    }
}

#[async_trait]
impl AgentRunner for AgentClient {
    async fn complete(&self, task: AgentTask, content: &str) -> ProviderResult<String> {
        match self.run(task, content, false).await? {
            AgentOutput::Text(text) => Ok(text),
            AgentOutput::Stream(fragments) => Ok(collect_text(fragments).await?.trim().to_string()),
        }
    }

    async fn stream(&self, task: AgentTask, content: &str) -> ProviderResult<TextStream> {
        match self.run(task, content, true).await? {
            AgentOutput::Stream(fragments) => Ok(fragments),
            AgentOutput::Text(text) => Ok(stream::once(async move { Ok(text) }).boxed()),
        }
    }
}

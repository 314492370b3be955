use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum_macros::{Display, EnumIter, EnumString};

use crate::errors::{ProviderError, ProviderResult};

/// The logical jobs the backend knows how to hand to a provider.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AgentTask {
    Summarize,
    Triage,
    Reply,
}

/// Per-task overrides. Anything left as `None` falls back to the provider
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TaskSettings {
    /// Model name for chat-completions providers.
    #[serde(default)]
    pub model: Option<String>,
    /// Provider-side agent identifier for agent-run providers.
    #[serde(default)]
    pub agent: Option<String>,
    /// Replacement for the built-in system prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskOverrides {
    settings: HashMap<AgentTask, TaskSettings>,
}

impl TaskOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, task: AgentTask, settings: TaskSettings) -> Self {
        self.settings.insert(task, settings);
        self
    }

    pub fn get(&self, task: AgentTask) -> Option<&TaskSettings> {
        self.settings.get(&task)
    }

    pub fn model(&self, task: AgentTask) -> Option<&str> {
        self.get(task).and_then(|s| s.model.as_deref())
    }

    pub fn agent(&self, task: AgentTask) -> Option<&str> {
        self.get(task).and_then(|s| s.agent.as_deref())
    }

    pub fn system_prompt(&self, task: AgentTask) -> Option<&str> {
        self.get(task).and_then(|s| s.system_prompt.as_deref())
    }
}

/// One inbound call to run `task` over `content`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub task: AgentTask,
    pub content: String,
    pub stream: bool,
}

impl RunRequest {
    pub fn new(task: AgentTask, content: impl Into<String>, stream: bool) -> ProviderResult<Self> {
        let content = content.into();
        if content.is_empty() {
            return Err(ProviderError::InvalidRequest(
                "content must not be empty".to_string(),
            ));
        }
        Ok(Self {
            task,
            content,
            stream,
        })
    }
}

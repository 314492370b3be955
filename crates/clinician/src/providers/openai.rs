use super::base::Provider;
use super::configs::OpenAiProviderConfig;
use super::extract::Extractor;
use super::request::{chat_candidates, CandidateBody};
use super::streaming::FragmentPath;
use crate::prompt;
use crate::tasks::{AgentTask, RunRequest, TaskOverrides};

pub struct OpenAiProvider {
    config: OpenAiProviderConfig,
    tasks: TaskOverrides,
    extractor: Extractor,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig, tasks: TaskOverrides) -> Self {
        Self {
            config,
            tasks,
            extractor: Extractor::chat(),
        }
    }

    pub fn model_for(&self, task: AgentTask) -> &str {
        self.tasks
            .model(task)
            .unwrap_or(self.config.default_model.as_str())
    }

    pub fn system_prompt_for(&self, task: AgentTask) -> &str {
        self.tasks
            .system_prompt(task)
            .unwrap_or_else(|| prompt::system_prompt(task))
    }
}

impl Provider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "OpenAI"
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        )
    }

    fn api_key(&self) -> &str {
        &self.config.api_key
    }

    fn candidates(&self, request: &RunRequest) -> Vec<CandidateBody> {
        chat_candidates(
            self.model_for(request.task),
            self.system_prompt_for(request.task),
            &request.content,
            self.config.temperature,
            request.stream,
        )
    }

    fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    fn fragment_path(&self) -> FragmentPath {
        FragmentPath::ChatDelta
    }
}

use super::base::Provider;
use super::configs::YouProviderConfig;
use super::extract::Extractor;
use super::request::{agent_candidates, CandidateBody};
use super::streaming::FragmentPath;
use crate::tasks::{AgentTask, RunRequest, TaskOverrides};

/// Agent-run provider. The agent identifier replaces model and system
/// prompt; both live on the provider side.
pub struct YouProvider {
    config: YouProviderConfig,
    tasks: TaskOverrides,
    extractor: Extractor,
}

impl YouProvider {
    pub fn new(config: YouProviderConfig, tasks: TaskOverrides) -> Self {
        Self {
            config,
            tasks,
            extractor: Extractor::agent_run(),
        }
    }

    pub fn agent_for(&self, task: AgentTask) -> &str {
        self.tasks
            .agent(task)
            .unwrap_or(self.config.default_agent.as_str())
    }
}

impl Provider for YouProvider {
    fn name(&self) -> &'static str {
        "You.com"
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/agents/runs", self.config.host.trim_end_matches('/'))
    }

    fn api_key(&self) -> &str {
        &self.config.api_key
    }

    fn candidates(&self, request: &RunRequest) -> Vec<CandidateBody> {
        agent_candidates(self.agent_for(request.task), &request.content, request.stream)
    }

    fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    fn fragment_path(&self) -> FragmentPath {
        FragmentPath::AgentDelta
    }
}

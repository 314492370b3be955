use super::{
    base::Provider, configs::ProviderConfig, openai::OpenAiProvider, you::YouProvider,
};
use crate::tasks::TaskOverrides;
use strum_macros::{Display, EnumIter, EnumString};

#[derive(EnumIter, EnumString, Display, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum ProviderType {
    OpenAi,
    You,
}

impl ProviderType {
    pub fn of(config: &ProviderConfig) -> Self {
        match config {
            ProviderConfig::OpenAi(_) => ProviderType::OpenAi,
            ProviderConfig::You(_) => ProviderType::You,
        }
    }
}

pub fn get_provider(config: ProviderConfig, tasks: TaskOverrides) -> Box<dyn Provider> {
    match config {
        ProviderConfig::OpenAi(openai_config) => {
            Box::new(OpenAiProvider::new(openai_config, tasks))
        }
        ProviderConfig::You(you_config) => Box::new(YouProvider::new(you_config, tasks)),
    }
}

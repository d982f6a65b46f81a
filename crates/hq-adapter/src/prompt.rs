//! Stage prompt templates read from `{prompts}/{stage}.txt`
//!
//! `{mission}` in a template is replaced with the mission name. A stage
//! without a template gets a one-line fallback prompt.

use std::path::PathBuf;

use async_trait::async_trait;
use hq_domain::{Mission, Stage};
use hq_usecase::ports::PromptSource;
use hq_usecase::PromptError;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FilePromptSource {
    dir: PathBuf,
}

impl FilePromptSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn template_path(&self, stage: Stage) -> PathBuf {
        self.dir.join(format!("{}.txt", stage.as_str()))
    }
}

pub fn fallback_prompt(stage: Stage, mission: &str) -> String {
    format!("This is the bot for the {} stage of mission {}.", stage.as_str(), mission)
}

#[async_trait]
impl PromptSource for FilePromptSource {
    async fn system_prompt(&self, stage: Stage, mission: &Mission) -> Result<String, PromptError> {
        let path = self.template_path(stage);
        match tokio::fs::read_to_string(&path).await {
            Ok(template) => Ok(template.trim().replace("{mission}", mission.name())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(stage = %stage, path = %path.display(), "No prompt template, using fallback");
                Ok(fallback_prompt(stage, mission.name()))
            }
            Err(err) => Err(PromptError::Read {
                path: path.display().to_string(),
                message: err.to_string(),
            }),
        }
    }
}

//! Mission Stage Engine
//!
//! Owns the stage state machine of every mission it is handed:
//!
//! ```text
//! INTAKE ──► BRIEFING ──► BEACON ──► EXFIL ──► COMPLETED
//!   gate        gate        gate       gate
//! ```
//!
//! Each arrow is `next_stage`: evaluate the current stage's gate, close its
//! channel, init the successor (fresh agent, fresh conversation, entry
//! narrative). The plan may be any ordered subset of the stages above.
//!
//! The engine never keeps missions itself. Callers pass `&mut Mission` and
//! are responsible for serializing access per mission (see `GameMaster`).

mod chat;
mod dispatch;
mod stages;

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use hq_domain::{Mission, MissionId, MissionRepository, RandomSource, StagePlan};
use tracing::{info, warn};

use crate::error::{EngineError, Result};
use crate::ports::{
    ChannelGateway, ChannelRef, ModelProvider, PromptSource, TranscriptEntry, TranscriptLog,
    HQ_SENDER,
};

/// Model used when nothing else is configured
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Upper bound for every external call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Channel a human game master watches
pub const DM_CHANNEL: &str = "dm";

/// Resolved engine settings
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub model: String,
    pub call_timeout: Duration,
    pub drop_distance_km: f64,
    pub plan: StagePlan,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            drop_distance_km: hq_domain::DEFAULT_DROP_DISTANCE_KM,
            plan: StagePlan::standard(),
        }
    }
}

/// Everything the engine talks to besides the repository
pub struct EnginePorts {
    pub provider: Arc<dyn ModelProvider>,
    pub channels: Arc<dyn ChannelGateway>,
    pub prompts: Arc<dyn PromptSource>,
    pub transcript: Arc<dyn TranscriptLog>,
    pub random: Box<dyn RandomSource + Send>,
}

/// The Mission Stage Engine
pub struct StageEngine<R: MissionRepository> {
    repository: Arc<R>,
    provider: Arc<dyn ModelProvider>,
    channels: Arc<dyn ChannelGateway>,
    prompts: Arc<dyn PromptSource>,
    transcript: Arc<dyn TranscriptLog>,
    random: Mutex<Box<dyn RandomSource + Send>>,
    config: EngineConfig,
}

impl<R: MissionRepository> StageEngine<R> {
    pub fn new(repository: Arc<R>, ports: EnginePorts, config: EngineConfig) -> Self {
        Self {
            repository,
            provider: ports.provider,
            channels: ports.channels,
            prompts: ports.prompts,
            transcript: ports.transcript,
            random: Mutex::new(ports.random),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========== Missions ==========

    /// Create a mission and enter the first planned stage
    pub async fn create_mission(&self, name: &str) -> Result<Mission> {
        let id = MissionId::from_name(name);
        if self.mission_exists(&id).await? {
            return Err(EngineError::MissionExists(name.to_string()));
        }

        let first = self.config.plan.first();
        let mut mission =
            Mission::new(name.trim(), first).with_distance_km(self.config.drop_distance_km);
        self.init_stage(&mut mission, first).await?;

        info!(mission = %mission.id(), stage = %first, "Mission created");
        Ok(mission)
    }

    /// Load a persisted mission. Agents are rebuilt lazily on first use.
    pub async fn find_mission(&self, id: &MissionId) -> Result<Option<Mission>> {
        self.within("find_mission", self.repository.find_by_id(id)).await
    }

    pub async fn mission_exists(&self, id: &MissionId) -> Result<bool> {
        self.within("mission_exists", self.repository.exists(id)).await
    }

    /// Write the whole aggregate
    pub async fn persist(&self, mission: &Mission) -> Result<()> {
        self.within("save_mission", self.repository.save(mission)).await
    }

    // ========== Helpers ==========

    /// Bound an external call by the configured timeout
    async fn within<T, E, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, E>>,
        EngineError: From<E>,
    {
        match tokio::time::timeout(self.config.call_timeout, call).await {
            Ok(result) => result.map_err(EngineError::from),
            Err(_) => Err(EngineError::Timeout {
                operation,
                seconds: self.config.call_timeout.as_secs(),
            }),
        }
    }

    /// Send `text` to `channel` and log it as posted by HQ.
    /// A transcript failure only warns.
    async fn post(&self, channel: &ChannelRef, text: &str) -> Result<()> {
        self.within("send_message", self.channels.send_message(channel, text))
            .await?;

        let entry = TranscriptEntry::now(channel.name.as_str(), HQ_SENDER, text);
        if let Err(err) = self.transcript.append(&entry).await {
            warn!(channel = %channel, error = %err, "Failed to write transcript");
        }
        Ok(())
    }

    /// Run `f` with exclusive use of the random source
    fn with_random<T>(&self, f: impl FnOnce(&mut dyn RandomSource) -> T) -> T {
        let mut guard = self.random.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut **guard)
    }
}

//! GameMaster - Inbound message router
//!
//! ```text
//! message ──► transcript ──┬─► #admin "!cmd"   ──► admin commands
//!                          ├─► category=mission ──► StageEngine::chat
//!                          └─► anything else   ──► ignored
//!
//! reply   ──► transcript (sender HQ)
//! ```
//!
//! Missions are loaded lazily and kept in memory. Each has its own
//! `tokio::sync::Mutex`, held for the whole message, so two messages for
//! the same mission queue while different missions run side by side.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use hq_domain::{Mission, MissionId, MissionRepository};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{error, info, warn};

use crate::engine::StageEngine;
use crate::error::EngineError;
use crate::ports::{TranscriptEntry, TranscriptLog, HQ_SENDER};

/// Channel whose `!` messages are admin commands
pub const ADMIN_CHANNEL: &str = "admin";

/// Delivered instead of an answer when handling fails
pub const APOLOGY: &str = "⚠️ HQ is having trouble right now. Please try again in a moment.";

/// One message as received from the chat platform
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Category of the channel, if it has one
    pub category: Option<String>,
    pub channel: String,
    pub sender: String,
    pub content: String,
    /// Sent by a bot account (including ourselves)
    pub from_bot: bool,
}

type MissionSlot = Arc<AsyncMutex<Option<Mission>>>;

pub struct GameMaster<R: MissionRepository> {
    engine: Arc<StageEngine<R>>,
    transcript: Arc<dyn TranscriptLog>,
    missions: Mutex<HashMap<MissionId, MissionSlot>>,
}

impl<R: MissionRepository> GameMaster<R> {
    pub fn new(engine: Arc<StageEngine<R>>, transcript: Arc<dyn TranscriptLog>) -> Self {
        Self {
            engine,
            transcript,
            missions: Mutex::new(HashMap::new()),
        }
    }

    /// Handle one inbound message and return the reply to post in the
    /// same channel, if any. Never fails: errors become [`APOLOGY`].
    ///
    /// Every message is logged, bot messages included; so is the reply.
    pub async fn handle(&self, message: &InboundMessage) -> Option<String> {
        self.record(TranscriptEntry::now(
            message.channel.as_str(),
            message.sender.as_str(),
            message.content.as_str(),
        ))
        .await;
        if message.from_bot {
            return None;
        }

        let reply = self.route(message).await;
        if let Some(text) = &reply {
            self.record(TranscriptEntry::now(message.channel.as_str(), HQ_SENDER, text.as_str()))
                .await;
        }
        reply
    }

    async fn route(&self, message: &InboundMessage) -> Option<String> {
        if message.channel == ADMIN_CHANNEL && message.content.starts_with('!') {
            return self.admin(&message.content).await;
        }

        let category = message.category.as_deref()?;
        let id = MissionId::from_name(category);
        let slot = self.slot(&id);
        let mut guard = slot.lock().await;

        let outcome = match self.load_into(&id, &mut guard).await {
            Ok(Some(mission)) => {
                let payload = format!("{}: {}", message.sender, message.content);
                Some(self.engine.chat(mission, &payload).await)
            }
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        };
        // category that is not a mission
        let Some(result) = outcome else {
            drop(guard);
            drop(slot);
            self.release(&id);
            return None;
        };

        match result {
            Ok(reply) => reply,
            Err(err) => {
                // reload the stored state on the next message
                *guard = None;
                error!(mission = %id, error = %err, transient = err.is_transient(), "Failed to handle message");
                Some(APOLOGY.to_string())
            }
        }
    }

    // ========== Admin ==========

    async fn admin(&self, content: &str) -> Option<String> {
        let mut parts = content.splitn(2, char::is_whitespace);
        let command = parts.next().unwrap_or_default();
        let argument = parts.next().map(str::trim).unwrap_or_default();

        let reply = match command {
            "!new" => self.new_mission(argument).await,
            "!status" => self.status(argument).await,
            _ => {
                info!(command, "Ignoring unknown admin command");
                return None;
            }
        };

        Some(reply.unwrap_or_else(|err| {
            error!(command, error = %err, "Admin command failed");
            APOLOGY.to_string()
        }))
    }

    async fn new_mission(&self, name: &str) -> Result<String, EngineError> {
        if name.is_empty() {
            return Ok("Usage: !new <mission name>".to_string());
        }

        let id = MissionId::from_name(name);
        let slot = self.slot(&id);
        let mut guard = slot.lock().await;
        if guard.is_some() || self.engine.mission_exists(&id).await? {
            return Ok(format!("⚠️ Mission '{}' already exists.", name));
        }

        match self.engine.create_mission(name).await {
            Ok(mission) => {
                *guard = Some(mission);
                Ok(format!("✅ New mission '{}' created.", name))
            }
            Err(err) => {
                drop(guard);
                drop(slot);
                self.release(&id);
                Err(err)
            }
        }
    }

    async fn status(&self, name: &str) -> Result<String, EngineError> {
        if name.is_empty() {
            return Ok("Usage: !status <mission name>".to_string());
        }

        let id = MissionId::from_name(name);
        let slot = self.slot(&id);
        let mut guard = slot.lock().await;

        let found = self.load_into(&id, &mut guard).await?.map(|mission| {
            format!(
                "Mission {}: stage {}, {} player(s).",
                mission.name(),
                mission.stage(),
                mission.players().len()
            )
        });
        match found {
            Some(reply) => Ok(reply),
            None => {
                drop(guard);
                drop(slot);
                self.release(&id);
                Ok(format!("Mission '{}' not found.", name))
            }
        }
    }

    // ========== Missions ==========

    fn slot(&self, id: &MissionId) -> MissionSlot {
        let mut missions = self.missions.lock().unwrap_or_else(PoisonError::into_inner);
        missions.entry(id.clone()).or_default().clone()
    }

    /// Forget the slot of `id` if nobody uses it and it holds no mission
    fn release(&self, id: &MissionId) {
        let mut missions = self.missions.lock().unwrap_or_else(PoisonError::into_inner);
        let unused = missions.get(id).is_some_and(|slot| {
            Arc::strong_count(slot) == 1 && matches!(slot.try_lock(), Ok(guard) if guard.is_none())
        });
        if unused {
            missions.remove(id);
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.missions.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// The mission held in `guard`, loaded from the repository on first use
    async fn load_into<'g>(
        &self,
        id: &MissionId,
        guard: &'g mut Option<Mission>,
    ) -> Result<Option<&'g mut Mission>, EngineError> {
        if guard.is_none() {
            *guard = self.engine.find_mission(id).await?;
            if let Some(mission) = guard.as_ref() {
                info!(mission = %id, stage = %mission.stage(), "Mission loaded");
            }
        }
        Ok(guard.as_mut())
    }

    async fn record(&self, entry: TranscriptEntry) {
        if let Err(err) = self.transcript.append(&entry).await {
            warn!(error = %err, "Failed to write transcript");
        }
    }
}

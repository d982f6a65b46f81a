//! Stage transitions and stage agents

use hq_domain::{
    Agent, ConversationHandle, GateOutcome, GatePolicy, Mission, MissionRepository, Stage,
};
use tracing::{debug, info};

use super::StageEngine;
use crate::error::{EngineError, Result};
use crate::ports::{ChannelRef, InputItem};

/// A stage whose agent, conversation and channel are ready
struct PreparedStage {
    stage: Stage,
    agent: Agent,
    conversation: ConversationHandle,
    channel: ChannelRef,
}

impl<R: MissionRepository> StageEngine<R> {
    // ========== Agents ==========

    /// Build a new agent for `stage` from its profile and prompt template
    async fn build_agent(&self, mission: &Mission, stage: Stage) -> Result<Agent> {
        let profile = self
            .config
            .plan
            .profile(stage)
            .ok_or(EngineError::StageNotPlanned { stage })?;
        let prompt = self
            .within("system_prompt", self.prompts.system_prompt(stage, mission))
            .await?;

        Ok(Agent::new(
            mission.id().clone(),
            stage,
            prompt,
            self.config.model.clone(),
            profile.tools.clone(),
        ))
    }

    /// The current stage's agent, built on first use.
    ///
    /// A rebuilt agent picks up the conversation remembered for its stage,
    /// so a restart resumes where the players left off.
    pub async fn load_stage_bot<'m>(&self, mission: &'m mut Mission) -> Result<&'m mut Agent> {
        let stage = mission.stage();
        let agent = match mission.take_bot(stage) {
            Some(agent) => agent,
            None => {
                let mut agent = self.build_agent(mission, stage).await?;
                if let Some(handle) = mission.conversation_for(stage) {
                    debug!(mission = %mission.id(), stage = %stage, conversation = %handle, "Resuming conversation");
                    agent.attach_conversation(handle.clone())?;
                }
                agent
            }
        };
        Ok(mission.cache_bot(agent))
    }

    /// Make sure the current stage's agent has a remote conversation.
    /// Seeds a new one with the system prompt as its only item.
    pub async fn ensure_conversation(&self, mission: &mut Mission) -> Result<ConversationHandle> {
        let stage = mission.stage();
        let agent = self.load_stage_bot(mission).await?;
        if let Some(handle) = agent.conversation() {
            return Ok(handle.clone());
        }

        let seed = [InputItem::system(agent.system_prompt())];
        let handle = self
            .within("create_conversation", self.provider.create_conversation(&seed))
            .await?;
        agent.attach_conversation(handle.clone())?;
        mission.remember_conversation(stage, handle.clone());

        info!(mission = %mission.id(), stage = %stage, conversation = %handle, "Conversation created");
        Ok(handle)
    }

    // ========== Transitions ==========

    /// Enter `stage` with a brand-new agent and conversation, announce it
    /// in the stage channel and persist.
    ///
    /// `stage` must be the current stage or its successor in the plan.
    pub async fn init_stage(&self, mission: &mut Mission, stage: Stage) -> Result<()> {
        if !self.config.plan.contains(stage) {
            return Err(EngineError::StageNotPlanned { stage });
        }
        let current = mission.stage();
        if stage != current && self.config.plan.successor(current) != Some(stage) {
            return Err(EngineError::StageSkipped {
                from: current,
                to: stage,
            });
        }

        let prepared = self.prepare_stage(mission, stage).await?;
        self.open_stage(mission, prepared).await
    }

    /// Everything a stage needs before the mission may enter it.
    /// Leaves `mission` untouched.
    async fn prepare_stage(&self, mission: &Mission, stage: Stage) -> Result<PreparedStage> {
        let mut agent = self.build_agent(mission, stage).await?;
        let seed = [InputItem::system(agent.system_prompt())];
        let conversation = self
            .within("create_conversation", self.provider.create_conversation(&seed))
            .await?;
        agent.attach_conversation(conversation.clone())?;

        let channel = self
            .within(
                "ensure_channel",
                self.channels
                    .ensure_channel(mission.id().as_str(), stage.as_str()),
            )
            .await?;

        Ok(PreparedStage {
            stage,
            agent,
            conversation,
            channel,
        })
    }

    /// Move `mission` into a prepared stage, persist, then announce it
    async fn open_stage(&self, mission: &mut Mission, prepared: PreparedStage) -> Result<()> {
        let PreparedStage {
            stage,
            agent,
            conversation,
            channel,
        } = prepared;

        mission.enter_stage(stage)?;
        mission.cache_bot(agent);
        mission.remember_conversation(stage, conversation.clone());
        self.persist(mission).await?;
        info!(mission = %mission.id(), stage = %stage, conversation = %conversation, "Stage initialized");

        let narrative = stage.entry_narrative(mission.name());
        self.post(&channel, &narrative).await
    }

    /// Post the closing narrative and lock the stage channel
    pub async fn close_stage(&self, mission: &mut Mission, stage: Stage) -> Result<()> {
        let found = self
            .within(
                "find_channel",
                self.channels.find_channel(mission.id().as_str(), stage.as_str()),
            )
            .await?;

        match found {
            Some(channel) => {
                let narrative = stage.closing_narrative(mission.name());
                self.post(&channel, &narrative).await?;
                self.within("set_read_only", self.channels.set_read_only(&channel))
                    .await?;
                info!(mission = %mission.id(), stage = %stage, "Stage closed");
            }
            None => {
                debug!(mission = %mission.id(), stage = %stage, "No channel to close");
            }
        }

        self.persist(mission).await
    }

    /// Evaluate the gate of `stage`
    pub fn is_stage_completed(&self, mission: &Mission, stage: Stage) -> GateOutcome {
        match self.config.plan.profile(stage) {
            Some(profile) => profile.gate.evaluate(mission),
            None => GatePolicy::Never {
                reason: "unknown stage".to_string(),
            }
            .evaluate(mission),
        }
    }

    /// Close the current stage and init its successor in the plan.
    ///
    /// The successor is prepared before anything is closed, so a failure
    /// there leaves the current stage open and the mission where it was.
    pub async fn init_next_stage(&self, mission: &mut Mission) -> Result<Stage> {
        let current = mission.stage();
        let next = self
            .config
            .plan
            .successor(current)
            .ok_or_else(|| EngineError::NoSuccessor {
                mission: mission.name().to_string(),
                stage: current,
            })?;

        let prepared = self.prepare_stage(mission, next).await?;
        self.close_stage(mission, current).await?;
        self.open_stage(mission, prepared).await?;
        Ok(next)
    }

    /// The `next_stage` tool: advance if the gate allows it.
    /// A closed gate is a normal answer, not an error.
    pub async fn next_stage(&self, mission: &mut Mission) -> Result<String> {
        let current = mission.stage();
        let outcome = self.is_stage_completed(mission, current);
        if !outcome.completed {
            info!(mission = %mission.id(), stage = %current, reason = %outcome.reason, "Stage gate closed");
            return Ok(format!(
                "Stage {} is not complete yet: {}",
                current, outcome.reason
            ));
        }

        let next = self.init_next_stage(mission).await?;
        Ok(format!(
            "Stage {} complete. The mission is now in stage {}.",
            current, next
        ))
    }
}

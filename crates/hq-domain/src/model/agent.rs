//! Agent - The AI persona bound to one mission stage
//!
//! Agent is an Entity identified by `(mission, stage)`.
//! It starts without a remote conversation. Once a conversation handle is
//! attached it never changes; starting over means building a fresh Agent.

use super::mission::MissionId;
use super::stage::Stage;
use super::tool::ToolName;

/// Opaque identifier of a conversation held by the model provider
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationHandle(String);

impl ConversationHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ConversationHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stage persona ("Bot")
#[derive(Debug, Clone)]
pub struct Agent {
    mission: MissionId,
    stage: Stage,
    /// Immutable system prompt rendered from the stage template
    system_prompt: String,
    /// Created lazily on first use
    conversation: Option<ConversationHandle>,
    model: String,
    allowed_tools: Vec<ToolName>,
}

impl Agent {
    /// Create an agent with no conversation yet
    pub fn new(
        mission: MissionId,
        stage: Stage,
        system_prompt: impl Into<String>,
        model: impl Into<String>,
        allowed_tools: Vec<ToolName>,
    ) -> Self {
        Self {
            mission,
            stage,
            system_prompt: system_prompt.into(),
            conversation: None,
            model: model.into(),
            allowed_tools,
        }
    }

    // ========== Getters ==========

    pub fn mission(&self) -> &MissionId {
        &self.mission
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn conversation(&self) -> Option<&ConversationHandle> {
        self.conversation.as_ref()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn allowed_tools(&self) -> &[ToolName] {
        &self.allowed_tools
    }

    // ========== Conversation ==========

    pub fn has_conversation(&self) -> bool {
        self.conversation.is_some()
    }

    /// Attach the remote conversation. Fails if one is already attached.
    pub fn attach_conversation(&mut self, handle: ConversationHandle) -> Result<(), AgentError> {
        if let Some(existing) = &self.conversation {
            return Err(AgentError::ConversationAlreadyAttached {
                existing: existing.as_str().to_string(),
            });
        }
        self.conversation = Some(handle);
        Ok(())
    }

    /// Check whether this agent may call `tool`
    pub fn allows(&self, tool: ToolName) -> bool {
        self.allowed_tools.contains(&tool)
    }
}

/// Errors that can occur on an Agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    ConversationAlreadyAttached { existing: String },
}

impl core::fmt::Display for AgentError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AgentError::ConversationAlreadyAttached { existing } => {
                write!(f, "Agent already has conversation {}", existing)
            }
        }
    }
}

impl std::error::Error for AgentError {}

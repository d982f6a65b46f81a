//! Outbound Ports - What the engine needs from the outside world
//!
//! ```text
//! Use Case Layer            │  Adapter Layer
//! ──────────────────────────┼──────────────────────────────
//! trait ModelProvider       │  OpenAiResponsesProvider
//! trait ChannelGateway      │  ConsoleChannelGateway
//! trait TranscriptLog       │  JsonlTranscriptLog
//! trait PromptSource        │  FilePromptSource
//! ```

use async_trait::async_trait;
use hq_domain::{ConversationHandle, Mission, Stage};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GatewayError, PromptError, ProviderError, TranscriptError};

// ============================================================================
// Model provider
// ============================================================================

/// One item of completion input
#[derive(Debug, Clone, PartialEq)]
pub enum InputItem {
    System { content: String },
    User { content: String },
    FunctionCallOutput { call_id: String, output: String },
}

impl InputItem {
    pub fn system(content: impl Into<String>) -> Self {
        InputItem::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        InputItem::User {
            content: content.into(),
        }
    }
}

/// A function call requested by the model
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    /// Raw JSON object, as produced by the model
    pub arguments: String,
    pub call_id: String,
}

/// One item of completion output
#[derive(Debug, Clone, PartialEq)]
pub enum OutputItem {
    FunctionCall(FunctionCall),
    /// Reasoning, plain messages and anything else the engine does not act on
    Other,
}

/// Result of one completion request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub output_text: String,
    pub output_items: Vec<OutputItem>,
}

impl Completion {
    /// Completion that answered in plain text
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            output_text: text.into(),
            output_items: Vec::new(),
        }
    }

    pub fn function_calls(&self) -> impl Iterator<Item = &FunctionCall> {
        self.output_items.iter().filter_map(|item| match item {
            OutputItem::FunctionCall(call) => Some(call),
            OutputItem::Other => None,
        })
    }
}

/// Language model with server-side conversations
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Create a conversation seeded with `items`
    async fn create_conversation(
        &self,
        items: &[InputItem],
    ) -> Result<ConversationHandle, ProviderError>;

    /// Request a completion inside `conversation`.
    /// `tools == None` means the model may not call functions.
    async fn create_completion(
        &self,
        model: &str,
        conversation: &ConversationHandle,
        input: &[InputItem],
        tools: Option<&[Value]>,
    ) -> Result<Completion, ProviderError>;
}

// ============================================================================
// Chat platform
// ============================================================================

/// A text channel inside a category
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelRef {
    pub category: String,
    pub name: String,
}

impl ChannelRef {
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.category, self.name)
    }
}

#[async_trait]
pub trait ChannelGateway: Send + Sync {
    /// Post `text`. Adapters split it if the platform limits message size.
    async fn send_message(&self, channel: &ChannelRef, text: &str) -> Result<(), GatewayError>;

    /// Look up a channel, creating it when missing
    async fn ensure_channel(&self, category: &str, name: &str)
        -> Result<ChannelRef, GatewayError>;

    async fn find_channel(
        &self,
        category: &str,
        name: &str,
    ) -> Result<Option<ChannelRef>, GatewayError>;

    /// Deny default participants the right to post
    async fn set_read_only(&self, channel: &ChannelRef) -> Result<(), GatewayError>;
}

// ============================================================================
// Transcript & prompts
// ============================================================================

/// One line of the chat transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// RFC 3339, UTC
    pub ts: String,
    pub channel: String,
    pub sender: String,
    pub content: String,
}

/// Sender recorded for everything HQ posts itself
pub const HQ_SENDER: &str = "HQ";

impl TranscriptEntry {
    /// Entry stamped with the current UTC time
    pub fn now(
        channel: impl Into<String>,
        sender: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            ts: chrono::Utc::now().to_rfc3339(),
            channel: channel.into(),
            sender: sender.into(),
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait TranscriptLog: Send + Sync {
    async fn append(&self, entry: &TranscriptEntry) -> Result<(), TranscriptError>;

    /// The last `n` entries, oldest first
    async fn recent(&self, n: usize) -> Result<Vec<TranscriptEntry>, TranscriptError>;
}

#[async_trait]
pub trait PromptSource: Send + Sync {
    /// System prompt for the persona of `stage` in `mission`
    async fn system_prompt(&self, stage: Stage, mission: &Mission) -> Result<String, PromptError>;
}

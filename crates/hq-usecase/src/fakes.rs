//! In-crate fakes of every port, for engine and router tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hq_domain::{
    ConversationHandle, Mission, MissionId, MissionRepository, MissionSnapshot, RandomSource,
    RepositoryError, Stage, StagePlan, ToolName,
};
use serde_json::Value;

use crate::engine::{EngineConfig, EnginePorts, StageEngine};
use crate::error::{GatewayError, PromptError, ProviderError, TranscriptError};
use crate::ports::{
    ChannelGateway, ChannelRef, Completion, FunctionCall, InputItem, ModelProvider, OutputItem,
    PromptSource, TranscriptEntry, TranscriptLog,
};

/// Value the harness random source always returns
pub const HARNESS_UNIT: f64 = 0.25;

#[derive(Debug, Clone)]
pub struct FixedUnit(pub f64);

impl RandomSource for FixedUnit {
    fn next_unit(&mut self) -> f64 {
        self.0
    }
}

// ============================================================================
// Provider
// ============================================================================

/// How the scripted provider answers completions
#[derive(Debug, Clone)]
pub enum Script {
    AlwaysText(String),
    /// Every request asks for `tool`; `reply` is the text of every answer
    /// made without tools
    AlwaysCall {
        tool: ToolName,
        arguments: String,
        reply: String,
    },
    /// Requests with tools get these calls, requests without get "Copy that."
    Calls(Vec<(String, String)>),
    Fail,
    /// Completions never come back
    Hang,
}

#[derive(Debug, Clone)]
pub struct RecordedCompletion {
    pub model: String,
    pub conversation: ConversationHandle,
    pub input: Vec<InputItem>,
    pub tools: Option<Vec<Value>>,
}

pub struct ScriptedProvider {
    script: Mutex<Script>,
    seeds: Mutex<Vec<Vec<InputItem>>>,
    completions: Mutex<Vec<RecordedCompletion>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedProvider {
    fn new() -> Self {
        Self {
            script: Mutex::new(Script::AlwaysText("Copy that.".to_string())),
            seeds: Mutex::new(Vec::new()),
            completions: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn script(&self, script: Script) {
        *self.script.lock().unwrap() = script;
    }

    pub fn conversation_seeds(&self) -> Vec<Vec<InputItem>> {
        self.seeds.lock().unwrap().clone()
    }

    pub fn completions(&self) -> Vec<RecordedCompletion> {
        self.completions.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Output of the last function call fed back to the model
    pub fn last_function_output(&self) -> Option<String> {
        self.completions
            .lock()
            .unwrap()
            .iter()
            .flat_map(|c| c.input.iter())
            .filter_map(|item| match item {
                InputItem::FunctionCallOutput { output, .. } => Some(output.clone()),
                _ => None,
            })
            .last()
    }

    fn answer(&self, with_tools: bool) -> Result<Completion, ProviderError> {
        let calls = |calls: &[(String, String)]| {
            calls
                .iter()
                .enumerate()
                .map(|(i, (name, arguments))| {
                    OutputItem::FunctionCall(FunctionCall {
                        name: name.clone(),
                        arguments: arguments.clone(),
                        call_id: format!("call_{}", i),
                    })
                })
                .collect::<Vec<_>>()
        };

        match &*self.script.lock().unwrap() {
            Script::AlwaysText(text) => Ok(Completion::text(text.clone())),
            Script::AlwaysCall {
                tool,
                arguments,
                reply,
            } => Ok(Completion {
                output_text: if with_tools { String::new() } else { reply.clone() },
                output_items: calls(&[(tool.as_str().to_string(), arguments.clone())]),
            }),
            Script::Calls(list) if with_tools => Ok(Completion {
                output_text: String::new(),
                output_items: calls(list),
            }),
            Script::Calls(_) => Ok(Completion::text("Copy that.")),
            Script::Fail => Err(ProviderError::Transport("connection reset".to_string())),
            Script::Hang => Ok(Completion::text("")),
        }
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn create_conversation(
        &self,
        items: &[InputItem],
    ) -> Result<ConversationHandle, ProviderError> {
        let mut seeds = self.seeds.lock().unwrap();
        seeds.push(items.to_vec());
        Ok(ConversationHandle::new(format!("conv_{}", seeds.len())))
    }

    async fn create_completion(
        &self,
        model: &str,
        conversation: &ConversationHandle,
        input: &[InputItem],
        tools: Option<&[Value]>,
    ) -> Result<Completion, ProviderError> {
        let hang = matches!(*self.script.lock().unwrap(), Script::Hang);
        if hang {
            tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.completions.lock().unwrap().push(RecordedCompletion {
            model: model.to_string(),
            conversation: conversation.clone(),
            input: input.to_vec(),
            tools: tools.map(<[Value]>::to_vec),
        });
        self.answer(tools.is_some())
    }
}

// ============================================================================
// Channels
// ============================================================================

#[derive(Default)]
pub struct RecordingGateway {
    created: Mutex<Vec<ChannelRef>>,
    messages: Mutex<Vec<(ChannelRef, String)>>,
    read_only: Mutex<Vec<ChannelRef>>,
}

impl RecordingGateway {
    /// `category/name` of every created channel, in creation order
    pub fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().iter().map(ToString::to_string).collect()
    }

    pub fn read_only(&self) -> Vec<String> {
        self.read_only.lock().unwrap().iter().map(ToString::to_string).collect()
    }

    /// Messages posted to channels called `name`, in any category
    pub fn messages_to(&self, name: &str) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(channel, _)| channel.name == name)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl ChannelGateway for RecordingGateway {
    async fn send_message(&self, channel: &ChannelRef, text: &str) -> Result<(), GatewayError> {
        self.messages
            .lock()
            .unwrap()
            .push((channel.clone(), text.to_string()));
        Ok(())
    }

    async fn ensure_channel(
        &self,
        category: &str,
        name: &str,
    ) -> Result<ChannelRef, GatewayError> {
        let channel = ChannelRef::new(category, name);
        let mut created = self.created.lock().unwrap();
        if !created.contains(&channel) {
            created.push(channel.clone());
        }
        Ok(channel)
    }

    async fn find_channel(
        &self,
        category: &str,
        name: &str,
    ) -> Result<Option<ChannelRef>, GatewayError> {
        let channel = ChannelRef::new(category, name);
        Ok(self
            .created
            .lock()
            .unwrap()
            .contains(&channel)
            .then_some(channel))
    }

    async fn set_read_only(&self, channel: &ChannelRef) -> Result<(), GatewayError> {
        self.read_only.lock().unwrap().push(channel.clone());
        Ok(())
    }
}

// ============================================================================
// Transcript, prompts, repository
// ============================================================================

#[derive(Default)]
pub struct MemoryTranscript {
    entries: Mutex<Vec<TranscriptEntry>>,
}

impl MemoryTranscript {
    pub fn push(&self, entry: TranscriptEntry) {
        self.entries.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<TranscriptEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl TranscriptLog for MemoryTranscript {
    async fn append(&self, entry: &TranscriptEntry) -> Result<(), TranscriptError> {
        self.push(entry.clone());
        Ok(())
    }

    async fn recent(&self, n: usize) -> Result<Vec<TranscriptEntry>, TranscriptError> {
        let entries = self.entries.lock().unwrap();
        Ok(entries[entries.len().saturating_sub(n)..].to_vec())
    }
}

#[derive(Default)]
pub struct StaticPrompts {
    broken: Mutex<Option<Stage>>,
}

impl StaticPrompts {
    /// Make the template of `stage` unreadable
    pub fn break_stage(&self, stage: Stage) {
        *self.broken.lock().unwrap() = Some(stage);
    }
}

#[async_trait]
impl PromptSource for StaticPrompts {
    async fn system_prompt(&self, stage: Stage, mission: &Mission) -> Result<String, PromptError> {
        if *self.broken.lock().unwrap() == Some(stage) {
            return Err(PromptError::Read {
                path: format!("{}.txt", stage.as_str()),
                message: "permission denied".to_string(),
            });
        }
        Ok(format!("You are the {} persona of mission {}.", stage, mission.name()))
    }
}

/// Stores snapshots only, like a real store would
#[derive(Default)]
pub struct SnapshotRepository {
    snapshots: Mutex<HashMap<MissionId, MissionSnapshot>>,
    saves: AtomicUsize,
}

impl SnapshotRepository {
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn saved_stage(&self, id: &str) -> Option<Stage> {
        self.snapshots
            .lock()
            .unwrap()
            .get(&MissionId::from_name(id))
            .map(|s| s.stage)
    }

    pub fn saved_player_count(&self, id: &str) -> Option<usize> {
        self.snapshots
            .lock()
            .unwrap()
            .get(&MissionId::from_name(id))
            .map(|s| s.players.len())
    }
}

impl MissionRepository for SnapshotRepository {
    async fn save(&self, mission: &Mission) -> Result<(), RepositoryError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.snapshots
            .lock()
            .unwrap()
            .insert(mission.id().clone(), mission.snapshot());
        Ok(())
    }

    async fn find_by_id(&self, id: &MissionId) -> Result<Option<Mission>, RepositoryError> {
        let snapshot = self.snapshots.lock().unwrap().get(id).cloned();
        snapshot
            .map(Mission::restore)
            .transpose()
            .map_err(|e| RepositoryError::CorruptDocument {
                id: id.to_string(),
                message: e.to_string(),
            })
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub engine: Arc<StageEngine<SnapshotRepository>>,
    pub provider: Arc<ScriptedProvider>,
    pub channels: Arc<RecordingGateway>,
    pub prompts: Arc<StaticPrompts>,
    pub transcript: Arc<MemoryTranscript>,
    pub repository: Arc<SnapshotRepository>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_plan(StagePlan::standard())
    }

    pub fn with_plan(plan: StagePlan) -> Self {
        let provider = Arc::new(ScriptedProvider::new());
        let channels = Arc::new(RecordingGateway::default());
        let prompts = Arc::new(StaticPrompts::default());
        let transcript = Arc::new(MemoryTranscript::default());
        let repository = Arc::new(SnapshotRepository::default());

        let ports = EnginePorts {
            provider: provider.clone(),
            channels: channels.clone(),
            prompts: prompts.clone(),
            transcript: transcript.clone(),
            random: Box::new(FixedUnit(HARNESS_UNIT)),
        };
        let config = EngineConfig {
            plan,
            ..EngineConfig::default()
        };

        Self {
            engine: Arc::new(StageEngine::new(repository.clone(), ports, config)),
            provider,
            channels,
            prompts,
            transcript,
            repository,
        }
    }
}

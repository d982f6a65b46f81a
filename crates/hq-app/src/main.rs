//! # HQ - Game master backend for a location-based LARP
//!
//! This is the main entry point that wires everything together.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  main.rs (this file) - Dependency Injection & Wiring            │
//! │    │                                                            │
//! │    ├── Resolves: AppConfig (defaults ◄ file ◄ env/flags)        │
//! │    ├── Creates: JsonFile / InMemory MissionRepository (adapter) │
//! │    ├── Creates: OpenAI provider, console gateway, prompts, log  │
//! │    ├── Creates: StageEngine + GameMaster (use case)             │
//! │    └── Runs: The interactive console                            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod interactive;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use hq_adapter::{
    ConsoleChannelGateway, FilePromptSource, InMemoryMissionRepository, JsonFileMissionRepository,
    JsonlTranscriptLog, OpenAiResponsesProvider, RandRandomSource,
};
use hq_domain::MissionRepository;
use hq_usecase::{EnginePorts, GameMaster, StageEngine};
use tracing::{info, warn};

use crate::config::{AppConfig, ConfigArgs};
use crate::interactive::InteractiveCli;

#[derive(Parser)]
#[command(name = "hq")]
#[command(about = "HQ - Mission stage engine for a location-based LARP")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config)?;

    info!("🛰️  HQ - Mission Stage Engine");
    info!(
        model = %config.engine.model,
        stages = ?config.engine.plan.stages().collect::<Vec<_>>(),
        data_dir = %config.data_dir.display(),
        "Configuration loaded"
    );
    if config.api_key.is_none() {
        warn!("OPENAI_API_KEY is not set, provider calls will be rejected");
    }

    if config.in_memory() {
        run(InMemoryMissionRepository::new(), config).await
    } else {
        run(JsonFileMissionRepository::new(&config.data_dir), config).await
    }
}

async fn run<R: MissionRepository + 'static>(repository: R, config: AppConfig) -> anyhow::Result<()> {
    // ========================================
    // Dependency Injection - Wire up the system
    // ========================================

    let transcript_dir = if config.in_memory() {
        std::env::temp_dir().join("hq")
    } else {
        config.data_dir.clone()
    };
    let transcript = Arc::new(JsonlTranscriptLog::in_dir(&transcript_dir));
    let gateway = Arc::new(ConsoleChannelGateway::default());
    let provider = OpenAiResponsesProvider::new(config.api_base.clone(), config.api_key.clone())
        .context("building model provider")?;

    let ports = EnginePorts {
        provider: Arc::new(provider),
        channels: gateway.clone(),
        prompts: Arc::new(FilePromptSource::new(&config.prompts_dir)),
        transcript: transcript.clone(),
        random: Box::new(RandRandomSource::from_entropy()),
    };
    let engine = Arc::new(StageEngine::new(Arc::new(repository), ports, config.engine));
    let game_master = Arc::new(GameMaster::new(engine, transcript));

    info!(transcript = %transcript_dir.display(), "HQ ready");

    // ========================================
    // Run the console
    // ========================================

    InteractiveCli::new(game_master, gateway).run().await
}

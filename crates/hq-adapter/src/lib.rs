//! # HQ Adapter Layer
//!
//! Implementations of the ports declared in `hq-domain` and `hq-usecase`
//! (Hexagonal Architecture adapters).
//!
//! ## Structure
//!
//! - `repository/` - Mission persistence (JSON files, in-memory)
//! - `gateway/` - Outbound integrations (model provider, console channels)
//! - `transcript` - Append-only JSONL game log
//! - `prompt` - Stage prompt templates on disk
//! - `random` - `rand`-backed random source

pub mod gateway;
pub mod prompt;
pub mod random;
pub mod repository;
pub mod transcript;

pub use gateway::console::ConsoleChannelGateway;
pub use gateway::openai::OpenAiResponsesProvider;
pub use prompt::FilePromptSource;
pub use random::RandRandomSource;
pub use repository::in_memory::InMemoryMissionRepository;
pub use repository::json_file::JsonFileMissionRepository;
pub use transcript::JsonlTranscriptLog;

//! # HQ Use Case Layer
//!
//! Application-specific business rules.
//! This layer orchestrates the flow of data between the domain and adapters.
//!
//! ```text
//! inbound message
//!   └─► GameMaster (routing, per-mission lock, transcript)
//!         └─► StageEngine (stage FSM, agents, persistence)
//!               ├─► ModelProvider   (two-round completion)
//!               ├─► tools::ToolCommand (typed dispatch)
//!               └─► ChannelGateway  (stage channels)
//! ```
//!
//! Every outbound dependency is a trait in [`ports`]; adapters live in
//! `hq-adapter`.

pub mod engine;
pub mod error;
pub mod game_master;
pub mod ports;
pub mod tools;

#[cfg(test)]
pub(crate) mod fakes;

pub use engine::{EngineConfig, EnginePorts, StageEngine};
pub use error::{EngineError, GatewayError, PromptError, ProviderError, TranscriptError};
pub use game_master::{GameMaster, InboundMessage};
pub use hq_domain;

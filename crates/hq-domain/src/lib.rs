//! # HQ Domain Layer
//!
//! The heart of HQ - pure game-state logic with zero external dependencies.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Domain Layer (This Crate)                     │
//! │  ┌─────────────────────────────────────────────────────────────┐│
//! │  │  model/     - Entities & Value Objects                      ││
//! │  │  repository/- Trait definitions (not implementations)       ││
//! │  │  service/   - Domain services (stage gates)                 ││
//! │  └─────────────────────────────────────────────────────────────┘│
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The Golden Rule
//!
//! **This crate has ZERO external dependencies.**
//!
//! If the model provider changes its API, this crate doesn't change.
//! If missions move from JSON files to a database, this crate doesn't change.

pub mod model;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use model::{
    agent::{Agent, AgentError, ConversationHandle},
    location::{
        bearing_degrees, distance_meters, from_dms, random_point_at_distance, Dms, GeoError,
        Hemisphere, Location, RandomSource, EARTH_RADIUS_KM,
    },
    mission::{Mission, MissionError, MissionId, MissionSnapshot, DEFAULT_DROP_DISTANCE_KM},
    player::Player,
    stage::{PlanError, Stage, StagePlan, StageProfile, UnknownStageError},
    tool::{ToolName, UnknownToolError},
};

pub use repository::mission_repository::{MissionRepository, RepositoryError};

pub use service::stage_gate::{GateOutcome, GatePolicy};

//! Repository Traits - The "Ports" of Hexagonal Architecture
//!
//! These traits define HOW the domain wants to persist data,
//! but NOT how it's actually done. That's the adapter's job.
//!
//! ```text
//! Domain Layer          │  Adapter Layer
//! ──────────────────────┼────────────────────────
//! trait MissionRepo     │  JsonFileMissionRepository
//!   fn save()           │  InMemoryMissionRepository
//!   fn find_by_id()     │
//! ```

pub mod mission_repository;

//! Domain Services - Business logic that doesn't belong to a single entity
//!
//! Services operate on entities and contain the "verbs" of the domain.

pub mod stage_gate;

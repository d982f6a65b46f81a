//! Persistence Adapters - [`MissionRepository`](hq_domain::MissionRepository) implementations

pub mod document;
pub mod in_memory;
pub mod json_file;

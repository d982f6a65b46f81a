//! Mission Repository - Abstract persistence for Missions
//!
//! This trait defines what operations the domain needs.
//! How they're implemented (JSON files, memory) is not our concern here.

use crate::model::mission::{Mission, MissionId};

/// Errors that can occur during repository operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Failed to persist or read
    PersistenceError { message: String },
    /// Stored data could not be turned back into a Mission
    CorruptDocument { id: String, message: String },
}

impl core::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RepositoryError::PersistenceError { message } => {
                write!(f, "Persistence error: {}", message)
            }
            RepositoryError::CorruptDocument { id, message } => {
                write!(f, "Corrupt document for mission {}: {}", id, message)
            }
        }
    }
}

impl std::error::Error for RepositoryError {}

/// Mission Repository Trait
///
/// This is a PORT in hexagonal architecture.
/// The domain defines what it needs; adapters provide implementations.
///
/// Persistence is I/O-bound, so the methods return futures. No runtime
/// is named here - that stays an adapter concern.
pub trait MissionRepository: Send + Sync {
    /// Save a mission (create or update)
    fn save(
        &self,
        mission: &Mission,
    ) -> impl core::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Find a mission by ID. `Ok(None)` when nothing is stored.
    fn find_by_id(
        &self,
        id: &MissionId,
    ) -> impl core::future::Future<Output = Result<Option<Mission>, RepositoryError>> + Send;

    /// Check if a mission exists
    fn exists(
        &self,
        id: &MissionId,
    ) -> impl core::future::Future<Output = Result<bool, RepositoryError>> + Send {
        async move { Ok(self.find_by_id(id).await?.is_some()) }
    }
}

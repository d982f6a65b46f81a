//! In-Memory Mission Repository
//!
//! Keeps snapshots, never live missions, so a load behaves like a restart.
//! Useful for tests and `--data-dir :memory:` runs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use hq_domain::{Mission, MissionId, MissionRepository, MissionSnapshot, RepositoryError};

/// Thread-safe implementation using RwLock.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMissionRepository {
    missions: Arc<RwLock<HashMap<MissionId, MissionSnapshot>>>,
}

impl InMemoryMissionRepository {
    pub fn new() -> Self {
        Self {
            missions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn count(&self) -> Result<usize, RepositoryError> {
        let missions = self.missions.read().map_err(|_| RepositoryError::PersistenceError {
            message: "Failed to acquire read lock".to_string(),
        })?;
        Ok(missions.len())
    }
}

impl MissionRepository for InMemoryMissionRepository {
    async fn save(&self, mission: &Mission) -> Result<(), RepositoryError> {
        let mut missions = self.missions.write().map_err(|_| RepositoryError::PersistenceError {
            message: "Failed to acquire write lock".to_string(),
        })?;
        missions.insert(mission.id().clone(), mission.snapshot());
        Ok(())
    }

    async fn find_by_id(&self, id: &MissionId) -> Result<Option<Mission>, RepositoryError> {
        let snapshot = {
            let missions = self.missions.read().map_err(|_| RepositoryError::PersistenceError {
                message: "Failed to acquire read lock".to_string(),
            })?;
            missions.get(id).cloned()
        };

        snapshot
            .map(Mission::restore)
            .transpose()
            .map_err(|e| RepositoryError::CorruptDocument {
                id: id.to_string(),
                message: e.to_string(),
            })
    }
}

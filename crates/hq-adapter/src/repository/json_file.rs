//! JSON file Mission Repository
//!
//! ```text
//! {root}/
//! └── {mission}/
//!     ├── missions/{mission}.json    full aggregate
//!     └── players/{player}.json      mirror, rewritten on every save
//! ```

use std::io;
use std::path::{Path, PathBuf};

use hq_domain::{Mission, MissionId, MissionRepository, RepositoryError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::document::{MissionDocument, PlayerDocument};

/// Kind of entity stored under a mission directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Mission,
    Player,
}

impl DocumentKind {
    fn dir(&self) -> &'static str {
        match self {
            DocumentKind::Mission => "missions",
            DocumentKind::Player => "players",
        }
    }
}

/// Storage key of one document.
///
/// Both the mission directory and the file stem go through [`path_segment`],
/// so no name can leave `root` and distinct names never share a file.
pub fn document_path(root: &Path, kind: DocumentKind, mission: &MissionId, name: &str) -> PathBuf {
    root.join(path_segment(mission.as_str()))
        .join(kind.dir())
        .join(format!("{}.json", path_segment(name.trim())))
}

/// Escape everything but ASCII letters, digits, `-` and `_` as `%XX` per
/// UTF-8 byte. The mapping is one-to-one.
fn path_segment(raw: &str) -> String {
    let mut segment = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            segment.push(char::from(byte));
        } else {
            segment.push_str(&format!("%{:02X}", byte));
        }
    }
    segment
}

#[derive(Debug, thiserror::Error)]
enum StoreError {
    #[error("{path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("{path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        RepositoryError::PersistenceError {
            message: err.to_string(),
        }
    }
}

/// Read and decode a document. `Ok(None)` when the file does not exist.
async fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
}

/// Write a document, creating parent directories. Goes through a temp file
/// so readers never see a half-written document.
async fn write_document<T: Serialize>(path: &Path, document: &T) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let body = serde_json::to_string_pretty(document).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, body).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)
}

#[derive(Debug, Clone)]
pub struct JsonFileMissionRepository {
    root: PathBuf,
}

impl JsonFileMissionRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn mission_path(&self, id: &MissionId) -> PathBuf {
        document_path(&self.root, DocumentKind::Mission, id, id.as_str())
    }
}

impl MissionRepository for JsonFileMissionRepository {
    async fn save(&self, mission: &Mission) -> Result<(), RepositoryError> {
        let id = mission.id();
        let document = MissionDocument::from(&mission.snapshot());

        write_document(&self.mission_path(id), &document).await?;
        for player in &document.players {
            let path = document_path(&self.root, DocumentKind::Player, id, &player.name);
            write_document::<PlayerDocument>(&path, player).await?;
        }

        debug!(mission = %id, stage = %document.stage, players = document.players.len(), "Mission saved");
        Ok(())
    }

    async fn find_by_id(&self, id: &MissionId) -> Result<Option<Mission>, RepositoryError> {
        let corrupt = |message: String| RepositoryError::CorruptDocument {
            id: id.to_string(),
            message,
        };

        let document: MissionDocument = match read_document(&self.mission_path(id)).await {
            Ok(Some(document)) => document,
            Ok(None) => return Ok(None),
            Err(err @ StoreError::Json { .. }) => return Err(corrupt(err.to_string())),
            Err(err) => return Err(err.into()),
        };

        let snapshot = document
            .into_snapshot()
            .map_err(|e| corrupt(e.to_string()))?;
        Mission::restore(snapshot)
            .map(Some)
            .map_err(|e| corrupt(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hq_domain::{ConversationHandle, Location, Player, RandomSource, Stage};

    struct Half;

    impl RandomSource for Half {
        fn next_unit(&mut self) -> f64 {
            0.5
        }
    }

    fn falcon() -> Mission {
        let mut mission = Mission::new("OPERATION-FALCON", Stage::Briefing);
        mission.upsert_player(Player::new("Bravo-6").with_inventory(["knife"]));
        mission.set_hq_location(Location::new(52.0, 4.3).unwrap(), &mut Half);
        mission.set_mission_objectives(vec!["reach the beacon".to_string()]);
        mission.remember_conversation(Stage::Briefing, ConversationHandle::new("conv_42"));
        mission
    }

    // ============== Layout Tests ==============

    #[test]
    fn test_document_path_layout() {
        let id = MissionId::from_name("operation-falcon");
        let path = document_path(Path::new("data"), DocumentKind::Player, &id, "Bravo-6");
        assert_eq!(path, Path::new("data/operation-falcon/players/Bravo-6.json"));

        let path = document_path(Path::new("data"), DocumentKind::Mission, &id, id.as_str());
        assert_eq!(path, Path::new("data/operation-falcon/missions/operation-falcon.json"));
    }

    #[test]
    fn test_similar_player_names_get_distinct_files() {
        let id = MissionId::from_name("falcon");
        let root = Path::new("data");
        let spaced = document_path(root, DocumentKind::Player, &id, "Bravo 6");
        let underscored = document_path(root, DocumentKind::Player, &id, "Bravo_6");
        let slashed = document_path(root, DocumentKind::Player, &id, "Bravo/6");

        assert_eq!(spaced, Path::new("data/falcon/players/Bravo%206.json"));
        assert_eq!(underscored, Path::new("data/falcon/players/Bravo_6.json"));
        assert_eq!(slashed, Path::new("data/falcon/players/Bravo%2F6.json"));
    }

    #[tokio::test]
    async fn test_mission_name_cannot_escape_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("data");
        let repo = JsonFileMissionRepository::new(&root);
        let mission = Mission::new("../escaped", Stage::Intake);

        repo.save(&mission).await.unwrap();

        assert!(!dir.path().join("escaped").exists());
        let path = repo.mission_path(mission.id());
        assert!(path.starts_with(&root));
        assert_eq!(path.parent().unwrap().parent().unwrap().parent().unwrap(), root);
        assert!(repo.find_by_id(mission.id()).await.unwrap().is_some());
    }

    // ============== Repository Tests ==============

    #[tokio::test]
    async fn test_save_and_find_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileMissionRepository::new(dir.path());
        let mission = falcon();

        repo.save(&mission).await.unwrap();
        let loaded = repo.find_by_id(mission.id()).await.unwrap().unwrap();

        assert_eq!(loaded.snapshot(), mission.snapshot());
        assert_eq!(
            loaded.conversation_for(Stage::Briefing),
            Some(&ConversationHandle::new("conv_42"))
        );
    }

    #[tokio::test]
    async fn test_save_writes_player_mirror() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileMissionRepository::new(dir.path());
        let mission = falcon();
        repo.save(&mission).await.unwrap();

        let path = document_path(dir.path(), DocumentKind::Player, mission.id(), "Bravo-6");
        let player: PlayerDocument = read_document(&path).await.unwrap().unwrap();
        assert_eq!(player.inventory, ["knife"]);
    }

    #[tokio::test]
    async fn test_find_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileMissionRepository::new(dir.path());

        let id = MissionId::from_name("ghost");
        assert!(repo.find_by_id(&id).await.unwrap().is_none());
        assert!(!repo.exists(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_broken_json_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileMissionRepository::new(dir.path());
        let id = MissionId::from_name("falcon");
        let path = repo.mission_path(&id);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        let result = repo.find_by_id(&id).await;
        assert!(matches!(result, Err(RepositoryError::CorruptDocument { .. })));
    }
}

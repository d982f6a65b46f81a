//! On-disk document shapes
//!
//! The domain stays serde-free; these DTOs map the persisted JSON to and
//! from [`MissionSnapshot`].

use std::collections::BTreeMap;

use hq_domain::{
    ConversationHandle, GeoError, Location, MissionSnapshot, Player, Stage, UnknownStageError,
    DEFAULT_DROP_DISTANCE_KM,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error(transparent)]
    Stage(#[from] UnknownStageError),

    #[error(transparent)]
    Location(#[from] GeoError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationDocument {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<&Location> for LocationDocument {
    fn from(location: &Location) -> Self {
        Self {
            latitude: location.latitude(),
            longitude: location.longitude(),
        }
    }
}

impl LocationDocument {
    fn into_location(self) -> Result<Location, GeoError> {
        Location::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerDocument {
    pub name: String,
    #[serde(default)]
    pub inventory: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<&Player> for PlayerDocument {
    fn from(player: &Player) -> Self {
        Self {
            name: player.name().to_string(),
            inventory: player.inventory().to_vec(),
            notes: player.notes().map(str::to_string),
        }
    }
}

impl PlayerDocument {
    fn into_player(self) -> Player {
        let player = Player::new(self.name).with_inventory(self.inventory);
        match self.notes {
            Some(notes) => player.with_notes(notes),
            None => player,
        }
    }
}

fn default_distance() -> f64 {
    DEFAULT_DROP_DISTANCE_KM
}

/// `{data}/{mission}/missions/{mission}.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionDocument {
    pub name: String,
    pub stage: String,
    #[serde(default)]
    pub players: Vec<PlayerDocument>,
    #[serde(default)]
    pub hq_location: Option<LocationDocument>,
    #[serde(default)]
    pub drop_point: Option<LocationDocument>,
    #[serde(default = "default_distance")]
    pub distance_km: f64,
    #[serde(default)]
    pub mission_context: Option<String>,
    #[serde(default)]
    pub mission_objectives: Option<Vec<String>>,
    /// Stage name to provider conversation id
    #[serde(default)]
    pub conversations: BTreeMap<String, String>,
}

impl From<&MissionSnapshot> for MissionDocument {
    fn from(snapshot: &MissionSnapshot) -> Self {
        Self {
            name: snapshot.name.clone(),
            stage: snapshot.stage.as_str().to_string(),
            players: snapshot.players.iter().map(PlayerDocument::from).collect(),
            hq_location: snapshot.hq_location.as_ref().map(LocationDocument::from),
            drop_point: snapshot.drop_point.as_ref().map(LocationDocument::from),
            distance_km: snapshot.distance_km,
            mission_context: snapshot.mission_context.clone(),
            mission_objectives: snapshot.mission_objectives.clone(),
            conversations: snapshot
                .conversations
                .iter()
                .map(|(stage, handle)| (stage.as_str().to_string(), handle.as_str().to_string()))
                .collect(),
        }
    }
}

impl MissionDocument {
    pub fn into_snapshot(self) -> Result<MissionSnapshot, DocumentError> {
        let conversations = self
            .conversations
            .into_iter()
            .map(|(stage, id)| Ok((Stage::parse(&stage)?, ConversationHandle::new(id))))
            .collect::<Result<Vec<_>, DocumentError>>()?;

        Ok(MissionSnapshot {
            name: self.name,
            stage: Stage::parse(&self.stage)?,
            players: self.players.into_iter().map(PlayerDocument::into_player).collect(),
            hq_location: self.hq_location.map(LocationDocument::into_location).transpose()?,
            drop_point: self.drop_point.map(LocationDocument::into_location).transpose()?,
            distance_km: self.distance_km,
            mission_context: self.mission_context,
            mission_objectives: self.mission_objectives,
            conversations,
        })
    }
}

//! Mission - The root aggregate of one game instance
//!
//! A Mission is an Entity (has identity that persists through changes).
//! Its id is the lowercase form of its name, which is also the name of the
//! channel category players talk in.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use super::agent::{Agent, ConversationHandle};
use super::location::{random_point_at_distance, Location, RandomSource};
use super::player::Player;
use super::stage::Stage;

/// Default drop-zone radius around HQ
pub const DEFAULT_DROP_DISTANCE_KM: f64 = 10.0;

/// Unique identifier for a Mission
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MissionId(String);

impl MissionId {
    /// Derive the id from a mission or category name
    pub fn from_name(name: &str) -> Self {
        Self(name.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for MissionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Plain data view of a Mission, used by persistence adapters
#[derive(Debug, Clone, PartialEq)]
pub struct MissionSnapshot {
    pub name: String,
    pub stage: Stage,
    pub players: Vec<Player>,
    pub hq_location: Option<Location>,
    pub drop_point: Option<Location>,
    pub distance_km: f64,
    pub mission_context: Option<String>,
    pub mission_objectives: Option<Vec<String>>,
    pub conversations: Vec<(Stage, ConversationHandle)>,
}

/// Mission - The central entity of HQ
#[derive(Debug, Clone)]
pub struct Mission {
    id: MissionId,
    name: String,
    stage: Stage,
    /// Stage personas, rebuilt lazily. Never persisted.
    bots: HashMap<Stage, Agent>,
    players: Vec<Player>,
    hq_location: Option<Location>,
    /// Always derived from `hq_location`
    drop_point: Option<Location>,
    distance_km: f64,
    mission_context: Option<String>,
    mission_objectives: Option<Vec<String>>,
    /// Last known conversation per stage, so a restart can resume it
    conversations: HashMap<Stage, ConversationHandle>,
}

impl Mission {
    /// Create a new Mission positioned at `first_stage`
    pub fn new(name: impl Into<String>, first_stage: Stage) -> Self {
        let name = name.into();
        Self {
            id: MissionId::from_name(&name),
            name,
            stage: first_stage,
            bots: HashMap::new(),
            players: Vec::new(),
            hq_location: None,
            drop_point: None,
            distance_km: DEFAULT_DROP_DISTANCE_KM,
            mission_context: None,
            mission_objectives: None,
            conversations: HashMap::new(),
        }
    }

    /// Builder: set the drop-zone radius
    pub fn with_distance_km(mut self, distance_km: f64) -> Self {
        self.distance_km = distance_km;
        self
    }

    /// Rebuild a Mission from persisted data
    pub fn restore(snapshot: MissionSnapshot) -> Result<Self, MissionError> {
        if snapshot.drop_point.is_some() && snapshot.hq_location.is_none() {
            return Err(MissionError::Corrupt {
                reason: "drop point without HQ location".to_string(),
            });
        }
        if !snapshot.distance_km.is_finite() || snapshot.distance_km < 0.0 {
            return Err(MissionError::Corrupt {
                reason: format!("invalid drop distance {}", snapshot.distance_km),
            });
        }

        let mut mission = Mission::new(snapshot.name, snapshot.stage);
        mission.distance_km = snapshot.distance_km;
        for player in snapshot.players {
            mission.upsert_player(player);
        }
        mission.hq_location = snapshot.hq_location;
        mission.drop_point = snapshot.drop_point;
        mission.mission_context = snapshot.mission_context;
        mission.mission_objectives = snapshot.mission_objectives;
        mission.conversations = snapshot.conversations.into_iter().collect();
        Ok(mission)
    }

    /// Plain data view for persistence
    pub fn snapshot(&self) -> MissionSnapshot {
        let mut conversations: Vec<_> = self
            .conversations
            .iter()
            .map(|(stage, handle)| (*stage, handle.clone()))
            .collect();
        conversations.sort_by_key(|(stage, _)| *stage);

        MissionSnapshot {
            name: self.name.clone(),
            stage: self.stage,
            players: self.players.clone(),
            hq_location: self.hq_location,
            drop_point: self.drop_point,
            distance_km: self.distance_km,
            mission_context: self.mission_context.clone(),
            mission_objectives: self.mission_objectives.clone(),
            conversations,
        }
    }

    // ========== Getters ==========

    pub fn id(&self) -> &MissionId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn hq_location(&self) -> Option<&Location> {
        self.hq_location.as_ref()
    }

    pub fn drop_point(&self) -> Option<&Location> {
        self.drop_point.as_ref()
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_km
    }

    pub fn mission_context(&self) -> Option<&str> {
        self.mission_context.as_deref()
    }

    pub fn mission_objectives(&self) -> Option<&[String]> {
        self.mission_objectives.as_deref()
    }

    pub fn find_player(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name() == name)
    }

    // ========== State Transitions ==========

    /// Move to `stage`. Re-entering the current stage is allowed,
    /// going backwards is not.
    pub fn enter_stage(&mut self, stage: Stage) -> Result<(), MissionError> {
        if stage < self.stage {
            return Err(MissionError::StageRegression {
                from: self.stage,
                to: stage,
            });
        }
        self.stage = stage;
        Ok(())
    }

    // ========== Mutations ==========

    /// Insert a player, or overwrite the one with the same name in place
    pub fn upsert_player(&mut self, player: Player) -> &Player {
        match self.players.iter().position(|p| p.name() == player.name()) {
            Some(index) => {
                self.players[index] = player;
                &self.players[index]
            }
            None => {
                self.players.push(player);
                let last = self.players.len() - 1;
                &self.players[last]
            }
        }
    }

    /// Fix HQ and derive a fresh drop point `distance_km` away
    pub fn set_hq_location(&mut self, hq: Location, rng: &mut dyn RandomSource) -> &Location {
        let drop = random_point_at_distance(&hq, self.distance_km, rng);
        self.hq_location = Some(hq);
        self.drop_point.insert(drop)
    }

    pub fn set_mission_context(&mut self, context: impl Into<String>) {
        self.mission_context = Some(context.into());
    }

    pub fn set_mission_objectives(&mut self, objectives: Vec<String>) {
        self.mission_objectives = Some(objectives);
    }

    // ========== Agents ==========

    pub fn bot(&self, stage: Stage) -> Option<&Agent> {
        self.bots.get(&stage)
    }

    pub fn bot_mut(&mut self, stage: Stage) -> Option<&mut Agent> {
        self.bots.get_mut(&stage)
    }

    /// Remove the cached agent of `stage`, handing ownership to the caller
    pub fn take_bot(&mut self, stage: Stage) -> Option<Agent> {
        self.bots.remove(&stage)
    }

    /// Cache an agent for its stage, replacing any previous one
    pub fn cache_bot(&mut self, agent: Agent) -> &mut Agent {
        match self.bots.entry(agent.stage()) {
            Entry::Occupied(mut slot) => {
                slot.insert(agent);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(agent),
        }
    }

    /// Remember the conversation of a stage agent for later restores
    pub fn remember_conversation(&mut self, stage: Stage, handle: ConversationHandle) {
        self.conversations.insert(stage, handle);
    }

    pub fn conversation_for(&self, stage: Stage) -> Option<&ConversationHandle> {
        self.conversations.get(&stage)
    }
}

/// Errors that can occur during Mission operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissionError {
    StageRegression { from: Stage, to: Stage },
    Corrupt { reason: String },
}

impl core::fmt::Display for MissionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MissionError::StageRegression { from, to } => {
                write!(f, "Cannot move mission back from {} to {}", from, to)
            }
            MissionError::Corrupt { reason } => {
                write!(f, "Corrupt mission data: {}", reason)
            }
        }
    }
}

impl std::error::Error for MissionError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::location::distance_meters;

    struct Fixed(f64);

    impl RandomSource for Fixed {
        fn next_unit(&mut self) -> f64 {
            self.0
        }
    }

    #[test]
    fn test_mission_id_is_lowercase_name() {
        let mission = Mission::new("OPERATION-FALCON", Stage::Intake);
        assert_eq!(mission.id().as_str(), "operation-falcon");
        assert_eq!(mission.name(), "OPERATION-FALCON");
        assert_eq!(mission.distance_km(), DEFAULT_DROP_DISTANCE_KM);
    }

    #[test]
    fn test_upsert_player_overwrites_in_place() {
        let mut mission = Mission::new("m", Stage::Intake);
        mission.upsert_player(Player::new("Alice").with_inventory(["rope"]));
        mission.upsert_player(Player::new("Bob"));
        mission.upsert_player(Player::new("Alice").with_inventory(["map", "torch"]));

        assert_eq!(mission.players().len(), 2);
        assert_eq!(mission.players()[0].name(), "Alice");
        assert_eq!(mission.players()[0].inventory(), ["map", "torch"]);
    }

    #[test]
    fn test_set_hq_derives_drop_point() {
        let mut mission = Mission::new("m", Stage::Intake).with_distance_km(2.5);
        let hq = Location::new(52.0, 4.3).unwrap();
        let drop = *mission.set_hq_location(hq, &mut Fixed(0.4));

        assert_eq!(mission.hq_location(), Some(&hq));
        assert!((distance_meters(&hq, &drop) - 2500.0).abs() < 1e-3);
    }

    #[test]
    fn test_stage_never_regresses() {
        let mut mission = Mission::new("m", Stage::Intake);
        mission.enter_stage(Stage::Briefing).unwrap();
        mission.enter_stage(Stage::Briefing).unwrap();

        let result = mission.enter_stage(Stage::Intake);
        assert_eq!(
            result,
            Err(MissionError::StageRegression {
                from: Stage::Briefing,
                to: Stage::Intake
            })
        );
        assert_eq!(mission.stage(), Stage::Briefing);
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let mut mission = Mission::new("Night-Owl", Stage::Intake);
        mission.upsert_player(Player::new("Bravo-6").with_inventory(["knife"]));
        mission.set_hq_location(Location::new(52.0, 4.3).unwrap(), &mut Fixed(0.1));
        mission.set_mission_objectives(vec!["find the beacon".to_string()]);
        mission.remember_conversation(Stage::Intake, ConversationHandle::new("conv_9"));

        let restored = Mission::restore(mission.snapshot()).unwrap();
        assert_eq!(restored.snapshot(), mission.snapshot());
        assert_eq!(
            restored.conversation_for(Stage::Intake),
            Some(&ConversationHandle::new("conv_9"))
        );
        assert!(restored.bot(Stage::Intake).is_none());
    }

    #[test]
    fn test_restore_rejects_orphan_drop_point() {
        let mut snapshot = Mission::new("m", Stage::Beacon).snapshot();
        snapshot.drop_point = Some(Location::new(1.0, 1.0).unwrap());
        assert!(matches!(
            Mission::restore(snapshot),
            Err(MissionError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_cache_bot_replaces_previous() {
        let mut mission = Mission::new("m", Stage::Intake);
        let first = Agent::new(mission.id().clone(), Stage::Intake, "v1", "gpt-4o", vec![]);
        let second = Agent::new(mission.id().clone(), Stage::Intake, "v2", "gpt-4o", vec![]);

        mission.cache_bot(first);
        mission.cache_bot(second);
        assert_eq!(mission.bot(Stage::Intake).unwrap().system_prompt(), "v2");
    }
}

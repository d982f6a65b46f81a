//! Tool execution - one arm per [`ToolCommand`]
//!
//! Every arm returns the text the model sees as the function-call output.
//! User mistakes become text; only collaborator failures are errors.

use hq_domain::{Location, Mission, MissionRepository, Player};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{StageEngine, DM_CHANNEL};
use crate::error::Result;
use crate::tools::{LocationArgs, ToolCommand};

fn player_json(player: &Player) -> Value {
    json!({
        "name": player.name(),
        "inventory": player.inventory(),
        "notes": player.notes(),
    })
}

impl<R: MissionRepository> StageEngine<R> {
    /// Execute a decoded tool call against `mission`, persisting after
    /// every state change
    pub async fn execute(&self, mission: &mut Mission, command: ToolCommand) -> Result<String> {
        debug!(mission = %mission.id(), ?command, "Executing tool");
        let mutates = command.mutates();

        let output = match command {
            ToolCommand::CreateOrUpdatePlayer {
                name,
                inventory,
                notes,
            } => {
                let mut player = Player::new(name.clone()).with_inventory(inventory);
                if let Some(notes) = notes {
                    player = player.with_notes(notes);
                }
                let output = player_json(mission.upsert_player(player)).to_string();
                info!(mission = %mission.id(), player = %name, "Player registered");
                output
            }

            ToolCommand::GetPlayer { name } => match mission.find_player(&name) {
                Some(player) => player_json(player).to_string(),
                None => format!("Player '{}' not found.", name),
            },

            ToolCommand::GetAllPlayers => {
                if mission.players().is_empty() {
                    "No players found.".to_string()
                } else {
                    Value::Array(mission.players().iter().map(player_json).collect()).to_string()
                }
            }

            // next_stage persists through open_stage
            ToolCommand::NextStage => return self.next_stage(mission).await,

            ToolCommand::SetHqLocation(args) => match args.resolve() {
                Ok(hq) => {
                    let distance_km = mission.distance_km();
                    self.with_random(|rng| {
                        mission.set_hq_location(hq, rng);
                    });
                    info!(mission = %mission.id(), lat = hq.latitude(), lon = hq.longitude(), "HQ location set");
                    format!(
                        "HQ location set to ({:.6}, {:.6}). A drop zone has been marked {} km away.",
                        hq.latitude(),
                        hq.longitude(),
                        distance_km
                    )
                }
                Err(err) => return Ok(err.to_string()),
            },

            ToolCommand::CalculateDistanceToDropZone(args) => {
                distance_to(args, mission.drop_point().copied(), "The drop zone is not set.")
            }

            ToolCommand::CalculateDistanceToHq(args) => {
                distance_to(args, mission.hq_location().copied(), "The HQ location is not set.")
            }

            ToolCommand::CalculateBearingToHq(args) => match mission.hq_location().copied() {
                None => "The HQ location is not set.".to_string(),
                Some(hq) => match args.resolve() {
                    Ok(here) => format!("The bearing is {:.0} degrees.", here.bearing_to(&hq)),
                    Err(err) => err.to_string(),
                },
            },

            ToolCommand::SaveMissionContext { context } => {
                mission.set_mission_context(context);
                "Mission context saved.".to_string()
            }

            ToolCommand::SaveMissionObjectives { objectives } => {
                let count = objectives.len();
                mission.set_mission_objectives(objectives);
                format!("Mission objectives saved ({}).", count)
            }

            ToolCommand::GetMissionContext => mission
                .mission_context()
                .map(str::to_string)
                .unwrap_or_else(|| "The mission context is not set.".to_string()),

            ToolCommand::GetMissionObjectives => match mission.mission_objectives() {
                Some(objectives) => json!(objectives).to_string(),
                None => "The mission objectives are not set.".to_string(),
            },

            ToolCommand::GetLogs { top_n } => {
                let entries = self
                    .within("read_transcript", self.transcript.recent(top_n))
                    .await?;
                if entries.is_empty() {
                    "No log entries found.".to_string()
                } else {
                    serde_json::to_string(&entries).unwrap_or_else(|e| e.to_string())
                }
            }

            ToolCommand::ChatWithDm { message } => {
                let channel = self
                    .within(
                        "ensure_channel",
                        self.channels.ensure_channel(mission.id().as_str(), DM_CHANNEL),
                    )
                    .await?;
                let text = format!("📨 {} bot: {}", mission.stage(), message);
                self.post(&channel, &text).await?;
                "The game master has been notified.".to_string()
            }
        };

        if mutates {
            self.persist(mission).await?;
        }
        Ok(output)
    }
}

/// Shared body of the two distance tools
fn distance_to(args: LocationArgs, target: Option<Location>, unset: &str) -> String {
    match target {
        None => unset.to_string(),
        Some(target) => match args.resolve() {
            Ok(here) => format!("The distance is {:.0} meters.", here.distance_to(&target)),
            Err(err) => err.to_string(),
        },
    }
}

//! ToolCommand - Typed form of a model function call
//!
//! The model sends arguments as a JSON string. Decoding turns them into a
//! [`ToolCommand`] or a [`ToolArgsError`]; the latter is reported back to the
//! model as the tool's result text, never as an engine failure.

use hq_domain::{Dms, GeoError, Hemisphere, Location, ToolName};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

/// Default page size of `get_logs`
pub const DEFAULT_LOG_ENTRIES: usize = 10;

/// Bad arguments from the model
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolArgsError {
    #[error("Invalid arguments for {tool}: {message}")]
    Malformed { tool: ToolName, message: String },

    #[error("invalid location data: {reason}")]
    InvalidLocation { reason: String },
}

impl From<GeoError> for ToolArgsError {
    fn from(err: GeoError) -> Self {
        ToolArgsError::InvalidLocation {
            reason: err.to_string(),
        }
    }
}

/// A degrees/minutes/seconds record as the model sends it
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DmsArgs {
    pub degrees: f64,
    pub minutes: f64,
    pub seconds: f64,
    pub direction: String,
}

impl DmsArgs {
    fn to_dms(&self) -> Result<Dms, GeoError> {
        Ok(Dms::new(
            self.degrees,
            self.minutes,
            self.seconds,
            Hemisphere::parse(&self.direction)?,
        ))
    }
}

/// Location arguments shared by the HQ and navigation tools
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LocationArgs {
    #[serde(default)]
    pub latitude_decimal: Option<f64>,
    #[serde(default)]
    pub longitude_decimal: Option<f64>,
    #[serde(default)]
    pub latitude_dms: Option<DmsArgs>,
    #[serde(default)]
    pub longitude_dms: Option<DmsArgs>,
}

impl LocationArgs {
    /// Decimal wins when both values are present and non-zero,
    /// otherwise both DMS records are required.
    pub fn resolve(&self) -> Result<Location, ToolArgsError> {
        if let (Some(lat), Some(lon)) = (self.latitude_decimal, self.longitude_decimal) {
            if lat != 0.0 && lon != 0.0 {
                return Ok(Location::new(lat, lon)?);
            }
        }
        if let (Some(lat), Some(lon)) = (&self.latitude_dms, &self.longitude_dms) {
            return Ok(Location::from_dms(&lat.to_dms()?, &lon.to_dms()?)?);
        }
        Err(ToolArgsError::InvalidLocation {
            reason: "give latitude and longitude as decimals or as DMS".to_string(),
        })
    }
}

/// Every executable tool call, with its decoded arguments
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCommand {
    CreateOrUpdatePlayer {
        name: String,
        inventory: Vec<String>,
        notes: Option<String>,
    },
    GetPlayer {
        name: String,
    },
    GetAllPlayers,
    NextStage,
    SetHqLocation(LocationArgs),
    CalculateDistanceToDropZone(LocationArgs),
    CalculateDistanceToHq(LocationArgs),
    CalculateBearingToHq(LocationArgs),
    SaveMissionContext {
        context: String,
    },
    SaveMissionObjectives {
        objectives: Vec<String>,
    },
    GetMissionContext,
    GetMissionObjectives,
    GetLogs {
        top_n: usize,
    },
    ChatWithDm {
        message: String,
    },
}

#[derive(Deserialize)]
struct PlayerArgs {
    name: String,
    #[serde(default)]
    inventory: Vec<String>,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Deserialize)]
struct NameArgs {
    name: String,
}

#[derive(Deserialize)]
struct ContextArgs {
    context: String,
}

#[derive(Deserialize)]
struct ObjectivesArgs {
    objectives: Vec<String>,
}

#[derive(Deserialize)]
struct LogArgs {
    #[serde(default)]
    top_n: Option<usize>,
}

#[derive(Deserialize)]
struct MessageArgs {
    message: String,
}

impl ToolCommand {
    /// Decode the raw JSON arguments of a call to `tool`
    pub fn decode(tool: ToolName, arguments: &str) -> Result<Self, ToolArgsError> {
        let command = match tool {
            ToolName::CreateOrUpdatePlayer => {
                let args: PlayerArgs = parse(tool, arguments)?;
                ToolCommand::CreateOrUpdatePlayer {
                    name: args.name,
                    inventory: args.inventory,
                    notes: args.notes,
                }
            }
            ToolName::GetPlayer => {
                let args: NameArgs = parse(tool, arguments)?;
                ToolCommand::GetPlayer { name: args.name }
            }
            ToolName::GetAllPlayers => ToolCommand::GetAllPlayers,
            ToolName::NextStage => ToolCommand::NextStage,
            ToolName::SetHqLocation => ToolCommand::SetHqLocation(parse(tool, arguments)?),
            ToolName::CalculateDistanceToDropZone => {
                ToolCommand::CalculateDistanceToDropZone(parse(tool, arguments)?)
            }
            ToolName::CalculateDistanceToHq => {
                ToolCommand::CalculateDistanceToHq(parse(tool, arguments)?)
            }
            ToolName::CalculateBearingToHq => {
                ToolCommand::CalculateBearingToHq(parse(tool, arguments)?)
            }
            ToolName::SaveMissionContext => {
                let args: ContextArgs = parse(tool, arguments)?;
                ToolCommand::SaveMissionContext {
                    context: args.context,
                }
            }
            ToolName::SaveMissionObjectives => {
                let args: ObjectivesArgs = parse(tool, arguments)?;
                ToolCommand::SaveMissionObjectives {
                    objectives: args.objectives,
                }
            }
            ToolName::GetMissionContext => ToolCommand::GetMissionContext,
            ToolName::GetMissionObjectives => ToolCommand::GetMissionObjectives,
            ToolName::GetLogs => {
                let args: LogArgs = parse(tool, arguments)?;
                ToolCommand::GetLogs {
                    top_n: args.top_n.unwrap_or(DEFAULT_LOG_ENTRIES),
                }
            }
            ToolName::ChatWithDm => {
                let args: MessageArgs = parse(tool, arguments)?;
                ToolCommand::ChatWithDm {
                    message: args.message,
                }
            }
        };
        Ok(command)
    }

    /// Does executing this command change mission state?
    pub fn mutates(&self) -> bool {
        matches!(
            self,
            ToolCommand::CreateOrUpdatePlayer { .. }
                | ToolCommand::NextStage
                | ToolCommand::SetHqLocation(_)
                | ToolCommand::SaveMissionContext { .. }
                | ToolCommand::SaveMissionObjectives { .. }
        )
    }
}

/// Empty argument strings count as `{}`
fn parse<T: DeserializeOwned>(tool: ToolName, arguments: &str) -> Result<T, ToolArgsError> {
    let raw = if arguments.trim().is_empty() {
        "{}"
    } else {
        arguments
    };
    serde_json::from_str(raw).map_err(|e| ToolArgsError::Malformed {
        tool,
        message: e.to_string(),
    })
}

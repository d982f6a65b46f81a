//! ToolName - The fixed vocabulary of game-state tools
//!
//! The model may only ever call one of these. Anything else is an
//! unresolved call and aborts the turn.

/// Every tool the mission engine knows how to execute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolName {
    CreateOrUpdatePlayer,
    GetPlayer,
    GetAllPlayers,
    NextStage,
    SetHqLocation,
    CalculateDistanceToDropZone,
    CalculateDistanceToHq,
    CalculateBearingToHq,
    SaveMissionContext,
    SaveMissionObjectives,
    GetMissionContext,
    GetMissionObjectives,
    GetLogs,
    ChatWithDm,
}

impl ToolName {
    pub const ALL: [ToolName; 14] = [
        ToolName::CreateOrUpdatePlayer,
        ToolName::GetPlayer,
        ToolName::GetAllPlayers,
        ToolName::NextStage,
        ToolName::SetHqLocation,
        ToolName::CalculateDistanceToDropZone,
        ToolName::CalculateDistanceToHq,
        ToolName::CalculateBearingToHq,
        ToolName::SaveMissionContext,
        ToolName::SaveMissionObjectives,
        ToolName::GetMissionContext,
        ToolName::GetMissionObjectives,
        ToolName::GetLogs,
        ToolName::ChatWithDm,
    ];

    /// Wire name used in function-call items
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::CreateOrUpdatePlayer => "create_or_update_player",
            ToolName::GetPlayer => "get_player",
            ToolName::GetAllPlayers => "get_all_players",
            ToolName::NextStage => "next_stage",
            ToolName::SetHqLocation => "set_hq_location",
            ToolName::CalculateDistanceToDropZone => "calculate_distance_to_drop_zone",
            ToolName::CalculateDistanceToHq => "calculate_distance_to_hq",
            ToolName::CalculateBearingToHq => "calculate_bearing_to_hq",
            ToolName::SaveMissionContext => "save_mission_context",
            ToolName::SaveMissionObjectives => "save_mission_objectives",
            ToolName::GetMissionContext => "get_mission_context",
            ToolName::GetMissionObjectives => "get_mission_objectives",
            ToolName::GetLogs => "get_logs",
            ToolName::ChatWithDm => "chat_with_dm",
        }
    }

    /// Resolve a wire name. Exact match only - we never guess.
    pub fn parse(name: &str) -> Result<Self, UnknownToolError> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == name)
            .ok_or_else(|| UnknownToolError {
                name: name.to_string(),
            })
    }
}

impl core::fmt::Display for ToolName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A function-call name that is not in the dispatch table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownToolError {
    pub name: String,
}

impl core::fmt::Display for UnknownToolError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Unknown tool: {}", self.name)
    }
}

impl std::error::Error for UnknownToolError {}

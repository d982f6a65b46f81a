//! Tool Registry - One JSON schema per tool name
//!
//! Schemas use the flat function-tool shape of the Responses API:
//! `{"type": "function", "name": ..., "description": ..., "parameters": ...}`.

use hq_domain::ToolName;
use serde_json::{json, Value};

/// Schema of the shared location arguments
fn location_parameters() -> Value {
    json!({
        "type": "object",
        "description": "A position. Give decimal degrees, or degrees/minutes/seconds for both axes.",
        "properties": {
            "latitude_decimal": {
                "type": "number",
                "description": "Latitude in decimal degrees, negative for south."
            },
            "longitude_decimal": {
                "type": "number",
                "description": "Longitude in decimal degrees, negative for west."
            },
            "latitude_dms": dms_schema(&["N", "S"]),
            "longitude_dms": dms_schema(&["E", "W"]),
        },
        "required": []
    })
}

fn dms_schema(directions: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": {
            "degrees": { "type": "number" },
            "minutes": { "type": "number" },
            "seconds": { "type": "number" },
            "direction": { "type": "string", "enum": directions }
        },
        "required": ["degrees", "minutes", "seconds", "direction"]
    })
}

fn no_parameters() -> Value {
    json!({ "type": "object", "properties": {}, "required": [] })
}

fn player_parameters() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": { "type": "string", "description": "Callsign of the player." },
            "inventory": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Items the player carries."
            },
            "notes": { "type": "string", "description": "Free-form notes about the player." }
        },
        "required": ["name"]
    })
}

fn describe(tool: ToolName) -> &'static str {
    match tool {
        ToolName::CreateOrUpdatePlayer => {
            "Register a new player, or overwrite the player with the same name."
        }
        ToolName::GetPlayer => "Fetch one player by name.",
        ToolName::GetAllPlayers => "List every registered player.",
        ToolName::NextStage => {
            "Advance the mission to its next stage once the current stage is complete."
        }
        ToolName::SetHqLocation => "Set the HQ location. A drop zone is derived from it.",
        ToolName::CalculateDistanceToDropZone => {
            "Distance in meters from the given position to the drop zone."
        }
        ToolName::CalculateDistanceToHq => "Distance in meters from the given position to HQ.",
        ToolName::CalculateBearingToHq => {
            "Compass bearing in degrees from the given position to HQ."
        }
        ToolName::SaveMissionContext => "Store the mission context (the situation report).",
        ToolName::SaveMissionObjectives => "Store the list of mission objectives.",
        ToolName::GetMissionContext => "Read the stored mission context.",
        ToolName::GetMissionObjectives => "Read the stored mission objectives.",
        ToolName::GetLogs => "Read the most recent chat log entries.",
        ToolName::ChatWithDm => "Send a message to the human game master.",
    }
}

fn parameters(tool: ToolName) -> Value {
    match tool {
        ToolName::CreateOrUpdatePlayer => player_parameters(),
        ToolName::GetPlayer => json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Callsign of the player." }
            },
            "required": ["name"]
        }),
        ToolName::GetAllPlayers
        | ToolName::NextStage
        | ToolName::GetMissionContext
        | ToolName::GetMissionObjectives => no_parameters(),
        ToolName::SetHqLocation
        | ToolName::CalculateDistanceToDropZone
        | ToolName::CalculateDistanceToHq
        | ToolName::CalculateBearingToHq => location_parameters(),
        ToolName::SaveMissionContext => json!({
            "type": "object",
            "properties": { "context": { "type": "string" } },
            "required": ["context"]
        }),
        ToolName::SaveMissionObjectives => json!({
            "type": "object",
            "properties": {
                "objectives": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["objectives"]
        }),
        ToolName::GetLogs => json!({
            "type": "object",
            "properties": {
                "top_n": {
                    "type": "integer",
                    "description": "Number of entries to return.",
                    "default": 10
                }
            },
            "required": []
        }),
        ToolName::ChatWithDm => json!({
            "type": "object",
            "properties": { "message": { "type": "string" } },
            "required": ["message"]
        }),
    }
}

/// The schema the model sees for `tool`
pub fn schema(tool: ToolName) -> Value {
    json!({
        "type": "function",
        "name": tool.as_str(),
        "description": describe(tool),
        "parameters": parameters(tool),
    })
}

/// Schemas for an agent's allow-list, in allow-list order
pub fn schemas_for(tools: &[ToolName]) -> Vec<Value> {
    tools.iter().copied().map(schema).collect()
}

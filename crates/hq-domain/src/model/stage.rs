//! Stage - A phase of a mission's lifecycle
//!
//! Stages are strictly ordered. A [`StagePlan`] is the configured, ordered
//! subset of stages a deployment runs, along with the tools and gate policy
//! each stage uses.

use super::tool::ToolName;
use crate::service::stage_gate::GatePolicy;

/// Mission stages in their fixed order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Intake,
    Briefing,
    Beacon,
    Exfil,
    Completed,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Intake,
        Stage::Briefing,
        Stage::Beacon,
        Stage::Exfil,
        Stage::Completed,
    ];

    /// Lowercase key, used for storage and channel names
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Intake => "intake",
            Stage::Briefing => "briefing",
            Stage::Beacon => "beacon",
            Stage::Exfil => "exfil",
            Stage::Completed => "completed",
        }
    }

    /// Parse a stage key (case-insensitive)
    pub fn parse(value: &str) -> Result<Self, UnknownStageError> {
        let lowered = value.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.as_str() == lowered)
            .ok_or_else(|| UnknownStageError {
                value: value.to_string(),
            })
    }

    /// Tools the stage persona may call
    pub fn default_tools(&self) -> Vec<ToolName> {
        match self {
            Stage::Intake => vec![
                ToolName::CreateOrUpdatePlayer,
                ToolName::GetAllPlayers,
                ToolName::NextStage,
                ToolName::SetHqLocation,
            ],
            Stage::Briefing => vec![
                ToolName::SaveMissionContext,
                ToolName::SaveMissionObjectives,
                ToolName::GetAllPlayers,
                ToolName::NextStage,
            ],
            Stage::Beacon => vec![ToolName::CalculateDistanceToDropZone, ToolName::NextStage],
            Stage::Exfil => vec![
                ToolName::CalculateDistanceToHq,
                ToolName::CalculateBearingToHq,
                ToolName::GetMissionContext,
                ToolName::GetMissionObjectives,
                ToolName::GetAllPlayers,
                ToolName::NextStage,
            ],
            Stage::Completed => Vec::new(),
        }
    }

    /// Gate evaluated before leaving the stage
    pub fn default_gate(&self) -> GatePolicy {
        match self {
            Stage::Intake => GatePolicy::PlayersAndHq,
            Stage::Briefing => GatePolicy::ContextAndObjectives,
            Stage::Beacon => GatePolicy::Always,
            Stage::Exfil => GatePolicy::Never {
                reason: "end of mission".to_string(),
            },
            Stage::Completed => GatePolicy::Never {
                reason: "unknown stage".to_string(),
            },
        }
    }

    /// Message posted in the stage channel when the stage opens
    pub fn entry_narrative(&self, mission: &str) -> String {
        match self {
            Stage::Intake => format!(
                "📡 Mission {} is now in INTAKE. Report in with your callsign and gear, \
                 and tell HQ where your base of operations is.",
                mission
            ),
            Stage::Briefing => format!(
                "🗂️ Mission {} has entered BRIEFING. Command is assembling the situation \
                 report and your objectives.",
                mission
            ),
            Stage::Beacon => format!(
                "📍 Mission {} is now in BEACON. A drop zone has been marked. \
                 Send your position and HQ will guide you in.",
                mission
            ),
            Stage::Exfil => format!(
                "🚁 Mission {} is in EXFIL. Get back to HQ. Ask for distance and bearing \
                 whenever you need them.",
                mission
            ),
            Stage::Completed => format!("🏁 Mission {} is COMPLETED. Good work, team.", mission),
        }
    }

    /// Message posted in the stage channel when the stage closes
    pub fn closing_narrative(&self, mission: &str) -> String {
        format!(
            "🔒 Stage {} of mission {} is closed. This channel is now read-only.",
            self, mission
        )
    }
}

impl core::fmt::Display for Stage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Stage::Intake => f.write_str("INTAKE"),
            Stage::Briefing => f.write_str("BRIEFING"),
            Stage::Beacon => f.write_str("BEACON"),
            Stage::Exfil => f.write_str("EXFIL"),
            Stage::Completed => f.write_str("COMPLETED"),
        }
    }
}

/// A string that does not name a stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStageError {
    pub value: String,
}

impl core::fmt::Display for UnknownStageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "unknown stage: {}", self.value)
    }
}

impl std::error::Error for UnknownStageError {}

/// Per-stage configuration
#[derive(Debug, Clone, PartialEq)]
pub struct StageProfile {
    pub stage: Stage,
    pub tools: Vec<ToolName>,
    pub gate: GatePolicy,
}

impl StageProfile {
    /// Profile with the stage's default tools and gate
    pub fn standard(stage: Stage) -> Self {
        Self {
            stage,
            tools: stage.default_tools(),
            gate: stage.default_gate(),
        }
    }

    /// Builder: override the gate policy
    pub fn with_gate(mut self, gate: GatePolicy) -> Self {
        self.gate = gate;
        self
    }
}

/// The ordered list of stages a deployment runs
#[derive(Debug, Clone, PartialEq)]
pub struct StagePlan {
    profiles: Vec<StageProfile>,
}

impl StagePlan {
    /// Create a plan. Stages must be non-empty and strictly increasing.
    pub fn new(profiles: Vec<StageProfile>) -> Result<Self, PlanError> {
        if profiles.is_empty() {
            return Err(PlanError::Empty);
        }
        for pair in profiles.windows(2) {
            if pair[0].stage >= pair[1].stage {
                return Err(PlanError::OutOfOrder {
                    before: pair[0].stage,
                    after: pair[1].stage,
                });
            }
        }
        Ok(Self { profiles })
    }

    /// All five stages with their default tools and gates
    pub fn standard() -> Self {
        Self {
            profiles: Stage::ALL.iter().copied().map(StageProfile::standard).collect(),
        }
    }

    /// Plan over a subset of stages, each with default tools and gates
    pub fn from_stages(stages: &[Stage]) -> Result<Self, PlanError> {
        Self::new(stages.iter().copied().map(StageProfile::standard).collect())
    }

    /// Builder: override one stage's gate. No-op if the stage is not planned.
    pub fn with_gate(mut self, stage: Stage, gate: GatePolicy) -> Self {
        if let Some(profile) = self.profiles.iter_mut().find(|p| p.stage == stage) {
            profile.gate = gate;
        }
        self
    }

    pub fn first(&self) -> Stage {
        self.profiles[0].stage
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.profile(stage).is_some()
    }

    pub fn profile(&self, stage: Stage) -> Option<&StageProfile> {
        self.profiles.iter().find(|p| p.stage == stage)
    }

    /// The stage that follows `stage`, if any
    pub fn successor(&self, stage: Stage) -> Option<Stage> {
        let index = self.profiles.iter().position(|p| p.stage == stage)?;
        self.profiles.get(index + 1).map(|p| p.stage)
    }

    pub fn stages(&self) -> impl Iterator<Item = Stage> + '_ {
        self.profiles.iter().map(|p| p.stage)
    }
}

impl Default for StagePlan {
    fn default() -> Self {
        Self::standard()
    }
}

/// Invalid stage plan configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    Empty,
    OutOfOrder { before: Stage, after: Stage },
}

impl core::fmt::Display for PlanError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PlanError::Empty => write!(f, "stage plan has no stages"),
            PlanError::OutOfOrder { before, after } => {
                write!(f, "stage {} cannot come before {}", before, after)
            }
        }
    }
}

impl std::error::Error for PlanError {}

#[cfg(test)]
mod tests {
    use super::*;

    // ============== Stage Tests ==============

    #[test]
    fn test_stage_order() {
        assert!(Stage::Intake < Stage::Briefing);
        assert!(Stage::Briefing < Stage::Beacon);
        assert!(Stage::Beacon < Stage::Exfil);
        assert!(Stage::Exfil < Stage::Completed);
    }

    #[test]
    fn test_stage_parse_and_display() {
        assert_eq!(Stage::parse("EXFIL"), Ok(Stage::Exfil));
        assert_eq!(Stage::parse(" intake "), Ok(Stage::Intake));
        assert!(Stage::parse("active").is_err());
        assert_eq!(Stage::Briefing.to_string(), "BRIEFING");
        assert_eq!(Stage::Briefing.as_str(), "briefing");
    }

    #[test]
    fn test_default_tool_table() {
        assert!(Stage::Intake.default_tools().contains(&ToolName::SetHqLocation));
        assert_eq!(
            Stage::Beacon.default_tools(),
            vec![ToolName::CalculateDistanceToDropZone, ToolName::NextStage]
        );
        assert!(Stage::Completed.default_tools().is_empty());
        for stage in [Stage::Intake, Stage::Briefing, Stage::Beacon, Stage::Exfil] {
            assert!(stage.default_tools().contains(&ToolName::NextStage));
        }
    }

    // ============== Plan Tests ==============

    #[test]
    fn test_standard_plan_successors() {
        let plan = StagePlan::standard();
        assert_eq!(plan.first(), Stage::Intake);
        assert_eq!(plan.successor(Stage::Intake), Some(Stage::Briefing));
        assert_eq!(plan.successor(Stage::Exfil), Some(Stage::Completed));
        assert_eq!(plan.successor(Stage::Completed), None);
    }

    #[test]
    fn test_narrow_plan() {
        let plan = StagePlan::from_stages(&[Stage::Intake, Stage::Exfil, Stage::Completed]).unwrap();
        assert_eq!(plan.successor(Stage::Intake), Some(Stage::Exfil));
        assert!(!plan.contains(Stage::Briefing));
        assert_eq!(plan.successor(Stage::Briefing), None);
    }

    #[test]
    fn test_plan_rejects_bad_order() {
        assert_eq!(StagePlan::from_stages(&[]), Err(PlanError::Empty));
        assert!(StagePlan::from_stages(&[Stage::Briefing, Stage::Intake]).is_err());
        assert!(StagePlan::from_stages(&[Stage::Intake, Stage::Intake]).is_err());
    }

    #[test]
    fn test_plan_gate_override() {
        let plan = StagePlan::standard().with_gate(Stage::Exfil, GatePolicy::Always);
        assert_eq!(plan.profile(Stage::Exfil).unwrap().gate, GatePolicy::Always);
        assert_eq!(
            plan.profile(Stage::Intake).unwrap().gate,
            GatePolicy::PlayersAndHq
        );
    }
}

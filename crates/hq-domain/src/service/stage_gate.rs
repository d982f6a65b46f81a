//! Stage Gates - Completion predicates evaluated before a mission advances
//!
//! Each planned stage carries a [`GatePolicy`]. Policies are data, so a
//! deployment can relax or tighten a stage without touching the engine.

use crate::model::mission::Mission;

/// When may a stage be left?
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatePolicy {
    /// At least one registered player and an HQ location
    PlayersAndHq,
    /// Mission context and objectives both saved
    ContextAndObjectives,
    /// No prerequisites
    Always,
    /// Never completes; `reason` is reported to the players
    Never { reason: String },
}

/// Result of evaluating a gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOutcome {
    pub completed: bool,
    pub reason: String,
}

impl GateOutcome {
    fn open() -> Self {
        Self {
            completed: true,
            reason: "all prerequisites met".to_string(),
        }
    }

    fn closed(reason: impl Into<String>) -> Self {
        Self {
            completed: false,
            reason: reason.into(),
        }
    }
}

impl GatePolicy {
    /// Evaluate against the current mission state
    pub fn evaluate(&self, mission: &Mission) -> GateOutcome {
        match self {
            GatePolicy::PlayersAndHq => {
                let mut missing = Vec::new();
                if mission.players().is_empty() {
                    missing.push("no players have been registered yet");
                }
                if mission.hq_location().is_none() {
                    missing.push("the HQ location has not been set");
                }
                Self::outcome_from(missing)
            }
            GatePolicy::ContextAndObjectives => {
                let mut missing = Vec::new();
                if mission.mission_context().is_none() {
                    missing.push("the mission context has not been saved");
                }
                if mission.mission_objectives().is_none() {
                    missing.push("the mission objectives have not been saved");
                }
                Self::outcome_from(missing)
            }
            GatePolicy::Always => GateOutcome::open(),
            GatePolicy::Never { reason } => GateOutcome::closed(reason.clone()),
        }
    }

    fn outcome_from(missing: Vec<&str>) -> GateOutcome {
        if missing.is_empty() {
            GateOutcome::open()
        } else {
            GateOutcome::closed(format!("Cannot advance yet: {}.", missing.join("; ")))
        }
    }
}

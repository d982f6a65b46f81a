//! The tool-dispatch loop
//!
//! Exactly two provider requests at most per inbound message:
//!
//! 1. user message + the agent's tool schemas
//! 2. user message + every function-call output, no tools
//!
//! A direct text answer to request 1 ends the turn early.

use hq_domain::{Mission, MissionRepository, ToolName};
use tracing::{debug, warn};

use super::StageEngine;
use crate::error::Result;
use crate::ports::InputItem;
use crate::tools::{schemas_for, ToolCommand};

impl<R: MissionRepository> StageEngine<R> {
    /// Send `message` to the current stage's agent. `Ok(None)` means there
    /// is nothing to deliver.
    pub async fn chat(&self, mission: &mut Mission, message: &str) -> Result<Option<String>> {
        let conversation = self.ensure_conversation(mission).await?;
        let (model, allowed) = {
            let agent = self.load_stage_bot(mission).await?;
            (agent.model().to_string(), agent.allowed_tools().to_vec())
        };
        let stage = mission.stage();

        let schemas = schemas_for(&allowed);
        let mut input = vec![InputItem::user(message)];
        let first = self
            .within(
                "create_completion",
                self.provider
                    .create_completion(&model, &conversation, &input, Some(schemas.as_slice())),
            )
            .await?;

        if !first.output_text.is_empty() {
            return Ok(Some(first.output_text));
        }

        for call in first.function_calls() {
            let tool = match ToolName::parse(&call.name) {
                Ok(tool) if allowed.contains(&tool) => tool,
                _ => {
                    warn!(mission = %mission.id(), stage = %stage, tool = %call.name, "Unresolved tool call, dropping turn");
                    return Ok(None);
                }
            };

            let output = match ToolCommand::decode(tool, &call.arguments) {
                Ok(command) => self.execute(mission, command).await?,
                Err(err) => {
                    debug!(mission = %mission.id(), tool = %tool, error = %err, "Bad tool arguments");
                    err.to_string()
                }
            };

            input.push(InputItem::FunctionCallOutput {
                call_id: call.call_id.clone(),
                output,
            });
        }

        let second = self
            .within(
                "create_completion",
                self.provider.create_completion(&model, &conversation, &input, None),
            )
            .await?;

        if second.output_text.is_empty() {
            Ok(None)
        } else {
            Ok(Some(second.output_text))
        }
    }
}

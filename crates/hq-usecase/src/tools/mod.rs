//! Tool surface exposed to the stage personas
//!
//! - `registry` - JSON schemas handed to the model
//! - `command`  - typed decoding of the model's function-call arguments

pub mod command;
pub mod registry;

pub use command::{DmsArgs, LocationArgs, ToolArgsError, ToolCommand};
pub use registry::{schema, schemas_for};

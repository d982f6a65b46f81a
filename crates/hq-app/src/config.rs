//! Application configuration
//!
//! Resolution order, later wins:
//!
//! ```text
//! built-in defaults ◄── --config file.json ◄── env vars / CLI flags
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Args;
use hq_adapter::gateway::openai::DEFAULT_API_BASE;
use hq_domain::{
    GatePolicy, Stage, StagePlan, StageProfile, ToolName, DEFAULT_DROP_DISTANCE_KM,
};
use hq_usecase::engine::{DEFAULT_CALL_TIMEOUT, DEFAULT_MODEL};
use hq_usecase::EngineConfig;
use serde::Deserialize;

/// `--data-dir` value that keeps missions in memory only
pub const MEMORY_STORE: &str = ":memory:";

#[derive(Debug, Default, Args)]
pub struct ConfigArgs {
    /// JSON config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory holding mission documents and the game log
    #[arg(long, env = "HQ_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory holding `{stage}.txt` prompt templates
    #[arg(long, env = "HQ_PROMPTS_DIR")]
    pub prompts_dir: Option<PathBuf>,

    /// Model used by every stage bot
    #[arg(long, env = "OPENAI_MODEL")]
    pub model: Option<String>,

    /// Base URL of the Responses API
    #[arg(long, env = "OPENAI_BASE_URL")]
    pub api_base: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Timeout for every external call, in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Distance between HQ and the drop zone
    #[arg(long)]
    pub drop_distance_km: Option<f64>,

    /// Comma separated stages to run, in order
    #[arg(long, value_delimiter = ',')]
    pub stages: Option<Vec<String>>,

    /// Let EXFIL advance to COMPLETED
    #[arg(long)]
    pub exfil_completes: bool,
}

/// Gate names accepted in the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateSetting {
    PlayersAndHq,
    ContextAndObjectives,
    Always,
    Never,
}

impl GateSetting {
    fn policy(self, stage: Stage) -> GatePolicy {
        match self {
            GateSetting::PlayersAndHq => GatePolicy::PlayersAndHq,
            GateSetting::ContextAndObjectives => GatePolicy::ContextAndObjectives,
            GateSetting::Always => GatePolicy::Always,
            GateSetting::Never => match stage.default_gate() {
                never @ GatePolicy::Never { .. } => never,
                _ => GatePolicy::Never {
                    reason: format!("the game master closes the {} stage", stage),
                },
            },
        }
    }
}

/// Shape of the `--config` file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub data_dir: Option<PathBuf>,
    pub prompts_dir: Option<PathBuf>,
    pub model: Option<String>,
    pub api_base: Option<String>,
    pub timeout_secs: Option<u64>,
    pub drop_distance_km: Option<f64>,
    pub stages: Option<Vec<String>>,
    pub exfil_completes: Option<bool>,
    /// Stage name to gate
    pub gates: BTreeMap<String, GateSetting>,
    /// Stage name to tools added on top of the stage defaults
    pub tools: BTreeMap<String, Vec<String>>,
}

impl FileConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }
}

/// Fully resolved settings
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub prompts_dir: PathBuf,
    pub api_base: String,
    pub api_key: Option<String>,
    pub engine: EngineConfig,
}

impl AppConfig {
    /// Read the config file named by `args`, if any, and resolve
    pub fn load(args: ConfigArgs) -> anyhow::Result<Self> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(args, file)
    }

    pub fn resolve(args: ConfigArgs, file: FileConfig) -> anyhow::Result<Self> {
        let drop_distance_km = args
            .drop_distance_km
            .or(file.drop_distance_km)
            .unwrap_or(DEFAULT_DROP_DISTANCE_KM);
        if !drop_distance_km.is_finite() || drop_distance_km <= 0.0 {
            bail!("drop distance must be a positive number of km, got {}", drop_distance_km);
        }

        let call_timeout = args
            .timeout_secs
            .or(file.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_CALL_TIMEOUT);
        let exfil_completes = args.exfil_completes || file.exfil_completes.unwrap_or(false);
        let stages = args.stages.or(file.stages);
        let plan = build_plan(stages.as_deref(), &file.gates, &file.tools, exfil_completes)?;

        Ok(Self {
            data_dir: args.data_dir.or(file.data_dir).unwrap_or_else(|| "data".into()),
            prompts_dir: args
                .prompts_dir
                .or(file.prompts_dir)
                .unwrap_or_else(|| "prompts".into()),
            api_base: args
                .api_base
                .or(file.api_base)
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            api_key: args.api_key,
            engine: EngineConfig {
                model: args
                    .model
                    .or(file.model)
                    .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                call_timeout,
                drop_distance_km,
                plan,
            },
        })
    }

    pub fn in_memory(&self) -> bool {
        self.data_dir == Path::new(MEMORY_STORE)
    }
}

fn parse_stage(name: &str) -> anyhow::Result<Stage> {
    Stage::parse(name).with_context(|| format!("in stage list: {}", name))
}

fn profile_for<'p>(
    profiles: &'p mut [StageProfile],
    name: &str,
) -> anyhow::Result<&'p mut StageProfile> {
    let stage = parse_stage(name)?;
    profiles
        .iter_mut()
        .find(|p| p.stage == stage)
        .with_context(|| format!("stage {} is configured but not planned", stage))
}

fn build_plan(
    stages: Option<&[String]>,
    gates: &BTreeMap<String, GateSetting>,
    tools: &BTreeMap<String, Vec<String>>,
    exfil_completes: bool,
) -> anyhow::Result<StagePlan> {
    let stages = match stages {
        Some(names) => names
            .iter()
            .map(|n| parse_stage(n))
            .collect::<anyhow::Result<Vec<_>>>()?,
        None => Stage::ALL.to_vec(),
    };
    let mut profiles: Vec<StageProfile> = stages.iter().copied().map(StageProfile::standard).collect();

    for (name, setting) in gates {
        let profile = profile_for(&mut profiles, name)?;
        profile.gate = setting.policy(profile.stage);
    }
    for (name, extra) in tools {
        let profile = profile_for(&mut profiles, name)?;
        for tool in extra {
            let tool = ToolName::parse(tool)
                .with_context(|| format!("in tools of stage {}", name))?;
            if !profile.tools.contains(&tool) {
                profile.tools.push(tool);
            }
        }
    }

    let plan = StagePlan::new(profiles)?;
    Ok(if exfil_completes {
        plan.with_gate(Stage::Exfil, GatePolicy::Always)
    } else {
        plan
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(json: &str) -> FileConfig {
        serde_json::from_str(json).unwrap()
    }

    // ============== Defaults Tests ==============

    #[test]
    fn test_defaults() {
        let config = AppConfig::resolve(ConfigArgs::default(), FileConfig::default()).unwrap();

        assert_eq!(config.data_dir, Path::new("data"));
        assert_eq!(config.prompts_dir, Path::new("prompts"));
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.engine.model, "gpt-4o");
        assert_eq!(config.engine.call_timeout, Duration::from_secs(60));
        assert_eq!(config.engine.drop_distance_km, 10.0);
        assert_eq!(config.engine.plan, StagePlan::standard());
        assert!(!config.in_memory());
    }

    // ============== Layering Tests ==============

    #[test]
    fn test_flags_override_file() {
        let args = ConfigArgs {
            model: Some("gpt-4.1".to_string()),
            timeout_secs: Some(5),
            ..Default::default()
        };
        let config = AppConfig::resolve(
            args,
            file(r#"{"model": "gpt-4o-mini", "drop_distance_km": 2.5, "timeout_secs": 30}"#),
        )
        .unwrap();

        assert_eq!(config.engine.model, "gpt-4.1");
        assert_eq!(config.engine.call_timeout, Duration::from_secs(5));
        assert_eq!(config.engine.drop_distance_km, 2.5);
    }

    #[test]
    fn test_unknown_file_field_is_rejected() {
        let result: Result<FileConfig, _> = serde_json::from_str(r#"{"modle": "x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_non_positive_distance_is_rejected() {
        let args = ConfigArgs {
            drop_distance_km: Some(0.0),
            ..Default::default()
        };
        assert!(AppConfig::resolve(args, FileConfig::default()).is_err());
    }

    // ============== Plan Tests ==============

    #[test]
    fn test_stage_subset_and_exfil_flag() {
        let args = ConfigArgs {
            stages: Some(vec!["intake".to_string(), "exfil".to_string(), "completed".to_string()]),
            exfil_completes: true,
            ..Default::default()
        };
        let plan = AppConfig::resolve(args, FileConfig::default()).unwrap().engine.plan;

        assert_eq!(
            plan.stages().collect::<Vec<_>>(),
            [Stage::Intake, Stage::Exfil, Stage::Completed]
        );
        assert_eq!(plan.profile(Stage::Exfil).unwrap().gate, GatePolicy::Always);
    }

    #[test]
    fn test_file_gates_and_extra_tools() {
        let config = AppConfig::resolve(
            ConfigArgs::default(),
            file(r#"{"gates": {"briefing": "always"}, "tools": {"beacon": ["get_logs", "chat_with_dm"]}}"#),
        )
        .unwrap();
        let plan = config.engine.plan;

        assert_eq!(plan.profile(Stage::Briefing).unwrap().gate, GatePolicy::Always);
        let beacon = &plan.profile(Stage::Beacon).unwrap().tools;
        assert!(beacon.contains(&ToolName::GetLogs));
        assert!(beacon.contains(&ToolName::ChatWithDm));
    }

    #[test]
    fn test_gate_for_unplanned_stage_fails() {
        let args = ConfigArgs {
            stages: Some(vec!["intake".to_string()]),
            ..Default::default()
        };
        let result = AppConfig::resolve(args, file(r#"{"gates": {"beacon": "always"}}"#));
        assert!(result.is_err());
    }

    #[test]
    fn test_out_of_order_stages_fail() {
        let args = ConfigArgs {
            stages: Some(vec!["beacon".to_string(), "intake".to_string()]),
            ..Default::default()
        };
        assert!(AppConfig::resolve(args, FileConfig::default()).is_err());
    }

    #[test]
    fn test_config_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hq.json");
        std::fs::write(&path, r#"{"data_dir": ":memory:"}"#).unwrap();

        let args = ConfigArgs {
            config: Some(path),
            ..Default::default()
        };
        assert!(AppConfig::load(args).unwrap().in_memory());
    }
}

//! Flags shared by `check` and `show`: source mode, seed, input overrides.

use clap::{Args, ValueEnum};
use smellproof_harness::{InputRecord, OracleConfig, SourceMode};

use crate::error::{DoctorError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ModeArg {
    /// Seeded sources; reproducible.
    #[default]
    Pinned,
    /// Real RNG and clock; for eyeballing only.
    Live,
}

#[derive(Debug, Clone, Default, Args)]
pub struct SourceArgs {
    #[arg(long, value_enum, default_value_t = ModeArg::Pinned)]
    pub mode: ModeArg,

    /// Base seed (falls back to SMELLPROOF_SEED, then 0).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Input record override such as `hours=1,minutes=30,seconds=45`.
    /// Repeat to sweep several records.
    #[arg(long = "input", value_name = "K=V,...")]
    pub inputs: Vec<String>,
}

impl SourceArgs {
    /// Oracle configuration from environment defaults plus these flags.
    #[must_use]
    pub fn oracle_config(&self) -> OracleConfig {
        let env = OracleConfig::from_env();
        let mode = match self.mode {
            ModeArg::Live => SourceMode::Live,
            ModeArg::Pinned => SourceMode::Pinned {
                seed: self.seed.unwrap_or(env.base_seed()),
            },
        };
        env.with_mode(mode).enforce_deterministic_env()
    }

    /// Parsed `--input` records; `None` when no override was given.
    pub fn domain_override(&self) -> Result<Option<Vec<InputRecord>>> {
        if self.inputs.is_empty() {
            return Ok(None);
        }
        self.inputs
            .iter()
            .map(|raw| {
                raw.parse::<InputRecord>()
                    .map_err(|err| DoctorError::invalid(format!("--input {raw:?}: {err}")))
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }
}

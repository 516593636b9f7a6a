#![forbid(unsafe_code)]

//! Oracle run configuration.

use serde::{Deserialize, Serialize};

use crate::determinism::{
    DEFAULT_TIME_STEP_MS, SourceMode, configured_samples, configured_seed,
    configured_time_step_ms, deterministic_mode,
};

/// Probes per input for fixtures that read random or clock sources.
pub const DEFAULT_SAMPLES_PER_INPUT: u32 = 64;

/// Seed used when neither a flag nor the environment provides one.
pub const DEFAULT_SEED: u64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleConfig {
    pub mode: SourceMode,
    pub samples_per_input: u32,
    /// Treat differing source consumption between sides as divergence.
    pub strict_lockstep: bool,
    pub time_step_ms: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            mode: SourceMode::Pinned { seed: DEFAULT_SEED },
            samples_per_input: DEFAULT_SAMPLES_PER_INPUT,
            strict_lockstep: false,
            time_step_ms: DEFAULT_TIME_STEP_MS,
        }
    }
}

impl OracleConfig {
    /// Defaults overridden by `SMELLPROOF_SEED`, `SMELLPROOF_SAMPLES` and
    /// `SMELLPROOF_TIME_STEP_MS`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            mode: SourceMode::Pinned {
                seed: configured_seed(DEFAULT_SEED),
            },
            samples_per_input: configured_samples(DEFAULT_SAMPLES_PER_INPUT),
            strict_lockstep: false,
            time_step_ms: configured_time_step_ms(),
        }
    }

    #[must_use]
    pub fn pinned(seed: u64) -> Self {
        Self::default().with_mode(SourceMode::Pinned { seed })
    }

    #[must_use]
    pub fn live() -> Self {
        Self::default().with_mode(SourceMode::Live)
    }

    #[must_use]
    pub fn with_mode(mut self, mode: SourceMode) -> Self {
        self.mode = mode;
        self
    }

    /// Zero is bumped to one; a sweep always probes each input.
    #[must_use]
    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples_per_input = samples.max(1);
        self
    }

    #[must_use]
    pub fn with_strict_lockstep(mut self, strict: bool) -> Self {
        self.strict_lockstep = strict;
        self
    }

    #[must_use]
    pub fn with_time_step_ms(mut self, step_ms: u64) -> Self {
        self.time_step_ms = step_ms;
        self
    }

    /// Downgrade `live` to `pinned` when `SMELLPROOF_DETERMINISTIC` is set.
    #[must_use]
    pub fn enforce_deterministic_env(self) -> Self {
        if deterministic_mode() && !self.mode.is_pinned() {
            tracing::info!("deterministic environment forces pinned sources");
            return self.with_mode(SourceMode::Pinned {
                seed: configured_seed(DEFAULT_SEED),
            });
        }
        self
    }

    /// Base seed for probe derivation; live runs still derive per-probe
    /// labels from it for reporting.
    #[must_use]
    pub fn base_seed(&self) -> u64 {
        self.mode.seed().unwrap_or(DEFAULT_SEED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_pinned_seed_zero() {
        let config = OracleConfig::default();
        assert_eq!(config.mode, SourceMode::Pinned { seed: 0 });
        assert_eq!(config.samples_per_input, 64);
        assert!(!config.strict_lockstep);
        assert_eq!(config.time_step_ms, 100);
    }

    #[test]
    fn builders_apply() {
        let config = OracleConfig::pinned(7)
            .with_samples(0)
            .with_strict_lockstep(true)
            .with_time_step_ms(5);
        assert_eq!(config.mode.seed(), Some(7));
        assert_eq!(config.samples_per_input, 1);
        assert!(config.strict_lockstep);
        assert_eq!(config.time_step_ms, 5);
        assert_eq!(config.base_seed(), 7);
    }

    #[test]
    fn live_base_seed_falls_back() {
        assert_eq!(OracleConfig::live().base_seed(), DEFAULT_SEED);
    }
}

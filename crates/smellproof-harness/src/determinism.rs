#![forbid(unsafe_code)]

//! Substitutable randomness and wall-clock sources.
//!
//! Fixture variants never reach for a global RNG or the system clock; they
//! receive a [`Sources`] capability instead. In `live` mode it delegates to
//! the OS-seeded RNG and the real clock; in `pinned` mode both streams are
//! derived from a seed so two variants handed identical instances observe
//! identical values.
//!
//! The random stream and the clock stream are independent: skipping a clock
//! read never shifts the random sequence, and vice versa.

use std::collections::VecDeque;
use std::fmt;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Base epoch (ms) for pinned clocks: 2023-11-14T22:13:20Z.
pub const PINNED_EPOCH_BASE_MS: u64 = 1_700_000_000_000;

/// Spread of the seed-derived offset added to [`PINNED_EPOCH_BASE_MS`].
const PINNED_EPOCH_SPREAD_MS: u64 = 1_000_000;

/// Default pinned clock step per read.
pub const DEFAULT_TIME_STEP_MS: u64 = 100;

/// Which flavour of sources a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SourceMode {
    /// Real RNG and wall clock. Demonstration runs only.
    Live,
    /// Seeded, reproducible sequences.
    Pinned { seed: u64 },
}

impl SourceMode {
    #[must_use]
    pub fn is_pinned(self) -> bool {
        matches!(self, Self::Pinned { .. })
    }

    #[must_use]
    pub fn seed(self) -> Option<u64> {
        match self {
            Self::Live => None,
            Self::Pinned { seed } => Some(seed),
        }
    }
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live => f.write_str("live"),
            Self::Pinned { seed } => write!(f, "pinned({seed})"),
        }
    }
}

/// How many values a variant pulled from its sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUsage {
    pub random_draws: u64,
    pub clock_reads: u64,
}

impl SourceUsage {
    #[must_use]
    pub fn as_pair(self) -> (u64, u64) {
        (self.random_draws, self.clock_reads)
    }
}

#[derive(Debug)]
enum Clock {
    Live,
    Pinned { next_ms: u64, step_ms: u64 },
}

/// Randomness and time capability handed to fixture variants.
#[derive(Debug)]
pub struct Sources {
    mode: SourceMode,
    rng: SmallRng,
    script: VecDeque<f64>,
    clock: Clock,
    usage: SourceUsage,
}

impl Sources {
    /// Live sources backed by the OS RNG and the system clock.
    #[must_use]
    pub fn live() -> Self {
        Self {
            mode: SourceMode::Live,
            rng: SmallRng::from_os_rng(),
            script: VecDeque::new(),
            clock: Clock::Live,
            usage: SourceUsage::default(),
        }
    }

    /// Pinned sources with the default clock step.
    #[must_use]
    pub fn pinned(seed: u64) -> Self {
        Self::pinned_with_step(seed, DEFAULT_TIME_STEP_MS)
    }

    /// Pinned sources whose clock advances `step_ms` per read.
    #[must_use]
    pub fn pinned_with_step(seed: u64, step_ms: u64) -> Self {
        Self {
            mode: SourceMode::Pinned { seed },
            rng: SmallRng::seed_from_u64(seed),
            script: VecDeque::new(),
            clock: Clock::Pinned {
                next_ms: pinned_epoch_ms(seed),
                step_ms,
            },
            usage: SourceUsage::default(),
        }
    }

    /// Live-mode sources built from entropy captured once per probe.
    ///
    /// `seed` should come from the OS and `epoch_ms` from the wall clock;
    /// both sides of a probe built from the same pair observe the same
    /// draws and the same clock readings.
    #[must_use]
    pub fn live_seeded(seed: u64, epoch_ms: u64, step_ms: u64) -> Self {
        Self {
            mode: SourceMode::Live,
            rng: SmallRng::seed_from_u64(seed),
            script: VecDeque::new(),
            clock: Clock::Pinned {
                next_ms: epoch_ms,
                step_ms,
            },
            usage: SourceUsage::default(),
        }
    }

    /// Fresh sources for `mode`.
    #[must_use]
    pub fn for_mode(mode: SourceMode, step_ms: u64) -> Self {
        match mode {
            SourceMode::Live => Self::live(),
            SourceMode::Pinned { seed } => Self::pinned_with_step(seed, step_ms),
        }
    }

    /// Replay `draws` before falling back to the seeded sequence.
    ///
    /// Values are clamped into `[0, 1)`.
    #[must_use]
    pub fn with_script(mut self, draws: impl IntoIterator<Item = f64>) -> Self {
        self.script
            .extend(draws.into_iter().map(|v| v.clamp(0.0, 1.0 - f64::EPSILON)));
        self
    }

    pub fn mode(&self) -> SourceMode {
        self.mode
    }

    pub fn usage(&self) -> SourceUsage {
        self.usage
    }

    /// Next value in `[0, 1)`.
    pub fn random(&mut self) -> f64 {
        self.usage.random_draws += 1;
        match self.script.pop_front() {
            Some(value) => value,
            None => self.rng.random::<f64>(),
        }
    }

    /// `floor(random() * 100)`, an integer in `0..100`.
    pub fn percent(&mut self) -> u32 {
        (self.random() * 100.0).floor() as u32
    }

    /// Milliseconds since the Unix epoch.
    pub fn now_ms(&mut self) -> u64 {
        self.usage.clock_reads += 1;
        match &mut self.clock {
            Clock::Live => u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0),
            Clock::Pinned { next_ms, step_ms } => {
                let now = *next_ms;
                *next_ms = next_ms.saturating_add(*step_ms);
                now
            }
        }
    }
}

/// Random value for which [`Sources::percent`] returns `percent`.
#[must_use]
pub const fn percent_draw(percent: u32) -> f64 {
    (percent as f64 + 0.5) / 100.0
}

/// Finite set of random scripts covering every outcome a variant can
/// observe. Each script is replayed through [`Sources::with_script`].
#[derive(Debug, Clone, PartialEq)]
pub struct DrawSpace {
    scripts: Vec<Vec<f64>>,
}

impl DrawSpace {
    /// Every outcome of a single `percent()` draw.
    #[must_use]
    pub fn percent() -> Self {
        let draws: Vec<f64> = (0..100).map(percent_draw).collect();
        Self::product(&[draws.as_slice()])
    }

    /// Cartesian product of per-draw choices; the first draw varies slowest.
    #[must_use]
    pub fn product(axes: &[&[f64]]) -> Self {
        let mut scripts = vec![Vec::with_capacity(axes.len())];
        for axis in axes {
            scripts = scripts
                .into_iter()
                .flat_map(|prefix| {
                    axis.iter().map(move |&draw| {
                        let mut script = prefix.clone();
                        script.push(draw);
                        script
                    })
                })
                .collect();
        }
        Self { scripts }
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    pub fn script(&self, index: usize) -> Option<&[f64]> {
        self.scripts.get(index).map(Vec::as_slice)
    }
}

fn pinned_epoch_ms(seed: u64) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"smellproof.clock");
    hasher.update(&seed.to_le_bytes());
    PINNED_EPOCH_BASE_MS + first_u64(hasher.finalize().as_bytes()) % PINNED_EPOCH_SPREAD_MS
}

/// Derive the seed for one probe of a sweep.
///
/// Mixes the run seed, rule id, input position and sample index through
/// BLAKE3 so every (fixture, input, sample) triple gets its own stream and
/// the mapping is identical on every platform.
#[must_use]
pub fn derive_probe_seed(base_seed: u64, rule_id: &str, input_index: usize, sample: u32) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&base_seed.to_le_bytes());
    hasher.update(rule_id.as_bytes());
    hasher.update(&[0]);
    hasher.update(&(input_index as u64).to_le_bytes());
    hasher.update(&sample.to_le_bytes());
    first_u64(hasher.finalize().as_bytes())
}

fn first_u64(bytes: &[u8; 32]) -> u64 {
    let mut head = [0_u8; 8];
    head.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(head)
}

/// True when pinned mode is forced via environment.
pub fn deterministic_mode() -> bool {
    env_flag("SMELLPROOF_DETERMINISTIC") || env_flag("SMELLPROOF_TEST_DETERMINISTIC")
}

/// Choose a seed from environment or use the provided default.
pub fn configured_seed(default_seed: u64) -> u64 {
    env_u64("SMELLPROOF_SEED")
        .or_else(|| env_u64("SMELLPROOF_TEST_SEED"))
        .unwrap_or(default_seed)
}

/// Samples per input for nondeterministic fixtures.
pub fn configured_samples(default_samples: u32) -> u32 {
    env_u64("SMELLPROOF_SAMPLES")
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v > 0)
        .unwrap_or(default_samples)
}

/// Clock step in milliseconds for pinned clocks.
pub fn configured_time_step_ms() -> u64 {
    env_u64("SMELLPROOF_TIME_STEP_MS").unwrap_or(DEFAULT_TIME_STEP_MS)
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_flag(key: &str) -> bool {
    matches!(
        std::env::var(key).as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinned_sequences_repeat_for_equal_seeds() {
        let mut a = Sources::pinned(42);
        let mut b = Sources::pinned(42);
        let left: Vec<f64> = (0..16).map(|_| a.random()).collect();
        let right: Vec<f64> = (0..16).map(|_| b.random()).collect();
        assert_eq!(left, right);
        assert!(left.iter().all(|v| (0.0..1.0).contains(v)));
    }

    #[test]
    fn different_seeds_give_different_sequences() {
        let mut a = Sources::pinned(1);
        let mut b = Sources::pinned(2);
        let left: Vec<f64> = (0..8).map(|_| a.random()).collect();
        let right: Vec<f64> = (0..8).map(|_| b.random()).collect();
        assert_ne!(left, right);
    }

    #[test]
    fn pinned_clock_advances_by_step() {
        let mut sources = Sources::pinned_with_step(7, 25);
        let first = sources.now_ms();
        let second = sources.now_ms();
        assert_eq!(second - first, 25);
        assert!(first >= PINNED_EPOCH_BASE_MS);
        assert!(first < PINNED_EPOCH_BASE_MS + PINNED_EPOCH_SPREAD_MS);
    }

    #[test]
    fn clock_reads_do_not_shift_random_stream() {
        let mut with_clock = Sources::pinned(9);
        let mut without_clock = Sources::pinned(9);
        let _ = with_clock.now_ms();
        assert_eq!(with_clock.random(), without_clock.random());
    }

    #[test]
    fn usage_counts_every_call() {
        let mut sources = Sources::pinned(3);
        let _ = sources.percent();
        let _ = sources.random();
        let _ = sources.now_ms();
        assert_eq!(
            sources.usage(),
            SourceUsage {
                random_draws: 2,
                clock_reads: 1
            }
        );
    }

    #[test]
    fn script_is_replayed_before_seeded_values() {
        let mut scripted = Sources::pinned(5).with_script([0.505, 0.0, 2.0]);
        assert_eq!(scripted.percent(), 50);
        assert_eq!(scripted.percent(), 0);
        assert_eq!(scripted.percent(), 99);

        let mut plain = Sources::pinned(5);
        assert_eq!(scripted.random(), plain.random());
    }

    #[test]
    fn percent_stays_in_range() {
        let mut sources = Sources::pinned(11);
        for _ in 0..1_000 {
            assert!(sources.percent() < 100);
        }
    }

    #[test]
    fn live_sources_report_live_mode() {
        let mut live = Sources::live();
        assert_eq!(live.mode(), SourceMode::Live);
        assert!(live.now_ms() > PINNED_EPOCH_BASE_MS);
        assert!((0.0..1.0).contains(&live.random()));
    }

    #[test]
    fn live_seeded_pairs_observe_identical_values() {
        let mut before = Sources::live_seeded(77, 1_800_000_000_000, 10);
        let mut after = Sources::live_seeded(77, 1_800_000_000_000, 10);
        assert_eq!(before.mode(), SourceMode::Live);
        for _ in 0..8 {
            assert_eq!(before.percent(), after.percent());
        }
        assert_eq!(before.now_ms(), 1_800_000_000_000);
        assert_eq!(after.now_ms(), 1_800_000_000_000);
        assert_eq!(before.now_ms(), 1_800_000_000_010);
    }

    #[test]
    fn percent_space_covers_every_outcome_once() {
        let space = DrawSpace::percent();
        assert_eq!(space.len(), 100);
        for percent in 0..100 {
            let script = space.script(percent as usize).unwrap();
            let mut sources = Sources::pinned(0).with_script(script.iter().copied());
            assert_eq!(sources.percent(), percent);
        }
        assert!(space.script(100).is_none());
    }

    #[test]
    fn product_space_enumerates_combinations_in_order() {
        let space = DrawSpace::product(&[&[0.1, 0.9], &[0.2, 0.8]]);
        assert_eq!(space.len(), 4);
        assert_eq!(space.script(0), Some(&[0.1, 0.2][..]));
        assert_eq!(space.script(1), Some(&[0.1, 0.8][..]));
        assert_eq!(space.script(3), Some(&[0.9, 0.8][..]));
        assert!(DrawSpace::product(&[&[]]).is_empty());
    }

    #[test]
    fn probe_seeds_are_distinct_per_coordinate() {
        let base = derive_probe_seed(0, "function-inside-loop", 0, 0);
        assert_eq!(base, derive_probe_seed(0, "function-inside-loop", 0, 0));
        assert_ne!(base, derive_probe_seed(1, "function-inside-loop", 0, 0));
        assert_ne!(base, derive_probe_seed(0, "no-array-delete", 0, 0));
        assert_ne!(base, derive_probe_seed(0, "function-inside-loop", 1, 0));
        assert_ne!(base, derive_probe_seed(0, "function-inside-loop", 0, 1));
    }

    #[test]
    fn mode_display_and_seed() {
        assert_eq!(SourceMode::Live.to_string(), "live");
        assert_eq!(SourceMode::Pinned { seed: 0 }.to_string(), "pinned(0)");
        assert_eq!(SourceMode::Pinned { seed: 4 }.seed(), Some(4));
        assert!(!SourceMode::Live.is_pinned());
    }

    #[test]
    fn env_helpers_fall_back_when_unset() {
        assert_eq!(env_u64("__SMELLPROOF_NEVER_SET_U64_51c2"), None);
        assert!(!env_flag("__SMELLPROOF_NEVER_SET_FLAG_51c2"));
        assert!(configured_samples(64) > 0);
    }
}

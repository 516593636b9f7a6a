#![forbid(unsafe_code)]

//! Equivalence oracle.
//!
//! For every `(input, sample)` probe of a fixture the oracle builds two
//! identical source instances from the probe seed, invokes Before then
//! After, normalizes both outputs and compares them. The sweep stops at the
//! first error or mismatch; a single counterexample is enough.
//!
//! Probe order is fixed: inputs in declared order, samples ascending.
//! Fixtures that declare a draw space get one sample per script in that
//! space instead of seeded sampling.

use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Once};

use rand::Rng;
use serde::{Serialize, Serializer};
use serde_json::{Value, json};

use crate::config::OracleConfig;
use crate::determinism::{SourceMode, SourceUsage, Sources, derive_probe_seed};
use crate::error::{InvocationError, InvocationResult, RegistryError, RegistryResult};
use crate::input::InputRecord;
use crate::ledger::{JsonlLedger, fields};
use crate::normalize::{CanonicalDiff, CanonicalValue, normalize};
use crate::registry::{Expectation, FixtureRegistry, RuleFixture, Selection, Side};

/// Per-fixture outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    Equivalent,
    Diverged,
    Errored,
}

impl VerdictStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equivalent => "equivalent",
            Self::Diverged => "diverged",
            Self::Errored => "errored",
        }
    }
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side failed and how.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorDetail {
    pub side: Side,
    pub error: InvocationError,
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.side, self.error)
    }
}

/// Result of checking one fixture. Never mutated after the oracle returns it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub rule_id: String,
    pub status: VerdictStatus,
    pub expected: Expectation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_diverging_input: Option<InputRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before_value: Option<CanonicalValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_value: Option<CanonicalValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<ErrorDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<CanonicalDiff>,
    /// Probes executed, including the deciding one.
    pub inputs_checked: usize,
    pub samples_per_input: u32,
    #[serde(serialize_with = "serialize_display")]
    pub mode: SourceMode,
    /// Seed of the last probe run; with a non-equivalent status this is the
    /// probe that decided the verdict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before_usage: Option<SourceUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_usage: Option<SourceUsage>,
}

fn serialize_display<T: fmt::Display, S: Serializer>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

impl Verdict {
    fn new(fixture: &RuleFixture, config: &OracleConfig, samples: u32) -> Self {
        Self {
            rule_id: fixture.rule_id().to_string(),
            status: VerdictStatus::Equivalent,
            expected: fixture.expectation(),
            first_diverging_input: None,
            before_value: None,
            after_value: None,
            error_detail: None,
            diff: None,
            inputs_checked: 0,
            samples_per_input: samples,
            mode: config.mode,
            probe_seed: None,
            before_usage: None,
            after_usage: None,
        }
    }

    #[must_use]
    pub fn is_equivalent(&self) -> bool {
        self.status == VerdictStatus::Equivalent
    }

    /// Whether the outcome matches what the fixture author declared.
    ///
    /// `BeforeErrors` is only met when Before failed and After rendered a
    /// value for the same probe.
    #[must_use]
    pub fn meets_expectation(&self) -> bool {
        match self.expected {
            Expectation::Equivalent => self.status == VerdictStatus::Equivalent,
            Expectation::Diverged => self.status == VerdictStatus::Diverged,
            Expectation::BeforeErrors => {
                self.status == VerdictStatus::Errored
                    && self
                        .error_detail
                        .as_ref()
                        .is_some_and(|detail| detail.side == Side::Before)
                    && self.after_value.is_some()
            }
        }
    }

    /// Short human description of the deciding detail.
    #[must_use]
    pub fn detail(&self) -> String {
        let at = self
            .first_diverging_input
            .as_ref()
            .map(|input| format!(" at {input}"))
            .unwrap_or_default();
        match self.status {
            VerdictStatus::Equivalent => {
                let fingerprint = self
                    .after_value
                    .as_ref()
                    .map(CanonicalValue::fingerprint)
                    .unwrap_or_default();
                format!("{} probes {fingerprint}", self.inputs_checked)
            }
            VerdictStatus::Diverged => match &self.diff {
                Some(diff) => format!("{}{at}", diff.summary()),
                None => format!("outputs differ{at}"),
            },
            VerdictStatus::Errored => match &self.error_detail {
                Some(detail) => format!("{detail}{at}"),
                None if self.inputs_checked == 0 => "no inputs to check".to_string(),
                None => format!("invocation failed{at}"),
            },
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<10} {:<30} {}",
            self.status.as_str(),
            self.rule_id,
            self.detail()
        )?;
        if self.expected != Expectation::Equivalent {
            let mark = if self.meets_expectation() { "as declared" } else { "UNEXPECTED" };
            write!(f, " [{}: {mark}]", self.expected.as_str())?;
        }
        Ok(())
    }
}

/// Everything both sides of one probe share.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbePlan {
    pub seed: u64,
    /// Wall-clock start captured for a live probe; `None` for pinned clocks.
    pub live_epoch_ms: Option<u64>,
    /// Draws replayed before the seeded stream.
    pub script: Vec<f64>,
}

impl ProbePlan {
    fn sources(&self, step_ms: u64) -> Sources {
        let sources = match self.live_epoch_ms {
            Some(epoch_ms) => Sources::live_seeded(self.seed, epoch_ms, step_ms),
            None => Sources::pinned_with_step(self.seed, step_ms),
        };
        sources.with_script(self.script.iter().copied())
    }
}

thread_local! {
    static PANICS_SILENCED: Cell<bool> = const { Cell::new(false) };
}

static QUIET_HOOK: Once = Once::new();

/// Wrap the process panic hook once so panics raised inside a variant on
/// this thread are not printed. Other panics reach the previous hook.
fn install_quiet_hook() {
    QUIET_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !PANICS_SILENCED.with(Cell::get) {
                previous(info);
            }
        }));
    });
}

fn invoke_quietly<T>(call: impl FnOnce() -> T) -> std::thread::Result<T> {
    install_quiet_hook();
    let was_silenced = PANICS_SILENCED.with(|flag| flag.replace(true));
    let result = catch_unwind(AssertUnwindSafe(call));
    PANICS_SILENCED.with(|flag| flag.set(was_silenced));
    result
}

/// What one side produced for one probe.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub value: InvocationResult<CanonicalValue>,
    pub usage: SourceUsage,
}

/// Drives fixtures through their input sweep.
#[derive(Debug, Clone, Default)]
pub struct Oracle {
    config: OracleConfig,
    ledger: Option<Arc<JsonlLedger>>,
}

impl Oracle {
    #[must_use]
    pub fn new(config: OracleConfig) -> Self {
        Self {
            config,
            ledger: None,
        }
    }

    /// Record run and verdict events to `ledger`.
    #[must_use]
    pub fn with_ledger(mut self, ledger: Arc<JsonlLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    fn samples_for(&self, fixture: &RuleFixture) -> u32 {
        if let Some(space) = fixture.draw_space() {
            u32::try_from(space.len()).unwrap_or(u32::MAX)
        } else if fixture.is_nondeterministic() {
            self.config.samples_per_input.max(1)
        } else {
            1
        }
    }

    /// Seed for one probe of `fixture`.
    #[must_use]
    pub fn probe_seed(&self, fixture: &RuleFixture, input_index: usize, sample: u32) -> u64 {
        derive_probe_seed(self.config.base_seed(), fixture.rule_id(), input_index, sample)
    }

    /// Shared inputs for one probe of `fixture`.
    ///
    /// Pinned probes use the derived seed. Live probes capture one OS seed
    /// and one wall-clock reading so both sides still observe the same
    /// values. The draw script comes from the fixture's draw space.
    #[must_use]
    pub fn plan(&self, fixture: &RuleFixture, input_index: usize, sample: u32) -> ProbePlan {
        let script = fixture
            .draw_space()
            .and_then(|space| space.script(sample as usize))
            .map(<[f64]>::to_vec)
            .unwrap_or_default();
        match self.config.mode {
            SourceMode::Live => ProbePlan {
                seed: rand::rng().random(),
                live_epoch_ms: Some(
                    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0),
                ),
                script,
            },
            SourceMode::Pinned { .. } => ProbePlan {
                seed: self.probe_seed(fixture, input_index, sample),
                live_epoch_ms: None,
                script,
            },
        }
    }

    /// Invoke one side under fresh sources built from `plan`.
    ///
    /// Panics inside the variant are caught quietly and reported as
    /// [`InvocationError::Panicked`]; non-finite numbers in the output fail
    /// validation.
    pub fn probe(
        &self,
        fixture: &RuleFixture,
        side: Side,
        input: &InputRecord,
        plan: &ProbePlan,
    ) -> ProbeOutcome {
        let mut sources = plan.sources(self.config.time_step_ms);
        let invoked = invoke_quietly(|| fixture.invoke(side, input, &mut sources))
            .unwrap_or_else(|payload| Err(InvocationError::from_panic(payload.as_ref())));
        let value = invoked.and_then(|tree| {
            tree.validate()?;
            Ok(normalize(&tree))
        });
        ProbeOutcome {
            value,
            usage: sources.usage(),
        }
    }

    /// Check a fixture over its declared domain.
    pub fn check_default(&self, fixture: &RuleFixture) -> Verdict {
        self.check(fixture, fixture.domain())
    }

    /// Check a fixture over `domain`.
    pub fn check(&self, fixture: &RuleFixture, domain: &[InputRecord]) -> Verdict {
        let span = tracing::info_span!(
            "oracle.check",
            rule_id = fixture.rule_id(),
            mode = %self.config.mode
        );
        let _guard = span.enter();

        let samples = self.samples_for(fixture);
        let mut verdict = Verdict::new(fixture, &self.config, samples);
        if domain.is_empty() {
            tracing::warn!(rule_id = fixture.rule_id(), "empty input domain");
            verdict.status = VerdictStatus::Errored;
            return verdict;
        }

        for (input_index, input) in domain.iter().enumerate() {
            for sample in 0..samples {
                let plan = self.plan(fixture, input_index, sample);
                let probe_seed = plan.seed;
                let before = self.probe(fixture, Side::Before, input, &plan);
                let after = self.probe(fixture, Side::After, input, &plan);
                verdict.inputs_checked += 1;
                verdict.probe_seed = Some(probe_seed);
                verdict.before_usage = Some(before.usage);
                verdict.after_usage = Some(after.usage);
                tracing::debug!(%input, sample, probe_seed, "probe");

                let decided = match (before.value, after.value) {
                    (Err(error), after_value) => {
                        verdict.after_value = after_value.ok();
                        Some((VerdictStatus::Errored, ErrorDetail {
                            side: Side::Before,
                            error,
                        }))
                    }
                    (Ok(before_value), Err(error)) => {
                        verdict.before_value = Some(before_value);
                        Some((VerdictStatus::Errored, ErrorDetail {
                            side: Side::After,
                            error,
                        }))
                    }
                    (Ok(before_value), Ok(after_value)) => {
                        let diff = before_value.diff(&after_value).or_else(|| {
                            (self.config.strict_lockstep && before.usage != after.usage)
                                .then(|| CanonicalDiff::SourceUsage {
                                    expected: before.usage.as_pair(),
                                    actual: after.usage.as_pair(),
                                })
                        });
                        verdict.before_value = Some(before_value);
                        verdict.after_value = Some(after_value);
                        if let Some(diff) = diff {
                            tracing::warn!(
                                rule_id = fixture.rule_id(),
                                %input,
                                probe_seed,
                                diff = %diff.summary(),
                                "variants diverged"
                            );
                            verdict.status = VerdictStatus::Diverged;
                            verdict.diff = Some(diff);
                            verdict.first_diverging_input = Some(input.clone());
                            return verdict;
                        }
                        None
                    }
                };

                if let Some((status, detail)) = decided {
                    tracing::warn!(
                        rule_id = fixture.rule_id(),
                        %input,
                        probe_seed,
                        error = %detail,
                        "variant errored"
                    );
                    verdict.status = status;
                    verdict.error_detail = Some(detail);
                    verdict.first_diverging_input = Some(input.clone());
                    return verdict;
                }
            }
        }

        tracing::debug!(probes = verdict.inputs_checked, "sweep equivalent");
        verdict
    }

    /// Check one side against an expected canonical value, using the seed of
    /// the first probe.
    pub fn check_golden(
        &self,
        fixture: &RuleFixture,
        side: Side,
        input: &InputRecord,
        expected: &CanonicalValue,
    ) -> Verdict {
        self.golden(fixture, side, input, |actual| expected.diff(actual))
    }

    /// Like [`Oracle::check_golden`] but compares visible text only.
    pub fn check_golden_text(
        &self,
        fixture: &RuleFixture,
        side: Side,
        input: &InputRecord,
        expected_text: &str,
    ) -> Verdict {
        let expected = CanonicalValue::text_only(expected_text);
        self.golden(fixture, side, input, |actual| {
            expected.diff(&CanonicalValue::text_only(&actual.text))
        })
    }

    fn golden(
        &self,
        fixture: &RuleFixture,
        side: Side,
        input: &InputRecord,
        compare: impl FnOnce(&CanonicalValue) -> Option<CanonicalDiff>,
    ) -> Verdict {
        let span = tracing::info_span!("oracle.golden", rule_id = fixture.rule_id(), %side);
        let _guard = span.enter();

        let plan = self.plan(fixture, 0, 0);
        let probe_seed = plan.seed;
        let outcome = self.probe(fixture, side, input, &plan);
        let mut verdict = Verdict::new(fixture, &self.config, 1);
        verdict.expected = Expectation::Equivalent;
        verdict.inputs_checked = 1;
        verdict.probe_seed = Some(probe_seed);
        match side {
            Side::Before => verdict.before_usage = Some(outcome.usage),
            Side::After => verdict.after_usage = Some(outcome.usage),
        }

        match outcome.value {
            Err(error) => {
                verdict.status = VerdictStatus::Errored;
                verdict.error_detail = Some(ErrorDetail { side, error });
                verdict.first_diverging_input = Some(input.clone());
            }
            Ok(actual) => {
                if let Some(diff) = compare(&actual) {
                    verdict.status = VerdictStatus::Diverged;
                    verdict.diff = Some(diff);
                    verdict.first_diverging_input = Some(input.clone());
                }
                match side {
                    Side::Before => verdict.before_value = Some(actual),
                    Side::After => verdict.after_value = Some(actual),
                }
            }
        }
        verdict
    }

    /// Evaluate the selected fixtures one after another in registration
    /// order. Unknown rule names fail before anything runs.
    pub fn run(
        &self,
        registry: &FixtureRegistry,
        selection: &Selection,
        domain_override: Option<&[InputRecord]>,
    ) -> RegistryResult<Vec<Verdict>> {
        reject_empty_override(domain_override)?;
        let fixtures = registry.select(selection)?;
        self.log_run_start(fixtures.len(), false);
        let verdicts: Vec<Verdict> = fixtures
            .into_iter()
            .map(|fixture| self.check(fixture, domain_override.unwrap_or(fixture.domain())))
            .collect();
        self.log_verdicts(&verdicts);
        Ok(verdicts)
    }

    /// Like [`Oracle::run`], with one scoped thread per fixture. Verdicts come
    /// back in registration order.
    pub fn run_parallel(
        &self,
        registry: &FixtureRegistry,
        selection: &Selection,
        domain_override: Option<&[InputRecord]>,
    ) -> RegistryResult<Vec<Verdict>> {
        reject_empty_override(domain_override)?;
        let fixtures = registry.select(selection)?;
        self.log_run_start(fixtures.len(), true);
        let verdicts: Vec<Verdict> = std::thread::scope(|scope| {
            let handles: Vec<_> = fixtures
                .iter()
                .map(|&fixture| {
                    let domain = domain_override.unwrap_or(fixture.domain());
                    (fixture, scope.spawn(move || self.check(fixture, domain)))
                })
                .collect();
            handles
                .into_iter()
                .map(|(fixture, handle)| {
                    handle.join().unwrap_or_else(|payload| {
                        let mut verdict = Verdict::new(fixture, &self.config, 0);
                        verdict.status = VerdictStatus::Errored;
                        verdict.error_detail = Some(ErrorDetail {
                            side: Side::Before,
                            error: InvocationError::from_panic(payload.as_ref()),
                        });
                        verdict
                    })
                })
                .collect()
        });
        self.log_verdicts(&verdicts);
        Ok(verdicts)
    }

    fn log_run_start(&self, fixtures: usize, parallel: bool) {
        tracing::info!(fixtures, parallel, mode = %self.config.mode, "oracle run start");
        self.ledger_event(
            "oracle.run.start",
            [
                ("fixtures", json!(fixtures)),
                ("samples_per_input", json!(self.config.samples_per_input)),
                ("strict_lockstep", json!(self.config.strict_lockstep)),
                ("parallel", json!(parallel)),
            ],
        );
    }

    fn log_verdicts(&self, verdicts: &[Verdict]) {
        for verdict in verdicts {
            let mut extra = fields([
                ("rule_id", json!(verdict.rule_id)),
                ("status", json!(verdict.status.as_str())),
                ("expected", json!(verdict.expected.as_str())),
                ("inputs_checked", json!(verdict.inputs_checked)),
            ]);
            if let Some(input) = &verdict.first_diverging_input {
                extra.insert("first_diverging_input".into(), json!(input));
            }
            if let Some(diff) = &verdict.diff {
                extra.insert("diff".into(), Value::from(diff.summary()));
            }
            if let Some(detail) = &verdict.error_detail {
                extra.insert("error".into(), Value::from(detail.to_string()));
            }
            self.ledger_log("oracle.verdict", extra);
        }
        let count = |status: VerdictStatus| verdicts.iter().filter(|v| v.status == status).count();
        let (equivalent, diverged, errored) = (
            count(VerdictStatus::Equivalent),
            count(VerdictStatus::Diverged),
            count(VerdictStatus::Errored),
        );
        tracing::info!(equivalent, diverged, errored, "oracle run end");
        self.ledger_event(
            "oracle.run.end",
            [
                ("total", json!(verdicts.len())),
                ("equivalent", json!(equivalent)),
                ("diverged", json!(diverged)),
                ("errored", json!(errored)),
            ],
        );
    }

    fn ledger_event<const N: usize>(&self, event: &str, pairs: [(&str, Value); N]) {
        self.ledger_log(event, fields(pairs));
    }

    fn ledger_log(&self, event: &str, extra: serde_json::Map<String, Value>) {
        if let Some(ledger) = &self.ledger
            && let Err(err) = ledger.log(event, extra)
        {
            tracing::warn!(event, error = %err, "ledger write failed");
        }
    }
}

fn reject_empty_override(domain_override: Option<&[InputRecord]>) -> RegistryResult<()> {
    match domain_override {
        Some([]) => Err(RegistryError::EmptyDomain),
        _ => Ok(()),
    }
}

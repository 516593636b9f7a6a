#![forbid(unsafe_code)]

//! Fixture catalog.
//!
//! A [`RuleFixture`] pairs the smelly and the fixed implementation of one
//! rule with the inputs it should be exercised on. The [`FixtureRegistry`]
//! keeps fixtures in registration order and rejects duplicate rule ids.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::determinism::{DrawSpace, Sources};
use crate::error::{InvocationResult, RegistryError, RegistryResult};
use crate::input::InputRecord;
use crate::render::RenderTree;

/// A fixture variant: input plus sources in, render tree out.
pub type VariantFn =
    Arc<dyn Fn(&InputRecord, &mut Sources) -> InvocationResult<RenderTree> + Send + Sync>;

/// Which implementation of a fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Before,
    After,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Before, Side::After];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome the fixture author declares for a full sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    /// The fix preserves observable output.
    #[default]
    Equivalent,
    /// The fix deliberately changes observable output.
    Diverged,
    /// The smelly variant fails at runtime; the fix does not.
    BeforeErrors,
}

impl Expectation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equivalent => "equivalent",
            Self::Diverged => "diverged",
            Self::BeforeErrors => "before_errors",
        }
    }
}

/// One before/after pair. Immutable once registered.
#[derive(Clone)]
pub struct RuleFixture {
    rule_id: String,
    summary: String,
    before: VariantFn,
    after: VariantFn,
    domain: Vec<InputRecord>,
    nondeterministic: bool,
    draw_space: Option<Arc<DrawSpace>>,
    expectation: Expectation,
}

impl fmt::Debug for RuleFixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleFixture")
            .field("rule_id", &self.rule_id)
            .field("domain", &self.domain.len())
            .field("nondeterministic", &self.nondeterministic)
            .field("draw_space", &self.draw_space.as_ref().map(|space| space.len()))
            .field("expectation", &self.expectation)
            .finish_non_exhaustive()
    }
}

impl RuleFixture {
    /// Create a fixture whose domain is the empty record.
    pub fn new<B, A>(rule_id: impl Into<String>, before: B, after: A) -> Self
    where
        B: Fn(&InputRecord, &mut Sources) -> InvocationResult<RenderTree> + Send + Sync + 'static,
        A: Fn(&InputRecord, &mut Sources) -> InvocationResult<RenderTree> + Send + Sync + 'static,
    {
        Self {
            rule_id: rule_id.into(),
            summary: String::new(),
            before: Arc::new(before),
            after: Arc::new(after),
            domain: vec![InputRecord::empty()],
            nondeterministic: false,
            draw_space: None,
            expectation: Expectation::Equivalent,
        }
    }

    #[must_use]
    pub fn describe(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Replace the declared input domain. An empty domain falls back to the
    /// empty record.
    #[must_use]
    pub fn with_domain(mut self, domain: impl IntoIterator<Item = InputRecord>) -> Self {
        self.domain = domain.into_iter().collect();
        if self.domain.is_empty() {
            self.domain.push(InputRecord::empty());
        }
        self
    }

    /// Mark the fixture as reading random or clock sources.
    #[must_use]
    pub fn nondeterministic(mut self) -> Self {
        self.nondeterministic = true;
        self
    }

    /// Declare every random outcome the variants can observe. The oracle
    /// replays each script instead of sampling seeds; clock reads still come
    /// from the probe's sources. An empty space is ignored.
    #[must_use]
    pub fn with_draw_space(mut self, space: DrawSpace) -> Self {
        self.nondeterministic = true;
        self.draw_space = (!space.is_empty()).then(|| Arc::new(space));
        self
    }

    #[must_use]
    pub fn expecting(mut self, expectation: Expectation) -> Self {
        self.expectation = expectation;
        self
    }

    pub fn rule_id(&self) -> &str {
        &self.rule_id
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn domain(&self) -> &[InputRecord] {
        &self.domain
    }

    pub fn is_nondeterministic(&self) -> bool {
        self.nondeterministic
    }

    pub fn draw_space(&self) -> Option<&DrawSpace> {
        self.draw_space.as_deref()
    }

    pub fn expectation(&self) -> Expectation {
        self.expectation
    }

    pub fn variant(&self, side: Side) -> &VariantFn {
        match side {
            Side::Before => &self.before,
            Side::After => &self.after,
        }
    }

    /// Invoke one side directly.
    pub fn invoke(
        &self,
        side: Side,
        input: &InputRecord,
        sources: &mut Sources,
    ) -> InvocationResult<RenderTree> {
        (self.variant(side))(input, sources)
    }
}

/// Which fixtures a run covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    All,
    Named(Vec<String>),
}

impl Selection {
    /// Parse a comma-separated rule list; empty means all.
    #[must_use]
    pub fn from_csv(csv: &str) -> Self {
        let names: Vec<String> = csv
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(ToOwned::to_owned)
            .collect();
        if names.is_empty() {
            Self::All
        } else {
            Self::Named(names)
        }
    }
}

/// Ordered, duplicate-free set of fixtures.
#[derive(Debug, Default, Clone)]
pub struct FixtureRegistry {
    fixtures: Vec<RuleFixture>,
    index: BTreeMap<String, usize>,
}

impl FixtureRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fixture. The first registration of a rule id wins.
    pub fn register(&mut self, fixture: RuleFixture) -> RegistryResult<()> {
        if self.index.contains_key(fixture.rule_id()) {
            return Err(RegistryError::DuplicateRuleId {
                rule_id: fixture.rule_id().to_string(),
            });
        }
        tracing::debug!(rule_id = fixture.rule_id(), "fixture registered");
        self.index
            .insert(fixture.rule_id().to_string(), self.fixtures.len());
        self.fixtures.push(fixture);
        Ok(())
    }

    /// All fixtures in registration order.
    pub fn all(&self) -> &[RuleFixture] {
        &self.fixtures
    }

    pub fn get(&self, rule_id: &str) -> RegistryResult<&RuleFixture> {
        self.index
            .get(rule_id)
            .map(|&idx| &self.fixtures[idx])
            .ok_or_else(|| RegistryError::UnknownRule {
                rule_id: rule_id.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    pub fn rule_ids(&self) -> impl Iterator<Item = &str> {
        self.fixtures.iter().map(RuleFixture::rule_id)
    }

    /// Resolve a selection, failing on the first unknown name.
    ///
    /// Named selections come back in registration order with duplicates
    /// removed, so reports stay reproducible regardless of how the names
    /// were spelled on the command line.
    pub fn select(&self, selection: &Selection) -> RegistryResult<Vec<&RuleFixture>> {
        match selection {
            Selection::All => Ok(self.fixtures.iter().collect()),
            Selection::Named(names) => {
                let mut positions = Vec::with_capacity(names.len());
                for name in names {
                    let idx = *self
                        .index
                        .get(name)
                        .ok_or_else(|| RegistryError::UnknownRule {
                            rule_id: name.clone(),
                        })?;
                    positions.push(idx);
                }
                positions.sort_unstable();
                positions.dedup();
                Ok(positions.into_iter().map(|idx| &self.fixtures[idx]).collect())
            }
        }
    }
}

#![forbid(unsafe_code)]

//! Built-in before/after fixtures, one per lint rule.
//!
//! Each Before variant carries its smell; each After variant carries the
//! fix. Random-driven variants read [`Sources::percent`] so the oracle can
//! pin them.
//!
//! [`Sources::percent`]: crate::determinism::Sources::percent

mod branching;
mod expressions;
mod scoping;

use crate::error::RegistryResult;
use crate::registry::{FixtureRegistry, RuleFixture};

/// Rule ids in registration order.
pub const RULE_IDS: [&str; 11] = [
    "no-redundant-parentheses",
    "cyclomatic-complexity",
    "function-inside-loop",
    "no-array-delete",
    "prefer-type-guard",
    "elseif-without-else",
    "no-identical-conditions",
    "cognitive-complexity",
    "cognitive-complexity-nesting",
    "no-duplicate-string",
    "prefer-immediate-return",
];

/// Every built-in fixture, in registration order.
#[must_use]
pub fn fixtures() -> Vec<RuleFixture> {
    vec![
        expressions::redundant_parentheses(),
        branching::cyclomatic_complexity(),
        scoping::function_inside_loop(),
        scoping::array_delete(),
        scoping::type_guard(),
        branching::elseif_without_else(),
        branching::identical_conditions(),
        branching::cognitive_complexity(),
        branching::cognitive_complexity_nesting(),
        expressions::duplicate_string(),
        expressions::immediate_return(),
    ]
}

/// Register the built-in corpus into `registry`.
pub fn register_builtin(registry: &mut FixtureRegistry) -> RegistryResult<()> {
    for fixture in fixtures() {
        registry.register(fixture)?;
    }
    Ok(())
}

/// A registry holding only the built-in corpus.
pub fn builtin_registry() -> RegistryResult<FixtureRegistry> {
    let mut registry = FixtureRegistry::new();
    register_builtin(&mut registry)?;
    Ok(registry)
}

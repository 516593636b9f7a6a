//! `list-rules`: the built-in fixture corpus.

use clap::Args;
use serde::Serialize;
use smellproof_harness::Expectation;
use smellproof_harness::corpus::builtin_registry;

use crate::check::FormatArg;
use crate::error::Result;
use crate::util::OutputIntegration;

#[derive(Debug, Clone, Default, Args)]
pub struct ListRulesArgs {
    #[arg(long, value_enum, default_value_t = FormatArg::Text)]
    pub format: FormatArg,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleInfo {
    pub rule_id: String,
    pub summary: String,
    pub domain_size: usize,
    pub nondeterministic: bool,
    pub expectation: Expectation,
}

/// Registered rules in registration order.
pub fn rule_infos() -> Result<Vec<RuleInfo>> {
    let registry = builtin_registry()?;
    Ok(registry
        .all()
        .iter()
        .map(|fixture| RuleInfo {
            rule_id: fixture.rule_id().to_string(),
            summary: fixture.summary().to_string(),
            domain_size: fixture.domain().len(),
            nondeterministic: fixture.is_nondeterministic(),
            expectation: fixture.expectation(),
        })
        .collect())
}

pub fn print_rules(args: &ListRulesArgs) -> Result<()> {
    let infos = rule_infos()?;
    if args.format == FormatArg::Json || OutputIntegration::detect().should_emit_json() {
        println!("{}", serde_json::to_string_pretty(&infos)?);
        return Ok(());
    }
    for info in infos {
        let random = if info.nondeterministic { "random" } else { "fixed" };
        println!(
            "{:<30} inputs={:<3} {random:<6} {:<13} {}",
            info.rule_id,
            info.domain_size,
            info.expectation.as_str(),
            info.summary
        );
    }
    Ok(())
}

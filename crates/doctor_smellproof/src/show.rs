//! `show`: render one rule's sides for inspection.

use clap::{Args, ValueEnum};
use serde::Serialize;
use smellproof_harness::corpus::builtin_registry;
use smellproof_harness::{
    CanonicalValue, InputRecord, InvocationError, Oracle, Side, SourceUsage,
};

use crate::check::FormatArg;
use crate::error::Result;
use crate::source_args::SourceArgs;
use crate::util::{OutputIntegration, output_for};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SideArg {
    Before,
    After,
    #[default]
    Both,
}

impl SideArg {
    fn sides(self) -> &'static [Side] {
        match self {
            Self::Before => &[Side::Before],
            Self::After => &[Side::After],
            Self::Both => &Side::BOTH,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ShowArgs {
    /// Rule id, e.g. `prefer-immediate-return`.
    pub rule: String,

    #[arg(long, value_enum, default_value_t = SideArg::Both)]
    pub side: SideArg,

    #[command(flatten)]
    pub source: SourceArgs,

    #[arg(long, value_enum, default_value_t = FormatArg::Text)]
    pub format: FormatArg,
}

/// One side rendered for one input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rendering {
    pub input: InputRecord,
    pub side: Side,
    pub probe_seed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<CanonicalValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<InvocationError>,
    pub usage: SourceUsage,
}

/// Probe the first sample of every input for the chosen sides.
pub fn render(args: &ShowArgs) -> Result<Vec<Rendering>> {
    let registry = builtin_registry()?;
    let fixture = registry.get(&args.rule)?;
    let oracle = Oracle::new(args.source.oracle_config());
    let override_domain = args.source.domain_override()?;
    let domain = override_domain.as_deref().unwrap_or(fixture.domain());

    let mut renderings = Vec::with_capacity(domain.len() * args.side.sides().len());
    for (index, input) in domain.iter().enumerate() {
        let plan = oracle.plan(fixture, index, 0);
        for &side in args.side.sides() {
            let outcome = oracle.probe(fixture, side, input, &plan);
            let (value, error) = match outcome.value {
                Ok(value) => (Some(value), None),
                Err(error) => (None, Some(error)),
            };
            renderings.push(Rendering {
                input: input.clone(),
                side,
                probe_seed: plan.seed,
                value,
                error,
                usage: outcome.usage,
            });
        }
    }
    Ok(renderings)
}

pub fn run_show(args: ShowArgs) -> Result<()> {
    let integration = OutputIntegration::detect();
    let json_out = args.format == FormatArg::Json || integration.should_emit_json();
    let ui = output_for(&integration, json_out);
    let renderings = render(&args)?;

    if json_out {
        let payload = serde_json::json!({
            "command": "show",
            "rule_id": args.rule,
            "renderings": renderings,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    ui.rule(Some(&args.rule));
    for rendering in &renderings {
        let (randoms, clocks) = rendering.usage.as_pair();
        println!(
            "{:<6} {} seed={} draws={randoms} clock={clocks}",
            rendering.side.as_str(),
            rendering.input,
            rendering.probe_seed
        );
        match (&rendering.value, &rendering.error) {
            (Some(value), _) => {
                println!("  text:    {:?}", value.text);
                println!("  outline: {}", value.outline);
                if !value.visible_attrs.is_empty() {
                    println!("  attrs:   {}", value.visible_attrs.join(" "));
                }
                println!("  {}", value.fingerprint());
            }
            (None, Some(error)) => ui.error(&format!("  {error}")),
            (None, None) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DoctorError;

    fn args(rule: &str, side: SideArg) -> ShowArgs {
        ShowArgs {
            rule: rule.to_string(),
            side,
            source: SourceArgs::default(),
            format: FormatArg::Json,
        }
    }

    #[test]
    fn both_sides_per_input() {
        let renderings = render(&args("prefer-type-guard", SideArg::Both)).unwrap();
        assert_eq!(renderings.len(), 8);
        assert_eq!(renderings[0].side, Side::Before);
        assert_eq!(renderings[1].side, Side::After);
        assert_eq!(renderings[0].probe_seed, renderings[1].probe_seed);
        assert_eq!(renderings[0].value, renderings[1].value);
    }

    #[test]
    fn before_error_is_reported_not_raised() {
        let renderings = render(&args("no-array-delete", SideArg::Before)).unwrap();
        assert_eq!(renderings.len(), 1);
        assert!(matches!(
            renderings[0].error,
            Some(InvocationError::NonFiniteNumber { .. })
        ));
    }

    #[test]
    fn input_override_replaces_domain() {
        let mut show = args("prefer-immediate-return", SideArg::After);
        show.source.inputs = vec!["hours=1,minutes=30,seconds=45".to_string()];
        let renderings = render(&show).unwrap();
        assert_eq!(renderings.len(), 1);
        assert_eq!(
            renderings[0].value.as_ref().map(|value| value.text.as_str()),
            Some("5445000 milliseconds")
        );
    }

    #[test]
    fn unknown_rule_is_rejected() {
        let err = render(&args("nope", SideArg::Both)).unwrap_err();
        assert!(matches!(err, DoctorError::Registry(_)));
    }
}

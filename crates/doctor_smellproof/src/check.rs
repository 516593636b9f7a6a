use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, ValueEnum};
use serde_json::json;
use smellproof_harness::corpus::builtin_registry;
use smellproof_harness::{JsonlLedger, Oracle, RunStatus, Selection, Summary, summarize};

use crate::error::{DoctorError, Result};
use crate::source_args::SourceArgs;
use crate::util::{OutputIntegration, create_file, output_for};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FormatArg {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, Args)]
pub struct CheckArgs {
    /// Comma-separated rule ids; all rules when omitted.
    #[arg(long)]
    pub rules: Option<String>,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Probes per input for nondeterministic rules without a declared draw
    /// space (falls back to SMELLPROOF_SAMPLES, then 64).
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub samples: Option<u32>,

    /// Report differing random/clock consumption between sides as divergence.
    #[arg(long)]
    pub strict_lockstep: bool,

    /// Evaluate fixtures on parallel threads.
    #[arg(long)]
    pub parallel: bool,

    #[arg(long, value_enum, default_value_t = FormatArg::Text)]
    pub format: FormatArg,

    /// Append run events as JSON lines to this file.
    #[arg(long)]
    pub jsonl: Option<PathBuf>,

    /// Judge success by each rule's declared expectation instead of strict
    /// equivalence.
    #[arg(long)]
    pub expect_declared: bool,
}

impl CheckArgs {
    fn selection(&self) -> Selection {
        self.rules
            .as_deref()
            .map_or(Selection::All, Selection::from_csv)
    }
}

/// Run the oracle for `args` and fold the verdicts.
pub fn evaluate(args: &CheckArgs) -> Result<Summary> {
    let mut config = args
        .source
        .oracle_config()
        .with_strict_lockstep(args.strict_lockstep);
    if let Some(samples) = args.samples {
        config = config.with_samples(samples);
    }
    let domain = args.source.domain_override()?;

    let mut oracle = Oracle::new(config);
    if let Some(path) = &args.jsonl {
        let file = create_file(path)?;
        let ledger = JsonlLedger::new("smellproof", config.mode, Box::new(file));
        tracing::info!(path = %path.display(), run_id = ledger.run_id(), "writing ledger");
        oracle = oracle.with_ledger(Arc::new(ledger));
    }

    let registry = builtin_registry()?;
    let selection = args.selection();
    let verdicts = if args.parallel {
        oracle.run_parallel(&registry, &selection, domain.as_deref())?
    } else {
        oracle.run(&registry, &selection, domain.as_deref())?
    };
    Ok(summarize(verdicts))
}

/// Exit status for `summary` under the chosen success criterion.
#[must_use]
pub fn run_status(summary: &Summary, expect_declared: bool) -> RunStatus {
    if expect_declared {
        summary.status_against_expectations()
    } else {
        summary.status
    }
}

pub fn run_check(args: CheckArgs) -> Result<()> {
    let integration = OutputIntegration::detect();
    let json_out = args.format == FormatArg::Json || integration.should_emit_json();
    let ui = output_for(&integration, json_out);

    let summary = evaluate(&args)?;
    let status = run_status(&summary, args.expect_declared);

    if json_out {
        let payload = json!({
            "command": "check",
            "status": status,
            "expect_declared": args.expect_declared,
            "summary": summary,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        ui.rule(Some("smellproof check"));
        print!("{}", summary.render_text());
        if let Some(path) = &args.jsonl {
            ui.info(&format!("ledger: {}", path.display()));
        }
        for verdict in summary.unexpected() {
            ui.warning(&format!("{}: {}", verdict.rule_id, verdict.detail()));
        }
    }

    match status {
        RunStatus::Success => {
            ui.success(&summary.totals_line());
            Ok(())
        }
        RunStatus::Failure => {
            let failing = if args.expect_declared {
                summary.unexpected().len()
            } else {
                summary.total - summary.equivalent_count
            };
            Err(DoctorError::exit(
                status.exit_code(),
                format!("{failing} of {} rules failed the check", summary.total),
            ))
        }
    }
}

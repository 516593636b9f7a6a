use clap::{Parser, Subcommand};

use crate::check::{CheckArgs, run_check};
use crate::error::Result;
use crate::rules::{ListRulesArgs, print_rules};
use crate::show::{ShowArgs, run_show};
use crate::util::{OutputIntegration, init_tracing};

#[derive(Debug, Parser)]
#[command(
    name = "doctor_smellproof",
    about = "Equivalence oracle for code-smell rewrite fixtures",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compare before/after variants of the selected rules.
    Check(CheckArgs),

    /// Render one rule's variants for inspection.
    Show(ShowArgs),

    /// Print the built-in rules.
    #[command(name = "list-rules")]
    ListRules(ListRulesArgs),
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&OutputIntegration::detect());
    run(cli)
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Check(args) => run_check(args),
        Commands::Show(args) => run_show(args),
        Commands::ListRules(args) => print_rules(&args),
    }
}

//! Command implementations.
//!
//! Each submodule handles one CLI command.

mod classify;
mod run;
mod variants;

use wbench::Error;

use crate::cli::{Cli, Commands, EXIT_CONFIG, EXIT_FAILURE};
use crate::terminal;

/// Dispatch CLI command to the appropriate handler.
pub fn run_command(cli: &Cli) -> i32 {
    match &cli.command {
        Commands::Run { .. } => handle_run(cli),
        Commands::Classify { .. } => handle_classify(cli),
        Commands::Variants { .. } => handle_variants(cli),
    }
}

fn handle_run(cli: &Cli) -> i32 {
    let Commands::Run {
        select,
        timeout,
        metric,
        baseline,
        out,
    } = &cli.command
    else {
        unreachable!("run command variant mismatch");
    };

    run::cmd_run(
        select,
        *timeout,
        *metric,
        baseline.as_deref(),
        out,
        !cli.silent,
    )
}

fn handle_classify(cli: &Cli) -> i32 {
    let Commands::Classify { root, kinds, tags } = &cli.command else {
        unreachable!("classify command variant mismatch");
    };

    classify::cmd_classify(root, kinds, tags)
}

fn handle_variants(cli: &Cli) -> i32 {
    let Commands::Variants { select } = &cli.command else {
        unreachable!("variants command variant mismatch");
    };

    variants::cmd_variants(select)
}

/// Report `err` and map it to an exit code.
fn fail(err: &Error) -> i32 {
    terminal::error(&err.to_string());
    if err.is_config() {
        EXIT_CONFIG
    } else {
        EXIT_FAILURE
    }
}

/// Format a statistic, showing undefined values as `-`.
fn fmt_stat(value: f64, precision: usize) -> String {
    if value.is_finite() {
        format!("{value:.precision$}")
    } else {
        "-".to_string()
    }
}

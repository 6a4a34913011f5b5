//! Variants command.

use wbench::Harness;

use super::fail;
use crate::cli::{EXIT_SUCCESS, SelectArgs};
use crate::terminal::{self, Table};

/// Handle the `variants` command.
pub fn cmd_variants(select: &SelectArgs) -> i32 {
    let harness = match Harness::prepare(select.to_options()) {
        Ok(h) => h,
        Err(e) => return fail(&e),
    };
    for warning in harness.warnings() {
        terminal::warning(warning);
    }

    let mut table = Table::new(vec!["variant", "binary", "cli"]);
    for variant in harness.variants() {
        let cli = variant.cli.map(|c| c.to_string()).unwrap_or_default();
        table.add_row(vec![variant.key(), variant.bin.display().to_string(), cli]);
    }
    table.print();

    terminal::info(&format!(
        "{} workloads, baseline {}",
        harness.workloads().len(),
        harness.baseline()
    ));
    for engine in harness.skipped_engines() {
        terminal::dim(&format!("{engine}: no supported runtime/mode requested"));
    }
    for key in harness.pruned_variants() {
        terminal::dim(&format!("pruned {key} (engine reports it unsupported)"));
    }

    EXIT_SUCCESS
}

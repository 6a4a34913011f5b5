//! Classify command.

use std::collections::BTreeMap;
use std::path::Path;

use wbench::{Error, WorkloadFilter, WorkloadKind, load_corpus};

use super::fail;
use crate::cli::{EXIT_SUCCESS, KindArg};
use crate::terminal::{self, Alignment, Table};

/// Handle the `classify` command.
pub fn cmd_classify(root: &Path, kinds: &[KindArg], tags: &[String]) -> i32 {
    let workloads = match load_corpus(root) {
        Ok(w) => w,
        Err(e) => return fail(&Error::from(e)),
    };
    let filter = WorkloadFilter::new()
        .with_kinds(kinds.iter().copied().map(WorkloadKind::from))
        .with_tags(tags);
    let workloads = filter.apply(workloads);
    if workloads.is_empty() {
        terminal::warning(&format!("no workloads under {}", root.display()));
        return EXIT_SUCCESS;
    }

    let mut table = Table::new(vec!["workload", "kind", "tags"]);
    let mut counts: BTreeMap<WorkloadKind, usize> = BTreeMap::new();
    for w in &workloads {
        *counts.entry(w.kind()).or_default() += 1;
        let tags: Vec<&str> = w.classification.tags.iter().map(String::as_str).collect();
        table.add_row(vec![w.rel.clone(), w.kind().to_string(), tags.join(",")]);
    }
    table.print();

    terminal::header("Kinds");
    let mut kinds_table = Table::new(vec!["kind", "workloads", "meaning"]).with_alignments(vec![
        Alignment::Left,
        Alignment::Right,
        Alignment::Left,
    ]);
    for (kind, count) in counts {
        kinds_table.add_row(vec![
            kind.to_string(),
            count.to_string(),
            kind.description().to_string(),
        ]);
    }
    kinds_table.print();

    EXIT_SUCCESS
}

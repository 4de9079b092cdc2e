use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
    process,
};

use clap::Parser;
use reqtrace::{IndexedDataset, domain::TestStatus};
use tracing::instrument;

use super::terminal::{Colorize, by_status, is_narrow};

#[derive(Debug, Parser, Default)]
#[command(about = "Show per-module counts, test totals and the filtering trace")]
pub struct Status {
    /// Keep every module's full content, ignoring the configured filters
    #[arg(long)]
    no_filter: bool,

    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress headers and format for scripting
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Entity counts for one module.
#[derive(Debug, serde::Serialize)]
struct ModuleCounts {
    urn: String,
    requirements: usize,
    svcs: usize,
    mvrs: usize,
}

impl ModuleCounts {
    fn of(dataset: &IndexedDataset, urn: &str) -> Self {
        Self {
            urn: urn.to_string(),
            requirements: dataset.reqs_from_urn().get(urn).map_or(0, BTreeSet::len),
            svcs: dataset.svcs_from_urn().get(urn).map_or(0, BTreeSet::len),
            mvrs: dataset.mvrs_from_urn().get(urn).map_or(0, BTreeSet::len),
        }
    }
}

impl Status {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let dataset = super::build_model(root, self.no_filter)?;

        if dataset.requirements().is_empty() {
            println!("No requirements found in {}.", root.display());
            return Ok(());
        }

        let modules: Vec<ModuleCounts> = dataset
            .urn_parsing_order()
            .iter()
            .map(|urn| ModuleCounts::of(&dataset, urn))
            .collect();

        let mut tests: BTreeMap<TestStatus, usize> = BTreeMap::new();
        for status in dataset
            .automated_test_results()
            .values()
            .flatten()
            .map(|test| test.status)
        {
            *tests.entry(status).or_insert(0) += 1;
        }

        match self.output {
            OutputFormat::Json => Self::output_json(&dataset, &modules, &tests)?,
            OutputFormat::Table if self.quiet => Self::output_quiet(&dataset, &tests),
            OutputFormat::Table => Self::output_table(&dataset, &modules, &tests),
        }

        let unverified = tests.get(&TestStatus::Failed).copied().unwrap_or_default()
            + tests.get(&TestStatus::Missing).copied().unwrap_or_default();
        if unverified > 0 {
            process::exit(2);
        }

        Ok(())
    }

    fn output_json(
        dataset: &IndexedDataset,
        modules: &[ModuleCounts],
        tests: &BTreeMap<TestStatus, usize>,
    ) -> anyhow::Result<()> {
        use serde_json::json;

        let tests: BTreeMap<&str, usize> = tests
            .iter()
            .map(|(status, count)| (status.as_str(), *count))
            .collect();
        let warnings: Vec<String> = dataset.warnings().iter().map(ToString::to_string).collect();

        let output = json!({
            "root": dataset.initial_urn(),
            "filtered": dataset.is_filtered(),
            "modules": modules,
            "total": {
                "requirements": dataset.requirements().len(),
                "svcs": dataset.svcs().len(),
                "mvrs": dataset.mvrs().len(),
            },
            "automated_tests": tests,
            "visited": dataset.visited_urns(),
            "warnings": warnings,
        });

        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn output_quiet(dataset: &IndexedDataset, tests: &BTreeMap<TestStatus, usize>) {
        let count = |status: TestStatus| tests.get(&status).copied().unwrap_or_default();
        println!(
            "requirements={} svcs={} mvrs={} failed={} missing={}",
            dataset.requirements().len(),
            dataset.svcs().len(),
            dataset.mvrs().len(),
            count(TestStatus::Failed),
            count(TestStatus::Missing),
        );
    }

    fn output_table(
        dataset: &IndexedDataset,
        modules: &[ModuleCounts],
        tests: &BTreeMap<TestStatus, usize>,
    ) {
        println!("Modules from {}", dataset.initial_urn());
        println!("{}", "─────────────────".dim());

        if is_narrow() {
            for module in modules {
                println!(
                    "{}: {} reqs, {} svcs, {} mvrs",
                    module.urn, module.requirements, module.svcs, module.mvrs
                );
            }
        } else {
            println!("{:<24} {:>6} {:>6} {:>6}", "Module", "Reqs", "SVCs", "MVRs");
            for module in modules {
                println!(
                    "{:<24} {:>6} {:>6} {:>6}",
                    module.urn, module.requirements, module.svcs, module.mvrs
                );
            }
            println!(
                "{:<24} {:>6} {:>6} {:>6}",
                "Total",
                dataset.requirements().len(),
                dataset.svcs().len(),
                dataset.mvrs().len()
            );
        }

        if !tests.is_empty() {
            println!();
            println!("Automated tests");
            println!("{}", "───────────────".dim());
            for (status, count) in tests {
                println!("{} {count}", by_status(&format!("{:<8}", status.as_str()), *status));
            }
        }

        println!();
        if dataset.is_filtered() {
            println!("Filtered: {}", dataset.visited_urns().join(" → ").dim());
        } else {
            println!("{}", "Unfiltered: every module's full content is included".dim());
        }

        for warning in dataset.warnings() {
            println!("{}", format!("⚠️  {warning}").warning());
        }
    }
}

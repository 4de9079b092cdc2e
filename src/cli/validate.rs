use std::{path::Path, process};

use clap::Parser;
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "Check every reference resolves and every index agrees with its entities")]
pub struct Validate {
    /// Check the unfiltered model instead of the filtered one
    #[arg(long)]
    no_filter: bool,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress all output except errors
    #[arg(long, short)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl Validate {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let dataset = super::build_model(root, self.no_filter)?;
        let inconsistencies = dataset.inconsistencies();

        match self.output {
            OutputFormat::Json => {
                let findings: Vec<String> =
                    inconsistencies.iter().map(ToString::to_string).collect();
                let output = serde_json::json!({
                    "root": dataset.initial_urn(),
                    "filtered": dataset.is_filtered(),
                    "inconsistencies": findings,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table if self.quiet => {}
            OutputFormat::Table => {
                if inconsistencies.is_empty() {
                    println!("{}", "✅ No inconsistencies found".success());
                } else {
                    println!(
                        "{}",
                        format!("⚠️  {} inconsistencies found", inconsistencies.len()).warning()
                    );
                    for inconsistency in &inconsistencies {
                        println!("  • {inconsistency}");
                    }
                }
            }
        }

        if !inconsistencies.is_empty() {
            process::exit(2);
        }
        Ok(())
    }
}

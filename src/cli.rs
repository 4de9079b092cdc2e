use std::path::{Path, PathBuf};

mod status;
mod terminal;
mod validate;

use clap::ArgAction;
use reqtrace::{Config, IndexedDataset};
use status::Status;
use tracing::instrument;
use validate::Validate;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The directory of the root module
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command
            .unwrap_or_else(|| Command::Status(Status::default()))
            .run(&self.root)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Summarize the traceability model (default)
    Status(Status),

    /// Check the model for broken references and index drift
    Validate(Validate),
}

impl Command {
    fn run(self, root: &Path) -> anyhow::Result<()> {
        match self {
            Self::Status(command) => command.run(root),
            Self::Validate(command) => command.run(root),
        }
    }
}

/// Reads the module graph rooted at `root` and builds the model.
///
/// Filtering follows the configuration found in `root`, unless `no_filter`
/// turns it off.
#[instrument(level = "debug")]
fn build_model(root: &Path, no_filter: bool) -> anyhow::Result<IndexedDataset> {
    let config = Config::load_or_default(root);
    let crd = reqtrace::load(root, &config)?;
    Ok(reqtrace::generate(&crd, config.filter && !no_filter)?)
}

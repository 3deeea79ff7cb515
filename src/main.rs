//! # bufpipe CLI (`bp`)
//!
//! ## Usage
//!
//! ```bash
//! bp --config ./config/bufpipe.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `bp session` | Interactive session: load, filter, list, delete stages |
//! | `bp run` | Load a source, apply filters in order, print the result |
//! | `bp config` | Print the effective configuration |
//!
//! ## Examples
//!
//! ```bash
//! # Start from a command's output and explore interactively
//! bp session --cmd "kubectl get pods -o json"
//!
//! # One-shot chain over a file, printing the final stage
//! bp run --file access.log -f "grep ' 500 '" -f "cut -d' ' -f1" -f "sort -u"
//!
//! # Same chain, printing the stage listing instead
//! bp run --file access.log -f "grep ' 500 '" --list
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::BufReader;

use bufpipe::config;
use bufpipe::logging;
use bufpipe::repl::{Input, Repl};
use bufpipe::run::{self, OutputFormat, Source};
use bufpipe::shell::ShellGateway;
use bufpipe::view::PaneView;
use bufpipe_core::session::Session;

/// bufpipe — pipe buffers through shell commands and keep the lineage.
#[derive(Parser)]
#[command(
    name = "bp",
    about = "bufpipe — pipe buffers through shell commands and keep the lineage",
    version,
    long_about = "bufpipe runs text through shell commands one step at a time. Every result \
    is kept as a numbered stage that remembers the stage and command it came from, so you can \
    list, revisit, branch from, and delete intermediate results."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/bufpipe.toml`. Built-in defaults apply when the
    /// file does not exist.
    #[arg(long, global = true, default_value = "./config/bufpipe.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive session.
    ///
    /// Reads commands from stdin, one per line. Type `help` for the list.
    /// Ctrl-C cancels a running command.
    Session {
        /// Load this file as the first stage.
        #[arg(long, conflicts_with = "cmd")]
        file: Option<PathBuf>,

        /// Run this command and load its output as the first stage.
        #[arg(long)]
        cmd: Option<String>,
    },

    /// Run a one-shot pipeline.
    ///
    /// Loads `--file`, the output of `--cmd`, or stdin, then pipes it
    /// through each `--filter` in order. Exits nonzero if any step fails
    /// or produces no output.
    Run {
        /// Input file.
        #[arg(long, conflicts_with = "cmd")]
        file: Option<PathBuf>,

        /// Command whose output is the input.
        #[arg(long)]
        cmd: Option<String>,

        /// Filter command; repeat to chain.
        #[arg(short = 'f', long = "filter")]
        filters: Vec<String>,

        /// Print the stage listing instead of the final content.
        #[arg(long, conflicts_with = "json")]
        list: bool,

        /// Print stage summaries as JSON instead of the final content.
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_config(&cli.config)?;
    logging::init(&cfg.log)?;

    match cli.command {
        Commands::Session { file, cmd } => {
            let view = PaneView::new(std::io::stdout(), cfg.view.clone());
            let mut repl = Repl::new(Session::new(view), ShellGateway::new(&cfg.shell));

            if let Some(path) = file {
                repl.handle(Input::Load(path)).await?;
            } else if let Some(cmd) = cmd {
                repl.handle(Input::LoadCommand(cmd)).await?;
            }

            let prompt = atty::is(atty::Stream::Stdin);
            repl.run(BufReader::new(tokio::io::stdin()), prompt).await?;
        }
        Commands::Run {
            file,
            cmd,
            filters,
            list,
            json,
        } => {
            let source = match (file, cmd) {
                (Some(path), _) => Source::File(path),
                (None, Some(cmd)) => Source::Command(cmd),
                (None, None) => Source::Stdin,
            };
            let format = if list {
                OutputFormat::Listing
            } else if json {
                OutputFormat::Json
            } else {
                OutputFormat::Content
            };
            run::run_pipeline(&cfg, source, &filters, format).await?;
        }
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&cfg)?);
        }
    }

    Ok(())
}

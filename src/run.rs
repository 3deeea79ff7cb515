//! One-shot pipelines (`bp run`).
//!
//! Loads a source, pipes it through each `--filter` in order, and prints
//! the final stage (or the listing, or JSON summaries). A filter that fails
//! or produces no output stops the chain with an error, so the exit code
//! tells scripts whether the whole pipeline went through.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

use bufpipe_core::content::Content;
use bufpipe_core::events::StageObserver;
use bufpipe_core::gateway::Gateway;
use bufpipe_core::listing::{render, snapshot};
use bufpipe_core::models::{StageId, StageSummary};
use bufpipe_core::session::{FilterOutcome, Session};

use crate::config::Config;
use crate::shell::ShellGateway;

/// Where the first stage comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    File(PathBuf),
    Command(String),
    Stdin,
}

/// How the result is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Content,
    Listing,
    Json,
}

/// Load `source` as a root stage, then apply `filters` in order. Returns
/// the id of the last stage.
pub async fn run_chain<O: StageObserver>(
    session: &mut Session<O>,
    gateway: &dyn Gateway,
    source: &Source,
    filters: &[String],
) -> Result<StageId> {
    let mut last = match source {
        Source::File(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read input file: {}", path.display()))?;
            session.load(Content::from_bytes(&bytes), "")?
        }
        Source::Stdin => {
            let mut bytes = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut bytes)
                .await
                .context("Failed to read stdin")?;
            session.load(Content::from_bytes(&bytes), "")?
        }
        Source::Command(cmd) => {
            let outcome = session.load_command(gateway, cmd).await?;
            expect_stage(cmd, outcome)?
        }
    };

    for filter in filters {
        let outcome = session.filter(gateway, filter).await?;
        last = expect_stage(filter, outcome)?;
    }
    Ok(last)
}

fn expect_stage(command: &str, outcome: FilterOutcome) -> Result<StageId> {
    match outcome {
        FilterOutcome::Created(id) => Ok(id),
        other => bail!("`{}`: {}", command, other.notice()),
    }
}

/// Render the session in the requested format.
pub fn format_output<O: StageObserver>(
    session: &Session<O>,
    last: StageId,
    format: OutputFormat,
) -> Result<String> {
    let store = session.store();
    match format {
        OutputFormat::Content => Ok(store.get(last)?.content.to_text()),
        OutputFormat::Listing => Ok(render(&snapshot(store)).to_text()),
        OutputFormat::Json => {
            let summaries: Vec<StageSummary> = store.list().iter().map(|s| s.summary()).collect();
            let mut json = serde_json::to_string_pretty(&summaries)?;
            json.push('\n');
            Ok(json)
        }
    }
}

/// CLI entry point: run the chain and print the result to stdout.
pub async fn run_pipeline(
    config: &Config,
    source: Source,
    filters: &[String],
    format: OutputFormat,
) -> Result<()> {
    let gateway = ShellGateway::new(&config.shell);
    let mut session: Session = Session::new(());

    let last = run_chain(&mut session, &gateway, &source, filters).await?;
    print!("{}", format_output(&session, last, format)?);
    Ok(())
}

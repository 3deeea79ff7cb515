//! Execution gateway trait.
//!
//! The core never runs processes itself. It hands a command and an input
//! [`Content`] to a [`Gateway`] and records whatever comes back. The shell
//! implementation lives in the `bufpipe` app crate; tests use scripted
//! gateways.

use async_trait::async_trait;
use thiserror::Error;

use crate::content::Content;

/// Why a gateway run produced no content.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The command ran and exited unsuccessfully. `code` is `None` when the
    /// process was terminated by a signal.
    #[error("command failed{}{}", exit_suffix(.code), stderr_suffix(.stderr))]
    Failed { code: Option<i32>, stderr: String },

    #[error("could not start command: {0}")]
    Spawn(String),

    /// The user abandoned the run; any partial output was discarded.
    #[error("command cancelled")]
    Cancelled,
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!(" with exit code {}", c),
        None => " (terminated by signal)".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let first = stderr.lines().find(|l| !l.trim().is_empty());
    match first {
        Some(line) => format!(": {}", line.trim()),
        None => String::new(),
    }
}

/// Runs a command over some input and returns its standard output.
///
/// Implementations must not touch the lineage store; the caller decides
/// what to record based on the returned value.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn run(&self, command: &str, stdin: &Content) -> Result<Content, GatewayError>;
}

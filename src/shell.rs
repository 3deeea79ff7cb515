//! Shell-backed [`Gateway`].
//!
//! Runs each command as `<program> <args...> <command>` (by default
//! `sh -c <command>`), feeds the input content on stdin, and captures
//! stdout. A nonzero exit is a failure carrying the exit code and stderr.
//!
//! Runs can be abandoned through a [`CancellationToken`]: the child is
//! spawned with `kill_on_drop`, so dropping the in-flight future on
//! cancellation kills the process and discards whatever it had written.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use bufpipe_core::content::Content;
use bufpipe_core::gateway::{Gateway, GatewayError};

use crate::config::ShellConfig;

pub struct ShellGateway {
    program: String,
    args: Vec<String>,
}

impl ShellGateway {
    pub fn new(config: &ShellConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
        }
    }

    /// Run `command` over `stdin`, giving up as soon as `cancel` fires.
    pub async fn run_until(
        &self,
        command: &str,
        stdin: &Content,
        cancel: &CancellationToken,
    ) -> Result<Content, GatewayError> {
        info!(command, input_lines = stdin.line_count(), "running command");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| GatewayError::Spawn(format!("{}: {}", self.program, e)))?;

        let input = stdin.to_text();
        let pipe = child.stdin.take();
        // Feed stdin while output is drained, otherwise a command that
        // fills its stdout pipe before reading all input would deadlock.
        let feed = async move {
            if let Some(mut pipe) = pipe {
                // Commands that ignore stdin close it early; a broken pipe
                // here is expected.
                let _ = pipe.write_all(input.as_bytes()).await;
            }
        };
        let run = async {
            let ((), output) = tokio::join!(feed, child.wait_with_output());
            output
        };

        let output = tokio::select! {
            output = run => output.map_err(|e| GatewayError::Spawn(e.to_string()))?,
            _ = cancel.cancelled() => {
                debug!(command, "cancellation requested");
                return Err(GatewayError::Cancelled);
            }
        };

        if !output.status.success() {
            return Err(GatewayError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let content = Content::from_bytes(&output.stdout);
        debug!(command, output_lines = content.line_count(), "command finished");
        Ok(content)
    }
}

#[async_trait]
impl Gateway for ShellGateway {
    async fn run(&self, command: &str, stdin: &Content) -> Result<Content, GatewayError> {
        self.run_until(command, stdin, &CancellationToken::new())
            .await
    }
}

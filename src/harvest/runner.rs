//! Execution of the connection-listing command in the host network namespace.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::MAX_HARVEST_STDERR_BYTES;
use crate::error_handling::HarvestError;

/// Produces the raw text listing of established connections.
///
/// The production implementation shells out; tests substitute canned output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs the harvest once and returns its stdout.
    async fn run(&self) -> Result<String, HarvestError>;
}

/// Runs `ss` inside another process's network namespace via `nsenter`.
///
/// Needs the namespace-entry capability in the container (host PID namespace
/// plus `SYS_ADMIN`/`NET_ADMIN`); without it `nsenter` exits non-zero and the
/// harvest fails.
#[derive(Debug, Clone)]
pub struct NsenterRunner {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl NsenterRunner {
    /// Lists sockets established on local port `port` in the network namespace of `target_pid`.
    pub fn new(target_pid: u32, port: u16, timeout: Duration) -> Self {
        let args = [
            "--target".to_string(),
            target_pid.to_string(),
            "--net".to_string(),
            "--".to_string(),
            "ss".to_string(),
            "-H".to_string(),
            "-t".to_string(),
            "-n".to_string(),
            "state".to_string(),
            "established".to_string(),
            "sport".to_string(),
            "=".to_string(),
            format!(":{}", port),
        ];
        Self::with_command("nsenter", args, timeout)
    }

    /// Runs an arbitrary program with the same timeout and failure handling.
    pub fn with_command<I, S>(program: impl Into<String>, args: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout,
        }
    }

    /// The command line, for logs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl CommandRunner for NsenterRunner {
    async fn run(&self) -> Result<String, HarvestError> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(HarvestError::Spawn)?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(HarvestError::Io(e)),
            Err(_) => return Err(HarvestError::Timeout(self.timeout)),
        };

        if !output.status.success() {
            return Err(HarvestError::ExitStatus {
                code: output.status.code(),
                stderr: truncate_stderr(&output.stderr),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn truncate_stderr(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.len() <= MAX_HARVEST_STDERR_BYTES {
        return text.to_string();
    }
    let mut end = MAX_HARVEST_STDERR_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

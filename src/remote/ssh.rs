//! SSH-backed remote execution.
//!
//! # Responsibilities
//! - Run a command on a server with the configured port, user and key
//! - Enforce the step timeout, killing the ssh child on expiry
//! - Classify failures into authentication, connection and command errors

use std::net::IpAddr;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time;

use crate::config::SshOptions;
use crate::node::ServerNode;
use crate::remote::commands;
use crate::remote::error::RemoteError;
use crate::remote::executor::{AliasState, RemoteExecutor};

/// ssh reserves this exit status for its own errors.
const SSH_FAILURE_STATUS: i32 = 255;

/// Output from a successful remote command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Executes commands through the system `ssh` client in batch mode.
#[derive(Debug, Clone)]
pub struct SshExecutor {
    opts: SshOptions,
    timeout: Duration,
}

impl SshExecutor {
    /// `timeout` bounds every command issued through the [`RemoteExecutor`] methods.
    pub fn new(opts: SshOptions, timeout: Duration) -> Self {
        Self { opts, timeout }
    }

    fn command(&self, server: &ServerNode, remote_command: &str, timeout: Duration) -> Command {
        // ConnectTimeout only takes whole seconds.
        let connect_secs = timeout.as_secs().max(1);

        let mut cmd = Command::new("ssh");
        cmd.arg("-p")
            .arg(self.opts.port.to_string())
            .arg("-i")
            .arg(&self.opts.keyfile)
            .arg("-l")
            .arg(&self.opts.user)
            .args(["-o", "BatchMode=yes"])
            .args(["-o", "StrictHostKeyChecking=accept-new"])
            .arg("-o")
            .arg(format!("ConnectTimeout={}", connect_secs))
            .arg(server.ip.to_string())
            .arg(remote_command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Run `remote_command` on `server`, failing if it takes longer than `timeout`.
    pub async fn run_command(
        &self,
        server: &ServerNode,
        remote_command: &str,
        timeout: Duration,
    ) -> Result<CommandOutput, RemoteError> {
        tracing::debug!(server = %server.id, ip = %server.ip, command = remote_command, "Running remote command");

        let child = self
            .command(server, remote_command, timeout)
            .spawn()
            .map_err(|e| RemoteError::Spawn(e.to_string()))?;

        // Dropping the future on timeout drops the child, which kills it.
        let output = match time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(RemoteError::Connection(e.to_string())),
            Err(_) => return Err(RemoteError::Timeout(timeout)),
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if output.status.success() {
            return Ok(CommandOutput { stdout, stderr });
        }

        Err(classify_failure(output.status.code(), stderr))
    }
}

/// Map a non-zero ssh exit into a [`RemoteError`].
pub(crate) fn classify_failure(code: Option<i32>, stderr: String) -> RemoteError {
    match code {
        Some(SSH_FAILURE_STATUS) | None => {
            if is_auth_failure(&stderr) {
                RemoteError::Auth(stderr)
            } else {
                RemoteError::Connection(stderr)
            }
        }
        Some(_) => RemoteError::CommandFailed { code, stderr },
    }
}

fn is_auth_failure(stderr: &str) -> bool {
    ["Permission denied", "Host key verification failed", "Too many authentication failures"]
        .iter()
        .any(|marker| stderr.contains(marker))
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn bring_up(&self, server: &ServerNode, ip: IpAddr) -> Result<(), RemoteError> {
        self.run_command(server, &commands::bring_up(server, ip), self.timeout)
            .await
            .map(|_| ())
    }

    async fn bring_down(&self, server: &ServerNode, ip: IpAddr) -> Result<(), RemoteError> {
        self.run_command(server, &commands::bring_down(server, ip), self.timeout)
            .await
            .map(|_| ())
    }

    async fn query_state(&self, server: &ServerNode, ip: IpAddr) -> Result<AliasState, RemoteError> {
        let output = self
            .run_command(server, &commands::query_state(server), self.timeout)
            .await?;
        Ok(commands::parse_state(&output.stdout, ip))
    }
}

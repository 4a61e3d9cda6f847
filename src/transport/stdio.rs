// ABOUTME: Stdio transport for MCP communication.
// ABOUTME: Spawns a subprocess and exchanges JSON-RPC lines over stdin/stdout.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use super::Transport;
use crate::error::{McpError, McpResult};

/// How long a server gets to exit on its own after stdin closes.
const EXIT_GRACE: Duration = Duration::from_millis(500);

/// Stdio transport - spawns a subprocess and talks JSON-RPC over stdin/stdout.
pub struct StdioTransport {
    command: String,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout: Option<BufReader<ChildStdout>>,
}

impl StdioTransport {
    /// Create a new stdio transport by spawning a subprocess.
    pub async fn connect(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> McpResult<Self> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .envs(env.iter())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| McpError::Launch(format!("{}: {}", command, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::Launch("Failed to open stdin".into()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::Launch("Failed to open stdout".into()))?;

        tracing::debug!(command, pid = ?child.id(), "spawned MCP server");

        Ok(Self {
            command: command.to_string(),
            child: Some(child),
            stdin: Some(stdin),
            stdout: Some(BufReader::new(stdout)),
        })
    }

    /// OS process id of the server, while it is running.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.id())
    }

    /// Describe how the child ended, if it already has.
    fn exit_note(&mut self) -> String {
        match self.child.as_mut().map(|c| c.try_wait()) {
            Some(Ok(Some(status))) => format!(" (server exited: {})", status),
            _ => String::new(),
        }
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn send(&mut self, line: &str) -> McpResult<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| McpError::Transport("Server connection closed".into()))?;

        let written = async {
            stdin.write_all(line.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            stdin.flush().await
        }
        .await;

        if let Err(e) = written {
            let note = self.exit_note();
            return Err(McpError::Transport(format!(
                "write to server failed: {}{}",
                e, note
            )));
        }
        Ok(())
    }

    async fn receive(&mut self) -> McpResult<String> {
        let stdout = self
            .stdout
            .as_mut()
            .ok_or_else(|| McpError::Transport("Server connection closed".into()))?;

        let mut line = String::new();
        let read = stdout.read_line(&mut line).await;
        match read {
            Ok(0) => {
                let note = self.exit_note();
                Err(McpError::Transport(format!(
                    "server closed its output{}",
                    note
                )))
            }
            Ok(_) => Ok(line.trim_end_matches(['\r', '\n']).to_string()),
            Err(e) => Err(McpError::Transport(format!("read from server failed: {}", e))),
        }
    }

    /// Ask the server to exit: EOF on stdin, then SIGTERM on unix, then kill.
    /// Each polite step gets `EXIT_GRACE` before the next one.
    async fn close(&mut self) -> McpResult<()> {
        self.stdin.take();
        self.stdout.take();

        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        if let Ok(Some(status)) = child.try_wait() {
            tracing::debug!(command = %self.command, %status, "server had already exited");
            return Ok(());
        }

        if wait_exit(&self.command, &mut child).await {
            return Ok(());
        }

        #[cfg(unix)]
        {
            tracing::debug!(command = %self.command, "server ignored EOF, sending SIGTERM");
            terminate(&child);
            if wait_exit(&self.command, &mut child).await {
                return Ok(());
            }
        }

        tracing::warn!(command = %self.command, "server still running, killing");
        // kill() also reaps the child.
        if let Err(e) = child.kill().await {
            tracing::warn!(command = %self.command, error = %e, "kill failed");
        }

        Ok(())
    }

    fn describe(&self) -> String {
        format!("stdio:{}", self.command)
    }
}

/// Wait up to `EXIT_GRACE` for the child. True once there is nothing left to do.
async fn wait_exit(command: &str, child: &mut Child) -> bool {
    match tokio::time::timeout(EXIT_GRACE, child.wait()).await {
        Ok(Ok(status)) => {
            tracing::debug!(command, %status, "server exited");
            true
        }
        Ok(Err(e)) => {
            tracing::warn!(command, error = %e, "waiting for server failed");
            true
        }
        Err(_) => false,
    }
}

#[cfg(unix)]
fn terminate(child: &Child) {
    let Some(pid) = child.id() else {
        return;
    };
    // SAFETY: kill(2) on the pid of a child we own and have not reaped yet.
    let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if rc != 0 {
        tracing::debug!(pid, error = %std::io::Error::last_os_error(), "SIGTERM failed");
    }
}

/// SSH Transport Session
///
/// One persistent, multiplexed OpenSSH connection to the execution host,
/// shared by every submission the process handles. Commands from
/// concurrent submissions interleave as separate channels on the same
/// master connection.
use crate::error::TransportError;
use crate::transport::{SessionGate, SessionState, Transport};
use async_trait::async_trait;
use grader_common::config::SshConfig;
use grader_common::types::ExecutionOutput;
use openssh::{KnownHosts, Session, SessionBuilder, Stdio};
use std::path::Path;
use std::process::Output;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Exit code recorded when the remote side reports no status.
pub const UNKNOWN_EXIT_CODE: i32 = -1;

pub struct SshSession {
    config: SshConfig,
    gate: SessionGate<Session>,
}

impl SshSession {
    pub fn new(config: SshConfig) -> Self {
        Self {
            config,
            gate: SessionGate::new(),
        }
    }

    fn destination(&self) -> String {
        match self.config.port {
            Some(port) => format!("{}@{}:{}", self.config.username, self.config.host, port),
            None => format!("{}@{}", self.config.username, self.config.host),
        }
    }

    fn session(&self) -> Result<&Session, TransportError> {
        self.gate.get()
    }

    async fn open(&self) -> Result<Session, TransportError> {
        let mut builder = SessionBuilder::default();
        builder
            .user(self.config.username.clone())
            .keyfile(&self.config.private_key)
            .known_hosts_check(KnownHosts::Add);
        if let Some(port) = self.config.port {
            builder.port(port);
        }

        builder
            .connect_mux(&self.config.host)
            .await
            .map_err(|source| TransportError::Connect {
                destination: self.destination(),
                source,
            })
    }

    /// Run a command whose nonzero exit is a transport failure.
    async fn run_checked(&self, command: String) -> Result<(), TransportError> {
        let output = self.execute(&command).await?;
        if output.succeeded() {
            Ok(())
        } else {
            Err(TransportError::RemoteCommand {
                command,
                exit_code: output.exit_code,
                stderr: output.stderr,
            })
        }
    }

    /// Tear down the master connection. Called once at process shutdown.
    pub async fn close(self) -> Result<(), TransportError> {
        if let Some(session) = self.gate.into_inner() {
            session.close().await?;
        }
        Ok(())
    }
}

fn into_execution_output(output: Output) -> ExecutionOutput {
    ExecutionOutput {
        exit_code: output.status.code().unwrap_or(UNKNOWN_EXIT_CODE),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}

#[async_trait]
impl Transport for SshSession {
    async fn connect(&self) -> Result<(), TransportError> {
        self.gate
            .get_or_connect(move || async move {
                info!(destination = %self.destination(), "Connecting to execution host");
                match self.open().await {
                    Ok(session) => {
                        info!("✓ SSH session established");
                        Ok(session)
                    }
                    Err(e) => {
                        warn!(error = %e, "SSH connect failed");
                        Err(e)
                    }
                }
            })
            .await?;

        Ok(())
    }

    fn state(&self) -> SessionState {
        self.gate.state()
    }

    async fn upload_file(&self, local: &Path, remote: &str) -> Result<(), TransportError> {
        let session = self.session()?;
        let contents = tokio::fs::read(local).await?;

        let command = format!("cat > {}", shell_words::quote(remote));
        let mut child = session
            .raw_command(&command)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .await?;

        if let Some(mut stdin) = child.stdin().take() {
            stdin.write_all(&contents).await?;
            stdin.shutdown().await?;
        }

        let output = into_execution_output(child.wait_with_output().await?);
        if !output.succeeded() {
            return Err(TransportError::RemoteCommand {
                command,
                exit_code: output.exit_code,
                stderr: output.stderr,
            });
        }

        debug!(local = %local.display(), remote, bytes = contents.len(), "Uploaded file");
        Ok(())
    }

    async fn make_directory(&self, remote: &str) -> Result<(), TransportError> {
        self.run_checked(format!("mkdir -p {}", shell_words::quote(remote)))
            .await
    }

    async fn remove_directory(&self, remote: &str) -> Result<(), TransportError> {
        self.run_checked(format!("rm -rf {}", shell_words::quote(remote)))
            .await
    }

    async fn execute(&self, command: &str) -> Result<ExecutionOutput, TransportError> {
        let session = self.session()?;
        let output = session.raw_command(command).output().await?;
        Ok(into_execution_output(output))
    }
}

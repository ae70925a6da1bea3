/// Compiler Invoker
///
/// Builds the staged source into an executable inside the workspace.
/// Success is exit code 0 and nothing else; warnings on stderr do not
/// matter. A failed compile is returned as a plain result, never an error.
use crate::error::TransportError;
use crate::transport::Transport;
use crate::workspace::Workspace;
use grader_common::types::ExecutionResult;
use tracing::{debug, info, instrument, warn};

/// The single toolchain the grader drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    compiler: String,
}

impl Toolchain {
    pub fn new(compiler: impl Into<String>) -> Self {
        Self {
            compiler: compiler.into(),
        }
    }

    /// `<compiler> <source> -o <executable>`
    pub fn compile_command(&self, source: &str, executable: &str) -> String {
        format!(
            "{} {} -o {}",
            self.compiler,
            shell_words::quote(source),
            shell_words::quote(executable)
        )
    }

    /// The argument string is passed through unquoted so the remote shell
    /// splits it into argv.
    pub fn run_command(executable: &str, args: Option<&str>) -> String {
        let executable = shell_words::quote(executable);
        match args {
            Some(args) => format!("{} {}", executable, args),
            None => executable.into_owned(),
        }
    }
}

#[instrument(skip_all, fields(run_id = %workspace.run_id()))]
pub async fn compile(
    transport: &dyn Transport,
    toolchain: &Toolchain,
    workspace: &Workspace,
) -> Result<ExecutionResult, TransportError> {
    let command = toolchain.compile_command(
        workspace.remote_source_path(),
        workspace.remote_executable_path(),
    );
    debug!(command = %command, "Compiling");

    let output = transport.execute(&command).await?;

    if output.succeeded() {
        info!("✓ Compilation succeeded");
    } else {
        warn!(
            exit_code = output.exit_code,
            stderr = %output.stderr.lines().next().unwrap_or(""),
            "Compilation failed"
        );
    }

    Ok(ExecutionResult::from(output))
}

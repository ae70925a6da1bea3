use grader_common::types::TestGroup;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to connect to {destination}: {source}")]
    Connect {
        destination: String,
        #[source]
        source: openssh::Error,
    },

    #[error("Remote session is not connected")]
    NotConnected,

    #[error("SSH error: {0}")]
    Ssh(#[from] openssh::Error),

    #[error("Local I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Remote command `{command}` exited with code {exit_code}: {stderr}")]
    RemoteCommand {
        command: String,
        exit_code: i32,
        stderr: String,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{group} group has {tests} test cases but only {expected} expected outputs")]
    ExpectedOutputTooShort {
        group: TestGroup,
        tests: usize,
        expected: usize,
    },

    #[error("{group} group has no test data and no expected output")]
    MissingExpectedOutput { group: TestGroup },
}

/// Everything that can stop a submission from producing a verdict.
///
/// Compile failures and failing test runs are not errors; they are
/// reported inside the verdict.
#[derive(Debug, Error)]
pub enum GradeError {
    #[error("Invalid submission: {0}")]
    Validation(#[from] ValidationError),

    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("Failed to stage source locally: {0}")]
    Staging(#[source] std::io::Error),
}

/// A teardown step that did not complete. Logged, never returned in place
/// of the submission's own outcome.
#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("Failed to remove remote directory {path}: {source}")]
    Remote {
        path: String,
        #[source]
        source: TransportError,
    },

    #[error("Failed to remove local file {}: {source}", path.display())]
    Local {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

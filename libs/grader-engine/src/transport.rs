/// Transport Seam
///
/// The core only ever talks to the execution host through [`Transport`].
/// Production uses [`crate::ssh::SshSession`]; tests substitute an
/// in-memory host.
use crate::error::TransportError;
use async_trait::async_trait;
use grader_common::types::ExecutionOutput;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::OnceCell;

/// Connection state of the shared session.
///
/// `Disconnected -> Connecting -> Connected`; a failed connect returns to
/// `Disconnected`. Primitive failures never move the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Disconnected => write!(f, "disconnected"),
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::Connected => write!(f, "connected"),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish the connection. Concurrent callers share one attempt and
    /// later callers reuse the established connection.
    async fn connect(&self) -> Result<(), TransportError>;

    fn state(&self) -> SessionState;

    async fn upload_file(&self, local: &Path, remote: &str) -> Result<(), TransportError>;

    async fn make_directory(&self, remote: &str) -> Result<(), TransportError>;

    /// Recursive removal; removing a missing directory is not an error.
    async fn remove_directory(&self, remote: &str) -> Result<(), TransportError>;

    /// Run a shell command line on the host. A nonzero exit code is a
    /// normal outcome, not an error.
    async fn execute(&self, command: &str) -> Result<ExecutionOutput, TransportError>;
}

/// Single-flight connection holder.
///
/// Wraps the connection handle with its [`SessionState`]. While one
/// connect attempt is pending, other callers wait on it rather than
/// starting their own; once connected, the handle is reused for the
/// lifetime of the gate.
pub struct SessionGate<C> {
    state: Mutex<SessionState>,
    connection: OnceCell<C>,
}

impl<C> SessionGate<C> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SessionState::Disconnected),
            connection: OnceCell::new(),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        // A poisoned lock still holds a valid enum value
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, state: SessionState) {
        *self.lock_state() = state;
    }

    pub fn state(&self) -> SessionState {
        *self.lock_state()
    }

    pub fn get(&self) -> Result<&C, TransportError> {
        self.connection.get().ok_or(TransportError::NotConnected)
    }

    /// Return the live connection, running `open` only if none exists and
    /// no other caller is already opening one. A failed or cancelled
    /// attempt leaves the gate `Disconnected` so a later caller may try
    /// again.
    pub async fn get_or_connect<F, Fut>(&self, open: F) -> Result<&C, TransportError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<C, TransportError>>,
    {
        if let Some(connection) = self.connection.get() {
            return Ok(connection);
        }

        self.connection
            .get_or_try_init(move || async move {
                self.set_state(SessionState::Connecting);
                let attempt = ConnectAttempt { gate: self, done: false };
                let connection = open().await;
                if connection.is_ok() {
                    attempt.finish();
                }
                connection
            })
            .await
    }

    pub fn into_inner(self) -> Option<C> {
        self.connection.into_inner()
    }
}

/// Resets the gate to `Disconnected` when an attempt fails or its future
/// is dropped before the connection is established.
struct ConnectAttempt<'a, C> {
    gate: &'a SessionGate<C>,
    done: bool,
}

impl<C> ConnectAttempt<'_, C> {
    fn finish(mut self) {
        self.done = true;
        self.gate.set_state(SessionState::Connected);
    }
}

impl<C> Drop for ConnectAttempt<'_, C> {
    fn drop(&mut self) {
        if !self.done {
            self.gate.set_state(SessionState::Disconnected);
        }
    }
}

impl<C> Default for SessionGate<C> {
    fn default() -> Self {
        Self::new()
    }
}

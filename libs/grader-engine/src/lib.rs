pub mod compiler;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod runner;
pub mod ssh;
pub mod transport;
pub mod validation;
pub mod workspace;

#[cfg(test)]
mod testing;

pub use error::{CleanupError, GradeError, TransportError, ValidationError};
pub use executor::GraderEngine;
pub use ssh::SshSession;
pub use transport::{SessionState, Transport};

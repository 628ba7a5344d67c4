//! Remote execution errors.

use std::time::Duration;

use thiserror::Error;

/// Failure of a single remote command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The server rejected the key or host verification failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The server could not be reached.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The command did not finish within the step timeout.
    #[error("remote command timed out after {0:?}")]
    Timeout(Duration),

    /// The command ran and exited unsuccessfully.
    #[error("remote command exited with {code:?}: {stderr}")]
    CommandFailed { code: Option<i32>, stderr: String },

    /// The local ssh client could not be started.
    #[error("failed to spawn ssh: {0}")]
    Spawn(String),
}

impl RemoteError {
    /// True when the server itself was not reached, as opposed to a command failing on it.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            RemoteError::Auth(_) | RemoteError::Connection(_) | RemoteError::Timeout(_) | RemoteError::Spawn(_)
        )
    }
}

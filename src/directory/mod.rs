use std::io;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::Connection;

pub mod memory;
pub mod nmcli;
pub use memory::MemoryDirectory;
pub use nmcli::NmcliDirectory;

/// Any failure of a directory operation other than "not found".
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("cannot run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` exited with {status}, output {output:?}")]
    Command {
        command: String,
        status: String,
        output: String,
    },
    #[error("unexpected output from `{command}`: {reason}")]
    MalformedOutput { command: String, reason: String },
    #[error("{0}")]
    Rejected(String),
    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

/// The authoritative store of connection profiles.
///
/// There is no update operation. A connection is changed by deleting and
/// recreating it.
#[async_trait]
pub trait ConnectionDirectory: Send + Sync {
    /// Fetch the stored connection called `name`.
    /// `Ok(None)` means the connection does not exist; every other failure
    /// is an error and must not be read as absence.
    async fn lookup(&self, name: &str) -> Result<Option<Connection>, DirectoryError>;

    /// Create `connection`. Empty attributes are left out of the request.
    async fn create(&self, connection: &Connection) -> Result<(), DirectoryError>;

    /// Delete the connection called `name`.
    async fn delete(&self, name: &str) -> Result<(), DirectoryError>;
}

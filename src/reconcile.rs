//! Reconciliation of a single connection.
//!
//! The reconciler looks the desired connection up once, decides what has
//! to happen and performs it through the [`ConnectionDirectory`]:
//!
//! | found | state   | action                                   |
//! |-------|---------|------------------------------------------|
//! | no    | absent  | none                                     |
//! | no    | present | create                                   |
//! | yes   | absent  | delete                                   |
//! | yes   | present | none if equal, otherwise delete + create |
//!
//! Delete + create is not atomic. If the create fails or runs out of time
//! the connection is gone and the result is
//! [`ReconcileError::PartialConvergence`]; nothing is rolled back or
//! retried.

use std::future::Future;
use std::time::Duration;

use log::{error, info};
use thiserror::Error;
use tokio::time::{timeout_at, Instant};

use crate::directory::{ConnectionDirectory, DirectoryError};
use crate::types::{Connection, DesiredState};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("cannot find connection {name:?}: {source}")]
    Lookup {
        name: String,
        #[source]
        source: DirectoryError,
    },
    #[error("cannot create connection {desired}: {source}")]
    Create {
        desired: Connection,
        #[source]
        source: DirectoryError,
    },
    #[error("cannot remove connection {actual}: {source}")]
    Remove {
        actual: Connection,
        #[source]
        source: DirectoryError,
    },
    /// The old connection was deleted but the replacement was not created,
    /// either because the create failed or because the deadline ran out.
    #[error(
        "connection {removed} was removed and not recreated: \
         cannot create connection {desired}: {source}"
    )]
    PartialConvergence {
        removed: Connection,
        desired: Connection,
        #[source]
        source: DirectoryError,
    },
}

/// Result of one reconciliation.
#[derive(Debug)]
pub enum Outcome {
    Unchanged,
    Changed,
    Failed(ReconcileError),
}

impl Outcome {
    pub fn changed(&self) -> bool {
        matches!(self, Outcome::Changed)
    }

    pub fn failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    /// True when an update left the connection deleted.
    pub fn is_partial_convergence(&self) -> bool {
        matches!(
            self,
            Outcome::Failed(ReconcileError::PartialConvergence { .. })
        )
    }
}

impl From<Result<bool, ReconcileError>> for Outcome {
    fn from(result: Result<bool, ReconcileError>) -> Self {
        match result {
            Ok(true) => Outcome::Changed,
            Ok(false) => Outcome::Unchanged,
            Err(e) => Outcome::Failed(e),
        }
    }
}

/// Point in time by which every directory call has to be done.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    timeout: Duration,
}

/// Drives one connection towards its desired state.
///
/// Holds nothing but a borrowed directory; every call starts from a fresh
/// lookup.
pub struct Reconciler<'a, D: ?Sized> {
    directory: &'a D,
}

impl<'a, D: ConnectionDirectory + ?Sized> Reconciler<'a, D> {
    pub fn new(directory: &'a D) -> Self {
        Self { directory }
    }

    pub async fn reconcile(&self, desired: &Connection, state: DesiredState) -> Outcome {
        self.run(desired, state, None).await
    }

    /// Like [`Reconciler::reconcile`] but bounded by `deadline`, which
    /// covers the lookup and any mutations. Each directory call gets the
    /// time that is left; expiry drops the call in flight and fails it with
    /// [`DirectoryError::DeadlineExceeded`], so a create cut off after the
    /// delete is still reported as a partial convergence.
    pub async fn reconcile_within(
        &self,
        desired: &Connection,
        state: DesiredState,
        deadline: Duration,
    ) -> Outcome {
        let deadline = Deadline {
            at: Instant::now() + deadline,
            timeout: deadline,
        };
        self.run(desired, state, Some(deadline)).await
    }

    async fn run(
        &self,
        desired: &Connection,
        state: DesiredState,
        deadline: Option<Deadline>,
    ) -> Outcome {
        let outcome = Outcome::from(self.converge(desired, state, deadline).await);
        match &outcome {
            Outcome::Unchanged => info!("Connection {:?} already {}", desired.name, state),
            Outcome::Changed => info!("Connection {:?} is now {}", desired.name, state),
            Outcome::Failed(e) => error!("{}", e),
        }
        outcome
    }

    /// Returns whether the directory was mutated.
    async fn converge(
        &self,
        desired: &Connection,
        state: DesiredState,
        deadline: Option<Deadline>,
    ) -> Result<bool, ReconcileError> {
        let found = bounded(deadline, self.directory.lookup(&desired.name))
            .await
            .map_err(|source| ReconcileError::Lookup {
                name: desired.name.clone(),
                source,
            })?;

        let actual = match (found, state) {
            (None, DesiredState::Absent) => return Ok(false),
            (None, DesiredState::Present) => {
                info!("Creating connection {}", desired);
                self.create(desired, deadline).await?;
                return Ok(true);
            }
            (Some(actual), DesiredState::Absent) => {
                info!("Removing connection {}", actual);
                self.remove(&actual, deadline).await?;
                return Ok(true);
            }
            (Some(actual), DesiredState::Present) => actual,
        };

        if actual == *desired {
            return Ok(false);
        }

        info!("Replacing connection {} with {}", actual, desired);
        self.remove(&actual, deadline).await?;
        self.create(desired, deadline)
            .await
            .map_err(|e| match e {
                ReconcileError::Create { desired, source } => {
                    ReconcileError::PartialConvergence {
                        removed: actual,
                        desired,
                        source,
                    }
                }
                other => other,
            })?;
        Ok(true)
    }

    async fn create(
        &self,
        desired: &Connection,
        deadline: Option<Deadline>,
    ) -> Result<(), ReconcileError> {
        bounded(deadline, self.directory.create(desired))
            .await
            .map_err(|source| ReconcileError::Create {
                desired: desired.clone(),
                source,
            })
    }

    async fn remove(
        &self,
        actual: &Connection,
        deadline: Option<Deadline>,
    ) -> Result<(), ReconcileError> {
        bounded(deadline, self.directory.delete(&actual.name))
            .await
            .map_err(|source| ReconcileError::Remove {
                actual: actual.clone(),
                source,
            })
    }
}

/// Await a directory call, giving up once `deadline` has passed.
async fn bounded<T, F>(deadline: Option<Deadline>, call: F) -> Result<T, DirectoryError>
where
    F: Future<Output = Result<T, DirectoryError>>,
{
    match deadline {
        None => call.await,
        Some(deadline) => timeout_at(deadline.at, call)
            .await
            .unwrap_or(Err(DirectoryError::DeadlineExceeded(deadline.timeout))),
    }
}

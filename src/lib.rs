//! Desired-state reconciliation of NetworkManager connections.
//!
//! The crate backs an Ansible module: it reads the desired connection from
//! the module argument file, compares it with what `nmcli` reports and
//! creates, deletes or replaces the connection so both agree.

pub mod args;
pub mod config;
pub mod directory;
pub mod reconcile;
pub mod response;
pub mod types;

pub use directory::{ConnectionDirectory, DirectoryError};
pub use reconcile::{Outcome, ReconcileError, Reconciler};
pub use response::Response;
pub use types::{Connection, DesiredState, UnknownState};

//! In-memory connection directory.
//!
//! Keeps connections in a map, records every call and can be told to fail
//! or hang, which makes reconciliation deterministic to test.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use log::debug;

use super::{ConnectionDirectory, DirectoryError};
use crate::types::Connection;

/// A call received by [`MemoryDirectory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Lookup(String),
    Create(Connection),
    Delete(String),
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Call::Lookup(_))
    }
}

#[derive(Default)]
struct State {
    connections: HashMap<String, Connection>,
    calls: Vec<Call>,
    lookup_error: Option<String>,
    create_error: Option<String>,
    delete_error: Option<String>,
    stall_lookups: bool,
    stall_creates: bool,
}

#[derive(Default)]
pub struct MemoryDirectory {
    state: Mutex<State>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory that already holds `connections`.
    pub fn with_connections(connections: impl IntoIterator<Item = Connection>) -> Self {
        let dir = Self::new();
        {
            let mut state = dir.state();
            for conn in connections {
                state.connections.insert(conn.name.clone(), conn);
            }
        }
        dir
    }

    /// Make every lookup fail with `message`.
    pub fn fail_lookup(self, message: impl Into<String>) -> Self {
        self.state().lookup_error = Some(message.into());
        self
    }

    /// Make every create fail with `message`.
    pub fn fail_create(self, message: impl Into<String>) -> Self {
        self.state().create_error = Some(message.into());
        self
    }

    /// Make every delete fail with `message`.
    pub fn fail_delete(self, message: impl Into<String>) -> Self {
        self.state().delete_error = Some(message.into());
        self
    }

    /// Make every lookup wait forever.
    pub fn stall_lookups(self) -> Self {
        self.state().stall_lookups = true;
        self
    }

    /// Make every create wait forever after recording the call.
    pub fn stall_creates(self) -> Self {
        self.state().stall_creates = true;
        self
    }

    /// Stop injecting create failures.
    pub fn heal_create(&self) {
        self.state().create_error = None;
    }

    pub fn get(&self, name: &str) -> Option<Connection> {
        self.state().connections.get(name).cloned()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Recorded create and delete calls.
    pub fn mutations(&self) -> Vec<Call> {
        self.state()
            .calls
            .iter()
            .filter(|call| call.is_mutation())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ConnectionDirectory for MemoryDirectory {
    async fn lookup(&self, name: &str) -> Result<Option<Connection>, DirectoryError> {
        {
            let mut state = self.state();
            state.calls.push(Call::Lookup(name.to_string()));
            if let Some(message) = &state.lookup_error {
                return Err(DirectoryError::Rejected(message.clone()));
            }
            if !state.stall_lookups {
                return Ok(state.connections.get(name).cloned());
            }
        }
        debug!("Stalling lookup of {:?}", name);
        std::future::pending().await
    }

    async fn create(&self, connection: &Connection) -> Result<(), DirectoryError> {
        {
            let mut state = self.state();
            state.calls.push(Call::Create(connection.clone()));
            if let Some(message) = &state.create_error {
                return Err(DirectoryError::Rejected(message.clone()));
            }
            if !state.stall_creates {
                if state.connections.contains_key(&connection.name) {
                    return Err(DirectoryError::Rejected(format!(
                        "connection {:?} already exists",
                        connection.name
                    )));
                }
                state
                    .connections
                    .insert(connection.name.clone(), connection.clone());
                return Ok(());
            }
        }
        debug!("Stalling create of {:?}", connection.name);
        std::future::pending().await
    }

    async fn delete(&self, name: &str) -> Result<(), DirectoryError> {
        let mut state = self.state();
        state.calls.push(Call::Delete(name.to_string()));
        if let Some(message) = &state.delete_error {
            return Err(DirectoryError::Rejected(message.clone()));
        }
        match state.connections.remove(name) {
            Some(_) => Ok(()),
            None => Err(DirectoryError::Rejected(format!(
                "no such connection {:?}",
                name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_lookup() {
        let dir = MemoryDirectory::new();
        let conn = Connection::new("br0").with_kind("bridge");

        assert!(dir.lookup("br0").await.unwrap().is_none());
        dir.create(&conn).await.unwrap();
        assert_eq!(dir.lookup("br0").await.unwrap(), Some(conn.clone()));
        assert_eq!(
            dir.calls(),
            vec![
                Call::Lookup("br0".into()),
                Call::Create(conn),
                Call::Lookup("br0".into()),
            ]
        );
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let dir = MemoryDirectory::with_connections([Connection::new("br0")]);
        assert!(dir.create(&Connection::new("br0")).await.is_err());
    }

    #[tokio::test]
    async fn delete_missing_is_rejected() {
        let dir = MemoryDirectory::new();
        let err = dir.delete("nope").await.unwrap_err();
        assert_eq!(err.to_string(), r#"no such connection "nope""#);
    }

    #[tokio::test]
    async fn injected_failures() {
        let dir = MemoryDirectory::with_connections([Connection::new("a")])
            .fail_lookup("lookup boom")
            .fail_delete("delete boom");

        assert_eq!(dir.lookup("a").await.unwrap_err().to_string(), "lookup boom");
        assert_eq!(dir.delete("a").await.unwrap_err().to_string(), "delete boom");
        assert!(dir.get("a").is_some());
        assert_eq!(dir.mutations(), vec![Call::Delete("a".into())]);
    }

    #[tokio::test]
    async fn stalled_create_never_stores() {
        let dir = MemoryDirectory::new().stall_creates();
        let conn = Connection::new("a");
        let create = dir.create(&conn);
        assert!(
            tokio::time::timeout(std::time::Duration::from_millis(10), create)
                .await
                .is_err()
        );
        assert!(dir.get("a").is_none());
        assert_eq!(dir.mutations(), vec![Call::Create(Connection::new("a"))]);
    }

    #[tokio::test]
    async fn heal_create_clears_failure() {
        let dir = MemoryDirectory::new().fail_create("no");
        assert!(dir.create(&Connection::new("a")).await.is_err());
        dir.heal_create();
        assert!(dir.create(&Connection::new("a")).await.is_ok());
    }
}

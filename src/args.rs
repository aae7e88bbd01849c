//! Module arguments.
//!
//! Ansible runs binary modules with a single argument: the path of a JSON
//! file holding the task parameters plus its own `_ansible_*` keys, which
//! are ignored here.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::types::{null_as_empty, Connection, DesiredState, UnknownState};

#[derive(Debug, Error)]
pub enum ArgsError {
    #[error("no argument file provided")]
    NoArgumentFile,
    #[error("could not read argument file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("argument file {path:?} not valid JSON: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("missing connection name (con_name)")]
    MissingName,
    #[error(transparent)]
    UnknownState(#[from] UnknownState),
}

#[derive(Deserialize)]
struct RawArgs {
    #[serde(flatten)]
    connection: Connection,
    #[serde(default, deserialize_with = "null_as_empty")]
    state: String,
}

/// Validated task parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleArgs {
    pub connection: Connection,
    pub state: DesiredState,
}

impl ModuleArgs {
    /// Parse the process arguments, program name included.
    pub fn from_args(args: &[String]) -> Result<Self, ArgsError> {
        match args {
            [_, path] => Self::from_file(path),
            _ => Err(ArgsError::NoArgumentFile),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ArgsError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ArgsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw).map_err(|e| match e {
            ArgsError::InvalidJson { source, .. } => ArgsError::InvalidJson {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, ArgsError> {
        let raw: RawArgs = serde_json::from_str(raw).map_err(|source| ArgsError::InvalidJson {
            path: PathBuf::new(),
            source,
        })?;

        let state = raw.state.parse::<DesiredState>()?;
        if raw.connection.name.is_empty() {
            return Err(ArgsError::MissingName);
        }

        Ok(Self {
            connection: raw.connection,
            state,
        })
    }
}

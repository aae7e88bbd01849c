//! Data structures shared by the directory backends and the reconciler.
//!
//! A [`Connection`] holds only the attributes that identify a
//! NetworkManager connection profile.  Unset attributes are empty strings;
//! there is no distinction between "unset" and "empty".

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// A NetworkManager connection as far as reconciliation is concerned.
///
/// Two connections are equal when all four attributes match exactly. The
/// serde names follow the module argument keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// `connection.id`, the name used for lookups.
    #[serde(rename = "con_name", default, deserialize_with = "null_as_empty")]
    pub name: String,
    /// `connection.interface-name`
    #[serde(rename = "ifname", default, deserialize_with = "null_as_empty")]
    pub interface_name: String,
    /// `connection.type`, e.g. `ethernet`, `bridge` or `vlan`.
    #[serde(rename = "type", default, deserialize_with = "null_as_empty")]
    pub kind: String,
    /// `connection.master`, the controller connection if any.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub master: String,
}

impl Connection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_interface_name(mut self, interface_name: impl Into<String>) -> Self {
        self.interface_name = interface_name.into();
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_master(mut self, master: impl Into<String>) -> Self {
        self.master = master.into();
        self
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} (type={:?}, ifname={:?}, master={:?})",
            self.name, self.kind, self.interface_name, self.master
        )
    }
}

/// Ansible passes unset options as `null`.
pub(crate) fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Whether the connection should exist after reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesiredState {
    Present,
    Absent,
}

/// A state other than `present` or `absent`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown state {0:?}")]
pub struct UnknownState(pub String);

impl FromStr for DesiredState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(DesiredState::Present),
            "absent" => Ok(DesiredState::Absent),
            other => Err(UnknownState(other.to_string())),
        }
    }
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DesiredState::Present => write!(f, "present"),
            DesiredState::Absent => write!(f, "absent"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eth0() -> Connection {
        Connection::new("eth0")
            .with_kind("ethernet")
            .with_interface_name("eth0")
    }

    #[test]
    fn equal_when_all_fields_match() {
        assert_eq!(eth0(), eth0());
    }

    #[test]
    fn master_difference_breaks_equality() {
        assert_ne!(eth0(), eth0().with_master("br0"));
        assert_ne!(eth0().with_master("br0"), eth0());
    }

    #[test]
    fn each_field_participates() {
        let base = eth0();
        assert_ne!(base, Connection { name: "eth1".into(), ..base.clone() });
        assert_ne!(base, base.clone().with_kind("bridge"));
        assert_ne!(base, base.clone().with_interface_name("eth1"));
    }

    #[test]
    fn missing_keys_deserialize_as_empty() {
        let conn: Connection = serde_json::from_str(r#"{"con_name":"br0"}"#).unwrap();
        assert_eq!(conn, Connection::new("br0"));
    }

    #[test]
    fn deserializes_module_keys() {
        let conn: Connection = serde_json::from_str(
            r#"{"con_name":"eth0","ifname":"eth0","type":"ethernet","master":"br0"}"#,
        )
        .unwrap();
        assert_eq!(conn, eth0().with_master("br0"));
    }

    #[test]
    fn desired_state_parsing() {
        assert_eq!("present".parse(), Ok(DesiredState::Present));
        assert_eq!("absent".parse(), Ok(DesiredState::Absent));
        assert_eq!(
            "Present".parse::<DesiredState>(),
            Err(UnknownState("Present".to_string()))
        );
        assert_eq!(
            "".parse::<DesiredState>().unwrap_err().to_string(),
            r#"unknown state """#
        );
    }

    #[test]
    fn display_names_every_field() {
        let shown = eth0().with_master("br0").to_string();
        assert_eq!(
            shown,
            r#""eth0" (type="ethernet", ifname="eth0", master="br0")"#
        );
    }
}

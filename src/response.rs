//! Module result as consumed by Ansible.
//!
//! Exactly one JSON object is printed to stdout; the process exits with 1
//! when the result is a failure and 0 otherwise.

use std::fmt;
use std::process::ExitCode;

use serde::Serialize;

use crate::reconcile::Outcome;

/// Printed when the response itself cannot be serialized.
const INVALID_RESPONSE: &str = r#"{"changed":false,"msg":"Invalid response object","failed":true}"#;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Response {
    #[serde(rename = "msg")]
    pub message: String,
    pub changed: bool,
    pub failed: bool,
}

impl Response {
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            changed: false,
            failed: true,
        }
    }

    pub fn fail_with(context: &str, err: impl fmt::Display) -> Self {
        Self::fail(format!("{}: {}", context, err))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| INVALID_RESPONSE.to_string())
    }

    pub fn exit_status(&self) -> u8 {
        u8::from(self.failed)
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }

    /// Print the response and return the matching exit code.
    pub fn emit(&self) -> ExitCode {
        println!("{}", self.to_json());
        self.exit_code()
    }
}

impl From<Outcome> for Response {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Unchanged => Response::default(),
            Outcome::Changed => Response {
                changed: true,
                ..Default::default()
            },
            Outcome::Failed(e) => Response::fail(e.to_string()),
        }
    }
}

//! Connection directory backed by the `nmcli` command line tool.
//!
//! Lookups use terse tabular output restricted to a fixed field list, so
//! stdout carries one value per line in [`LOOKUP_FIELDS`] order.  `nmcli`
//! signals a missing connection only through its exit code, which is
//! therefore configurable.

use std::io;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::process::Command;

use super::{ConnectionDirectory, DirectoryError};
use crate::types::Connection;

/// Fields requested on lookup, in the order they are printed.
pub const LOOKUP_FIELDS: &str =
    "connection.id,connection.type,connection.interface-name,connection.master";
const LOOKUP_FIELD_COUNT: usize = 4;

/// Exit code `nmcli` uses when the requested connection does not exist.
pub const DEFAULT_NOT_FOUND_EXIT_CODE: i32 = 10;

/// Captured result of one process invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr).trim().to_string()
    }
}

/// Runs external programs on behalf of [`NmcliDirectory`].
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput>;
}

/// Spawns real processes. The child is killed if the future is dropped,
/// e.g. when the reconciliation deadline expires.
pub struct TokioRunner;

#[async_trait]
impl CommandRunner for TokioRunner {
    async fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        let output = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await?;
        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

pub struct NmcliDirectory<R = TokioRunner> {
    program: String,
    not_found_exit_code: i32,
    runner: R,
}

impl NmcliDirectory<TokioRunner> {
    pub fn new(program: impl Into<String>, not_found_exit_code: i32) -> Self {
        Self::with_runner(program, not_found_exit_code, TokioRunner)
    }
}

impl<R: CommandRunner> NmcliDirectory<R> {
    pub fn with_runner(program: impl Into<String>, not_found_exit_code: i32, runner: R) -> Self {
        Self {
            program: program.into(),
            not_found_exit_code,
            runner,
        }
    }

    fn command_line(&self, args: &[String]) -> String {
        let mut line = self.program.clone();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// Run `nmcli` and return its output regardless of exit status.
    async fn invoke(&self, args: &[String]) -> Result<CommandOutput, DirectoryError> {
        debug!("Running `{}`", self.command_line(args));
        self.runner
            .run(&self.program, args)
            .await
            .map_err(|source| DirectoryError::Spawn {
                command: self.command_line(args),
                source,
            })
    }

    fn command_error(&self, args: &[String], output: &CommandOutput) -> DirectoryError {
        let status = match output.code {
            Some(code) => format!("exit code {}", code),
            None => "no exit code (terminated by signal)".to_string(),
        };
        warn!("`{}` failed with {}", self.command_line(args), status);
        DirectoryError::Command {
            command: self.command_line(args),
            status,
            output: output.combined(),
        }
    }

    /// Run `nmcli` and require a zero exit status.
    async fn invoke_checked(&self, args: &[String]) -> Result<CommandOutput, DirectoryError> {
        let output = self.invoke(args).await?;
        if !output.success() {
            return Err(self.command_error(args, &output));
        }
        Ok(output)
    }
}

fn lookup_args(name: &str) -> Vec<String> {
    [
        "-terse",
        "-mode",
        "tabular",
        "--fields",
        LOOKUP_FIELDS,
        "connection",
        "show",
        name,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn create_args(connection: &Connection) -> Vec<String> {
    let mut args = vec!["connection".to_string(), "add".to_string()];
    let pairs = [
        ("con-name", &connection.name),
        ("ifname", &connection.interface_name),
        ("type", &connection.kind),
        ("master", &connection.master),
    ];
    for (key, value) in pairs {
        if !value.is_empty() {
            args.push(key.to_string());
            args.push(value.clone());
        }
    }
    args
}

fn delete_args(name: &str) -> Vec<String> {
    vec!["connection".into(), "delete".into(), name.to_string()]
}

/// Several profiles sharing the name print their fields back to back, so
/// anything but exactly one set of fields is rejected.
fn parse_lookup(stdout: &str) -> Result<Connection, String> {
    let fields: Vec<&str> = stdout.lines().collect();
    match fields[..] {
        [name, kind, interface_name, master] => Ok(Connection {
            name: name.to_string(),
            kind: kind.to_string(),
            interface_name: interface_name.to_string(),
            master: master.to_string(),
        }),
        _ if fields.len() > LOOKUP_FIELD_COUNT => Err(format!(
            "expected {} fields, got {}; several connections share the name",
            LOOKUP_FIELD_COUNT,
            fields.len()
        )),
        _ => Err(format!(
            "expected {} fields, got {}",
            LOOKUP_FIELD_COUNT,
            fields.len()
        )),
    }
}

#[async_trait]
impl<R: CommandRunner> ConnectionDirectory for NmcliDirectory<R> {
    async fn lookup(&self, name: &str) -> Result<Option<Connection>, DirectoryError> {
        let args = lookup_args(name);
        let output = self.invoke(&args).await?;

        if output.code == Some(self.not_found_exit_code) {
            debug!("Connection {:?} does not exist", name);
            return Ok(None);
        }
        if !output.success() {
            return Err(self.command_error(&args, &output));
        }

        parse_lookup(&output.stdout)
            .map(Some)
            .map_err(|reason| DirectoryError::MalformedOutput {
                command: self.command_line(&args),
                reason,
            })
    }

    async fn create(&self, connection: &Connection) -> Result<(), DirectoryError> {
        self.invoke_checked(&create_args(connection)).await?;
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), DirectoryError> {
        self.invoke_checked(&delete_args(name)).await?;
        Ok(())
    }
}

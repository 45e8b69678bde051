//! Job spawning: how a command becomes a child process.
//!
//! The input stream carries raw shell lines, so the default mode hands each
//! line verbatim to `/bin/sh -c`. Embedders that already hold an argument
//! vector can use [`JobCommand::Argv`] to skip the shell entirely.

use std::fmt;

use thiserror::Error;
use tokio::process::{Child, Command};

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("failed to spawn process: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("empty argument vector")]
    EmptyArgv,
}

/// How to start a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobCommand {
    /// A raw command line, executed verbatim through `/bin/sh -c`.
    /// Arbitrary shell syntax is supported and passed through untouched.
    Shell(String),
    /// An explicit argument vector, executed directly without a shell.
    Argv(Vec<String>),
}

impl JobCommand {
    pub fn shell(line: impl Into<String>) -> Self {
        Self::Shell(line.into())
    }

    pub fn argv(args: Vec<String>) -> Self {
        Self::Argv(args)
    }

    fn build(&self) -> Result<Command, SpawnError> {
        match self {
            JobCommand::Shell(line) => {
                let mut cmd = Command::new("/bin/sh");
                cmd.arg("-c").arg(line);
                Ok(cmd)
            }
            JobCommand::Argv(args) => {
                let (program, rest) = args.split_first().ok_or(SpawnError::EmptyArgv)?;
                let mut cmd = Command::new(program);
                cmd.args(rest);
                Ok(cmd)
            }
        }
    }
}

impl fmt::Display for JobCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobCommand::Shell(line) => f.write_str(line),
            JobCommand::Argv(args) => f.write_str(&args.join(" ")),
        }
    }
}

/// Extension point for different job spawn strategies.
///
/// [`ProcessSpawner`] is the production implementation; tests substitute
/// recording or failing spawners to drive the dispatcher without real work.
pub trait JobSpawner: Send + Sync {
    fn spawn(&self, job: &JobCommand) -> Result<Child, SpawnError>;
}

/// Spawns jobs as OS processes inheriting the launcher's standard streams.
/// Job output is deliberately not captured.
pub struct ProcessSpawner;

impl JobSpawner for ProcessSpawner {
    fn spawn(&self, job: &JobCommand) -> Result<Child, SpawnError> {
        let child = job.build()?.spawn()?;
        Ok(child)
    }
}

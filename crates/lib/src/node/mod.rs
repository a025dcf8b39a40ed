//! Remote execution.
//!
//! Items never talk to a host directly. They hand shell commands to a
//! [`Node`], which runs them somewhere (the local machine, a host reached over
//! SSH, or a test double) and reports back a [`RunResult`].
//!
//! # Failure semantics
//!
//! Every call states whether a non-zero exit is expected:
//!
//! - `may_fail = false`: a non-zero exit is an [`ExecutionError::CommandFailed`].
//! - `may_fail = true`: the result is returned whatever the exit code, so the
//!   caller can read a negative answer (e.g. "package not installed") out of it.
//!
//! Failing to start the command at all is always an error.

mod local;
mod ssh;

pub use local::LocalNode;
pub use ssh::SshNode;

use std::process::Output;

use thiserror::Error;
use tracing::debug;

/// Errors surfaced by a [`Node`].
#[derive(Debug, Error)]
pub enum ExecutionError {
  /// A command that was not allowed to fail exited non-zero.
  #[error("command failed with exit code {exit_code} on {node}: {command}")]
  CommandFailed {
    node: String,
    command: String,
    exit_code: i32,
    stderr: String,
  },

  /// The command could not be started.
  #[error("failed to spawn command on {node}: {command}: {source}")]
  Spawn {
    node: String,
    command: String,
    #[source]
    source: std::io::Error,
  },
}

/// Outcome of a finished command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunResult {
  /// Exit code; `-1` if the process was terminated by a signal.
  pub exit_code: i32,
  pub stdout: String,
  pub stderr: String,
}

impl RunResult {
  pub fn success(&self) -> bool {
    self.exit_code == 0
  }
}

/// A target host that can run shell commands.
pub trait Node {
  /// Name used in logs and errors.
  fn name(&self) -> &str;

  /// Run `command` through a POSIX shell and wait for it to finish.
  fn run(&self, command: &str, may_fail: bool) -> Result<RunResult, ExecutionError>;
}

/// Turn a finished process into a [`RunResult`], enforcing `may_fail`.
pub(crate) fn finish(node: &str, command: &str, output: Output, may_fail: bool) -> Result<RunResult, ExecutionError> {
  let result = RunResult {
    exit_code: output.status.code().unwrap_or(-1),
    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
  };

  debug!(node = %node, exit_code = result.exit_code, "command finished");

  check(node, command, result, may_fail)
}

/// Apply the `may_fail` contract to an already collected result.
pub fn check(node: &str, command: &str, result: RunResult, may_fail: bool) -> Result<RunResult, ExecutionError> {
  if result.success() || may_fail {
    return Ok(result);
  }

  if !result.stderr.is_empty() {
    debug!(stderr = %result.stderr, "command stderr");
  }

  Err(ExecutionError::CommandFailed {
    node: node.to_string(),
    command: command.to_string(),
    exit_code: result.exit_code,
    stderr: result.stderr,
  })
}

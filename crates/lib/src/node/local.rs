//! Execution on the machine running `cvg`.

use std::process::Command;

use tracing::debug;

use super::{ExecutionError, Node, RunResult, finish};

/// Runs commands locally through `/bin/sh -c`.
///
/// The parent environment is inherited, except that the locale is pinned to
/// `C` so command output can be parsed reliably.
#[derive(Debug, Clone)]
pub struct LocalNode {
  name: String,
  shell: String,
}

impl LocalNode {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      shell: "/bin/sh".to_string(),
    }
  }

  /// Use a different POSIX shell, e.g. `/bin/bash`.
  pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
    self.shell = shell.into();
    self
  }
}

impl Node for LocalNode {
  fn name(&self) -> &str {
    &self.name
  }

  fn run(&self, command: &str, may_fail: bool) -> Result<RunResult, ExecutionError> {
    debug!(node = %self.name, cmd = %command, may_fail, "running local command");

    let output = Command::new(&self.shell)
      .arg("-c")
      .arg(command)
      .env("LANG", "C")
      .env("LC_ALL", "C")
      .output()
      .map_err(|source| ExecutionError::Spawn {
        node: self.name.clone(),
        command: command.to_string(),
        source,
      })?;

    finish(&self.name, command, output, may_fail)
  }
}

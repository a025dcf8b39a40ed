//! Execution on a remote host through the system `ssh` client.
//!
//! Authentication, host key handling and connection reuse are left to the
//! user's ssh configuration. `BatchMode` is forced so a missing key fails
//! instead of hanging on a password prompt.

use std::process::Command;

use tracing::debug;

use super::{ExecutionError, Node, RunResult, finish};
use crate::util::shell::quote;

#[derive(Debug, Clone)]
pub struct SshNode {
  name: String,
  hostname: String,
  user: Option<String>,
  port: Option<u16>,
}

impl SshNode {
  pub fn new(name: impl Into<String>, hostname: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      hostname: hostname.into(),
      user: None,
      port: None,
    }
  }

  pub fn with_user(mut self, user: impl Into<String>) -> Self {
    self.user = Some(user.into());
    self
  }

  pub fn with_port(mut self, port: u16) -> Self {
    self.port = Some(port);
    self
  }

  /// Arguments passed to `ssh` for `command`.
  fn ssh_args(&self, command: &str) -> Vec<String> {
    let mut args = vec!["-o".to_string(), "BatchMode=yes".to_string()];
    if let Some(port) = self.port {
      args.push("-p".to_string());
      args.push(port.to_string());
    }
    let target = match &self.user {
      Some(user) => format!("{}@{}", user, self.hostname),
      None => self.hostname.clone(),
    };
    args.push(target);
    args.push("--".to_string());
    args.push(format!("LANG=C LC_ALL=C sh -c {}", quote(command)));
    args
  }
}

impl Node for SshNode {
  fn name(&self) -> &str {
    &self.name
  }

  fn run(&self, command: &str, may_fail: bool) -> Result<RunResult, ExecutionError> {
    debug!(node = %self.name, host = %self.hostname, cmd = %command, may_fail, "running remote command");

    let output = Command::new("ssh")
      .args(self.ssh_args(command))
      .output()
      .map_err(|source| ExecutionError::Spawn {
        node: self.name.clone(),
        command: command.to_string(),
        source,
      })?;

    finish(&self.name, command, output, may_fail)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn args_wrap_command_in_quoted_shell() {
    let node = SshNode::new("web1", "web1.example.com");
    assert_eq!(
      node.ssh_args("dpkg -s 'foo' | grep x"),
      vec![
        "-o",
        "BatchMode=yes",
        "web1.example.com",
        "--",
        r#"LANG=C LC_ALL=C sh -c 'dpkg -s '"'"'foo'"'"' | grep x'"#,
      ]
    );
  }

  #[test]
  fn args_include_user_and_port() {
    let node = SshNode::new("db", "10.0.0.5").with_user("deploy").with_port(2222);
    let args = node.ssh_args("true");
    assert_eq!(&args[..5], &["-o", "BatchMode=yes", "-p", "2222", "deploy@10.0.0.5"]);
  }
}

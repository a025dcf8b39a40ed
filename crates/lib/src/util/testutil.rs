//! Test doubles for converge-lib.
//!
//! - [`FakeHost`]: a [`Node`] that keeps a set of installed packages and
//!   understands the apt and zypper commands issued by package items.
//! - [`StubItem`]: an item with configurable metadata and no-op behaviour,
//!   for graph tests.

use std::cell::RefCell;
use std::collections::BTreeSet;

use crate::item::{Dependencies, DependencySpec, Item, ItemDescriptor, ItemStatus};
use crate::node::{ExecutionError, Node, RunResult, check};

/// A host with an in-memory package database.
pub struct FakeHost {
  name: String,
  packages: RefCell<BTreeSet<String>>,
  commands: RefCell<Vec<String>>,
  broken: bool,
}

impl FakeHost {
  pub fn new(installed: &[&str]) -> Self {
    Self {
      name: "fake".to_string(),
      packages: RefCell::new(installed.iter().map(|p| p.to_string()).collect()),
      commands: RefCell::new(Vec::new()),
      broken: false,
    }
  }

  /// A host whose package manager fails every install and remove.
  pub fn broken(installed: &[&str]) -> Self {
    Self {
      broken: true,
      ..Self::new(installed)
    }
  }

  pub fn is_installed(&self, package: &str) -> bool {
    self.packages.borrow().contains(package)
  }

  /// Every command run so far, in order.
  pub fn commands(&self) -> Vec<String> {
    self.commands.borrow().clone()
  }

  fn exit(code: i32, stdout: &str) -> RunResult {
    RunResult {
      exit_code: code,
      stdout: stdout.to_string(),
      stderr: String::new(),
    }
  }

  fn change(&self, package: &str, install: bool) -> RunResult {
    if self.broken {
      return RunResult {
        exit_code: 100,
        stdout: String::new(),
        stderr: "E: Could not get lock".to_string(),
      };
    }
    let mut packages = self.packages.borrow_mut();
    if install {
      packages.insert(package.to_string());
    } else {
      packages.remove(package);
    }
    Self::exit(0, "")
  }

  fn respond(&self, command: &str) -> RunResult {
    let words: Vec<&str> = command.split_whitespace().collect();
    let last = words.last().copied().unwrap_or_default();

    match words.as_slice() {
      ["dpkg", "-s", package, ..] => {
        if self.is_installed(package) {
          Self::exit(0, "Status: install ok installed\n")
        } else {
          Self::exit(1, "")
        }
      }
      ["zypper", "-q", "se", "-i", ..] => {
        if self.is_installed(last) {
          Self::exit(0, &format!("i | {} | package\n", last))
        } else {
          Self::exit(104, "No matching items found.\n")
        }
      }
      ["apt-get", .., "install", _] | ["zypper", "-q", "-n", "install", _] => self.change(last, true),
      ["apt-get", .., "purge", _] | ["zypper", "-q", "-n", "remove", _] => self.change(last, false),
      _ => Self::exit(127, ""),
    }
  }
}

impl Node for FakeHost {
  fn name(&self) -> &str {
    &self.name
  }

  fn run(&self, command: &str, may_fail: bool) -> Result<RunResult, ExecutionError> {
    self.commands.borrow_mut().push(command.to_string());
    let result = self.respond(command);
    check(&self.name, command, result, may_fail)
  }
}

pub const SERVICE: ItemDescriptor = ItemDescriptor {
  type_name: "svc",
  needs_static: &["pkg"],
  parallel_apply: true,
};

pub const PKG: ItemDescriptor = ItemDescriptor {
  type_name: "pkg",
  needs_static: &[],
  parallel_apply: false,
};

pub const FILE: ItemDescriptor = ItemDescriptor {
  type_name: "file",
  needs_static: &[],
  parallel_apply: true,
};

/// An item that is always correct and does nothing.
#[derive(Debug)]
pub struct StubItem {
  descriptor: &'static ItemDescriptor,
  name: String,
  dependencies: Dependencies,
}

impl StubItem {
  pub fn new(descriptor: &'static ItemDescriptor, name: &str) -> Self {
    Self {
      descriptor,
      name: name.to_string(),
      dependencies: Dependencies::default(),
    }
  }

  pub fn needs(mut self, raw: &str) -> Self {
    let spec = DependencySpec::parse(&self.id(), raw).unwrap();
    self.dependencies.needs.push(spec);
    self
  }

  pub fn needed_by(mut self, raw: &str) -> Self {
    let spec = DependencySpec::parse(&self.id(), raw).unwrap();
    self.dependencies.needed_by.push(spec);
    self
  }

  pub fn boxed(self) -> Box<dyn Item> {
    Box::new(self)
  }
}

impl Item for StubItem {
  fn descriptor(&self) -> &'static ItemDescriptor {
    self.descriptor
  }

  fn name(&self) -> &str {
    &self.name
  }

  fn dependencies(&self) -> &Dependencies {
    &self.dependencies
  }

  fn inspect(&self, _node: &dyn Node) -> Result<ItemStatus, ExecutionError> {
    Ok(ItemStatus::new(true, []))
  }

  fn describe(&self, _status: &ItemStatus) -> String {
    String::new()
  }

  fn fix(&self, _node: &dyn Node, _status: &ItemStatus) -> Result<(), ExecutionError> {
    Ok(())
  }
}

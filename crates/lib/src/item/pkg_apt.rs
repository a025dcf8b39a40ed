//! Debian packages, queried with dpkg and changed with apt-get.

use super::ItemDescriptor;
use super::pkg::{Package, PackageManager};
use crate::node::RunResult;
use crate::util::shell::quote;

static DESCRIPTOR: ItemDescriptor = ItemDescriptor {
  type_name: "pkg_apt",
  needs_static: &[],
  parallel_apply: false,
};

pub struct Apt;

impl PackageManager for Apt {
  fn descriptor() -> &'static ItemDescriptor {
    &DESCRIPTOR
  }

  fn query_command(package: &str) -> String {
    format!("dpkg -s {} | grep '^Status: '", quote(package))
  }

  fn is_installed(result: &RunResult) -> bool {
    result.success() && result.stdout.contains(" installed")
  }

  fn install_command(package: &str) -> String {
    format!("apt-get -qy --no-install-recommends install {}", quote(package))
  }

  fn remove_command(package: &str) -> String {
    format!("apt-get -qy purge {}", quote(package))
  }
}

/// A package installed by apt.
pub type AptPkg = Package<Apt>;

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use super::*;
  use crate::item::{Item, ItemStatus, ItemType};
  use crate::util::testutil::FakeHost;
  use crate::value::ConfigValue;

  fn pkg(name: &str, installed: bool) -> AptPkg {
    let attributes = BTreeMap::from([("installed".to_string(), ConfigValue::Bool(installed))]);
    AptPkg::from_config(name, &attributes).unwrap()
  }

  fn run_result(exit_code: i32, stdout: &str) -> RunResult {
    RunResult {
      exit_code,
      stdout: stdout.to_string(),
      stderr: String::new(),
    }
  }

  #[test]
  fn query_result_interpretation() {
    assert!(Apt::is_installed(&run_result(0, "Status: install ok installed\n")));
    assert!(!Apt::is_installed(&run_result(0, "Status: deinstall ok config-files\n")));
    assert!(!Apt::is_installed(&run_result(1, "")));
  }

  #[test]
  fn commands_quote_package_names() {
    assert_eq!(Apt::query_command("foo"), "dpkg -s foo | grep '^Status: '");
    assert_eq!(
      Apt::install_command("foo bar"),
      "apt-get -qy --no-install-recommends install 'foo bar'"
    );
    assert_eq!(Apt::remove_command("foo"), "apt-get -qy purge foo");
  }

  #[test]
  fn describe_install() {
    let status = ItemStatus::new(false, [("installed".to_string(), ConfigValue::Bool(false))]);
    assert_eq!(pkg("foo", true).describe(&status), "status not installed → installed\n");
  }

  #[test]
  fn describe_remove() {
    let status = ItemStatus::new(false, [("installed".to_string(), ConfigValue::Bool(true))]);
    assert_eq!(pkg("foo", false).describe(&status), "status installed → not installed\n");
  }

  #[test]
  fn inspect_reports_correctness() {
    let host = FakeHost::new(&["foo"]);
    assert!(pkg("foo", true).inspect(&host).unwrap().correct);
    assert!(!pkg("foo", false).inspect(&host).unwrap().correct);

    let empty = FakeHost::new(&[]);
    assert!(pkg("foo", false).inspect(&empty).unwrap().correct);
    assert!(!pkg("foo", true).inspect(&empty).unwrap().correct);
  }

  #[test]
  fn inspect_is_idempotent() {
    let host = FakeHost::new(&[]);
    let item = pkg("foo", true);

    let first = item.inspect(&host).unwrap();
    let second = item.inspect(&host).unwrap();

    assert_eq!(first, second);
    assert!(!host.is_installed("foo"));
  }

  #[test]
  fn fix_removes_when_not_wanted() {
    let host = FakeHost::new(&["foo"]);
    let item = pkg("foo", false);
    let status = item.inspect(&host).unwrap();

    item.fix(&host, &status).unwrap();

    assert!(!host.is_installed("foo"));
    assert_eq!(host.commands().last().unwrap(), "apt-get -qy purge foo");
  }

  #[test]
  fn install_then_reinspect_end_to_end() {
    let host = FakeHost::new(&[]);
    let item = pkg("foo", true);

    let status = item.inspect(&host).unwrap();
    assert_eq!(status, ItemStatus::new(false, [("installed".to_string(), ConfigValue::Bool(false))]));

    let preview = item.describe(&status);
    assert!(preview.trim_end().ends_with("not installed → installed"));

    item.fix(&host, &status).unwrap();
    assert!(host.commands().contains(&"apt-get -qy --no-install-recommends install foo".to_string()));

    let after = item.inspect(&host).unwrap();
    assert_eq!(after, ItemStatus::new(true, [("installed".to_string(), ConfigValue::Bool(true))]));
  }

  #[test]
  fn failed_install_is_an_execution_error() {
    let host = FakeHost::broken(&[]);
    let item = pkg("foo", true);
    let status = item.inspect(&host).unwrap();

    assert!(item.fix(&host, &status).is_err());
    assert!(!host.is_installed("foo"));
  }
}

//! SUSE packages, managed with zypper.

use super::ItemDescriptor;
use super::pkg::{Package, PackageManager};
use crate::node::RunResult;
use crate::util::shell::quote;

static DESCRIPTOR: ItemDescriptor = ItemDescriptor {
  type_name: "pkg_zypper",
  needs_static: &[],
  parallel_apply: false,
};

const ZYPPER: &str = "zypper -q -n";

pub struct Zypper;

impl PackageManager for Zypper {
  fn descriptor() -> &'static ItemDescriptor {
    &DESCRIPTOR
  }

  fn query_command(package: &str) -> String {
    format!("zypper -q se -i --match-exact {}", quote(package))
  }

  /// zypper exits 104 when nothing matched.
  fn is_installed(result: &RunResult) -> bool {
    result.success()
  }

  fn install_command(package: &str) -> String {
    format!("{} install {}", ZYPPER, quote(package))
  }

  fn remove_command(package: &str) -> String {
    format!("{} remove {}", ZYPPER, quote(package))
  }
}

/// A package installed by zypper.
pub type ZypperPkg = Package<Zypper>;

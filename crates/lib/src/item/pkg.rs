//! Package items.
//!
//! All package managers share one reconciliation flow: ask the manager
//! whether the package is installed, compare with the `installed` attribute,
//! then install or remove. [`Package`] implements that flow once; each
//! manager only supplies its command vocabulary through [`PackageManager`].

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use tracing::{debug, info};

use super::{Dependencies, Item, ItemDescriptor, ItemId, ItemStatus, ItemType, ValidationError};
use crate::node::{ExecutionError, Node, RunResult};
use crate::value::ConfigValue;

/// Command vocabulary of a package manager.
pub trait PackageManager: 'static {
  fn descriptor() -> &'static ItemDescriptor;

  /// Command that reports whether `package` is installed. Run with
  /// `may_fail`, since "not installed" usually means a non-zero exit.
  fn query_command(package: &str) -> String;

  /// Interpret the result of [`PackageManager::query_command`].
  fn is_installed(result: &RunResult) -> bool;

  fn install_command(package: &str) -> String;

  fn remove_command(package: &str) -> String;
}

/// Validated attributes of a package item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageAttributes {
  /// Whether the package should be present. Defaults to `true`.
  pub installed: bool,
}

impl Default for PackageAttributes {
  fn default() -> Self {
    Self { installed: true }
  }
}

/// Check package attributes: only `installed`, and only as a boolean.
pub fn validate_package_attributes(
  id: &ItemId,
  attributes: &BTreeMap<String, ConfigValue>,
) -> Result<PackageAttributes, ValidationError> {
  let mut validated = PackageAttributes::default();

  for (key, value) in attributes {
    match key.as_str() {
      "installed" => {
        validated.installed = value.as_bool().ok_or_else(|| ValidationError::InvalidAttribute {
          item: id.clone(),
          attribute: key.clone(),
          expected: "boolean",
          found: value.kind(),
        })?;
      }
      _ => {
        return Err(ValidationError::UnknownAttribute {
          item: id.clone(),
          attribute: key.clone(),
        });
      }
    }
  }

  Ok(validated)
}

/// Ask `node` whether `package` is installed.
pub fn package_installed<M: PackageManager>(node: &dyn Node, package: &str) -> Result<bool, ExecutionError> {
  let result = node.run(&M::query_command(package), true)?;
  let installed = M::is_installed(&result);
  debug!(node = %node.name(), package = %package, installed, "queried package");
  Ok(installed)
}

/// A package managed by `M`.
pub struct Package<M> {
  name: String,
  attributes: PackageAttributes,
  dependencies: Dependencies,
  manager: PhantomData<M>,
}

impl<M: PackageManager> Package<M> {
  pub fn attributes(&self) -> &PackageAttributes {
    &self.attributes
  }
}

impl<M: PackageManager> fmt::Debug for Package<M> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Package")
      .field("type", &M::descriptor().type_name)
      .field("name", &self.name)
      .field("installed", &self.attributes.installed)
      .finish()
  }
}

fn install_state(installed: bool) -> &'static str {
  if installed { "installed" } else { "not installed" }
}

impl<M: PackageManager> Item for Package<M> {
  fn descriptor(&self) -> &'static ItemDescriptor {
    M::descriptor()
  }

  fn name(&self) -> &str {
    &self.name
  }

  fn dependencies(&self) -> &Dependencies {
    &self.dependencies
  }

  fn inspect(&self, node: &dyn Node) -> Result<ItemStatus, ExecutionError> {
    let installed = package_installed::<M>(node, &self.name)?;
    Ok(ItemStatus::new(
      installed == self.attributes.installed,
      [("installed".to_string(), ConfigValue::Bool(installed))],
    ))
  }

  fn describe(&self, status: &ItemStatus) -> String {
    let before = status
      .info
      .get("installed")
      .and_then(ConfigValue::as_bool)
      .unwrap_or(false);
    format!(
      "status {} → {}\n",
      install_state(before),
      install_state(self.attributes.installed)
    )
  }

  fn fix(&self, node: &dyn Node, _status: &ItemStatus) -> Result<(), ExecutionError> {
    let command = if self.attributes.installed {
      M::install_command(&self.name)
    } else {
      M::remove_command(&self.name)
    };
    info!(node = %node.name(), item = %self.id(), "fixing package");
    node.run(&command, false)?;
    Ok(())
  }
}

impl<M: PackageManager> ItemType for Package<M> {
  type Attributes = PackageAttributes;

  fn type_descriptor() -> &'static ItemDescriptor {
    M::descriptor()
  }

  fn validate(id: &ItemId, attributes: &BTreeMap<String, ConfigValue>) -> Result<Self::Attributes, ValidationError> {
    validate_package_attributes(id, attributes)
  }

  fn from_parts(name: String, attributes: Self::Attributes, dependencies: Dependencies) -> Self {
    Self {
      name,
      attributes,
      dependencies,
      manager: PhantomData,
    }
  }
}

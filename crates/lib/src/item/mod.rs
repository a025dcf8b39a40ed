//! The item reconciliation contract.
//!
//! An item is a typed, named unit of desired state on a node (e.g. "package
//! `nginx` is installed"). Every item kind implements the same four steps:
//!
//! - **validate** ([`ItemType::validate`]): check attributes at load time,
//!   before anything touches a node
//! - **inspect** ([`Item::inspect`]): query the node and compare actual
//!   against desired state
//! - **describe** ([`Item::describe`]): render a before → after preview
//! - **fix** ([`Item::fix`]): change the node towards the desired state
//!
//! # Submodules
//!
//! - [`lifecycle`] - per-run state machine driving a single item
//! - [`pkg`] - package items, generic over the package manager
//! - [`registry`] - maps type names from configuration to constructors

pub mod lifecycle;
pub mod pkg;
pub mod pkg_apt;
pub mod pkg_zypper;
pub mod registry;
mod types;

pub use registry::ItemRegistry;
pub use types::*;

use std::collections::BTreeMap;
use std::fmt;

use crate::node::{ExecutionError, Node};
use crate::value::ConfigValue;

/// Behaviour shared by all item kinds, usable as a trait object.
pub trait Item: fmt::Debug {
  /// Type-level metadata.
  fn descriptor(&self) -> &'static ItemDescriptor;

  /// Instance name, unique within the type.
  fn name(&self) -> &str;

  /// Dependencies declared on this instance.
  fn dependencies(&self) -> &Dependencies;

  fn id(&self) -> ItemId {
    ItemId::new(self.descriptor().type_name, self.name())
  }

  /// Query the node for the actual state.
  ///
  /// Must not change the node. Calling it twice without anything else
  /// changing the node yields equal statuses.
  fn inspect(&self, node: &dyn Node) -> Result<ItemStatus, ExecutionError>;

  /// Human-readable preview of what [`Item::fix`] would change.
  ///
  /// Pure: depends only on `status` and the desired attributes.
  fn describe(&self, status: &ItemStatus) -> String;

  /// Drive the node towards the desired state.
  ///
  /// Not transactional: a failure part-way leaves the node as it is.
  fn fix(&self, node: &dyn Node, status: &ItemStatus) -> Result<(), ExecutionError>;
}

/// Construction side of an item kind.
pub trait ItemType: Item + Sized + 'static {
  /// Validated, type-specific attributes.
  type Attributes;

  fn type_descriptor() -> &'static ItemDescriptor;

  /// Check type-specific attributes. Never coerces: a value of the wrong type
  /// is an error.
  fn validate(id: &ItemId, attributes: &BTreeMap<String, ConfigValue>) -> Result<Self::Attributes, ValidationError>;

  fn from_parts(name: String, attributes: Self::Attributes, dependencies: Dependencies) -> Self;

  /// Build an item from its merged configuration table.
  fn from_config(name: &str, attributes: &BTreeMap<String, ConfigValue>) -> Result<Self, ValidationError> {
    let type_name = Self::type_descriptor().type_name;
    if name.trim().is_empty() {
      return Err(ValidationError::InvalidName {
        type_name: type_name.to_string(),
        name: name.to_string(),
      });
    }

    let id = ItemId::new(type_name, name);
    let (dependencies, rest) = Dependencies::extract(&id, attributes)?;
    let validated = Self::validate(&id, &rest)?;
    Ok(Self::from_parts(name.to_string(), validated, dependencies))
  }
}

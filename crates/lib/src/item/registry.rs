//! Item type registry.
//!
//! Configuration names item types by string (`[items.pkg_apt.nginx]`). The
//! registry maps those names to constructors.

use std::collections::BTreeMap;

use super::pkg_apt::AptPkg;
use super::pkg_zypper::ZypperPkg;
use super::{Item, ItemType, ValidationError};
use crate::value::ConfigValue;

type Constructor = fn(&str, &BTreeMap<String, ConfigValue>) -> Result<Box<dyn Item>, ValidationError>;

fn construct<T: ItemType>(name: &str, attributes: &BTreeMap<String, ConfigValue>) -> Result<Box<dyn Item>, ValidationError> {
  Ok(Box::new(T::from_config(name, attributes)?))
}

#[derive(Debug, Clone, Default)]
pub struct ItemRegistry {
  constructors: BTreeMap<&'static str, Constructor>,
}

impl ItemRegistry {
  /// An empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// A registry with every built-in item type.
  pub fn builtin() -> Self {
    let mut registry = Self::new();
    registry.register::<AptPkg>();
    registry.register::<ZypperPkg>();
    registry
  }

  pub fn register<T: ItemType>(&mut self) {
    self
      .constructors
      .insert(T::type_descriptor().type_name, construct::<T>);
  }

  pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
    self.constructors.keys().copied()
  }

  /// Construct and validate an item of type `type_name`.
  pub fn create(
    &self,
    type_name: &str,
    name: &str,
    attributes: &BTreeMap<String, ConfigValue>,
  ) -> Result<Box<dyn Item>, ValidationError> {
    let constructor = self
      .constructors
      .get(type_name)
      .ok_or_else(|| ValidationError::UnknownItemType(type_name.to_string()))?;
    constructor(name, attributes)
  }
}

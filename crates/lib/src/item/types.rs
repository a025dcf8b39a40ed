//! Identity, metadata and status types shared by all item kinds.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::value::ConfigValue;

/// Attribute keys every item type understands, handled before type-specific
/// validation.
pub const COMMON_ATTRIBUTES: &[&str] = &["needs", "needed_by"];

/// Errors raised while turning configuration into items.
///
/// These are load-time errors: they happen before anything runs on a node.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
  /// An attribute has the wrong type.
  #[error("expected {expected} for '{attribute}' on {item}, got {found}")]
  InvalidAttribute {
    item: ItemId,
    attribute: String,
    expected: &'static str,
    found: &'static str,
  },

  /// An attribute the item type does not know about.
  #[error("unknown attribute '{attribute}' on {item}")]
  UnknownAttribute { item: ItemId, attribute: String },

  /// A `needs`/`needed_by` entry that is not `type:name` or `type:`.
  #[error("invalid dependency '{dependency}' on {item}: expected 'type:name' or 'type:'")]
  InvalidDependency { item: ItemId, dependency: String },

  /// Empty or otherwise unusable item name.
  #[error("invalid item name '{name}' for type {type_name}")]
  InvalidName { type_name: String, name: String },

  /// No item type registered under this name.
  #[error("unknown item type '{0}'")]
  UnknownItemType(String),

  /// An item id could not be parsed.
  #[error("invalid item id '{0}': expected 'type:name'")]
  InvalidId(String),
}

/// Globally unique identity of an item: `<type>:<name>`.
///
/// Ordering is by type name, then instance name. Graph tie-breaks rely on it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId {
  type_name: String,
  name: String,
}

impl ItemId {
  pub fn new(type_name: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      type_name: type_name.into(),
      name: name.into(),
    }
  }

  pub fn type_name(&self) -> &str {
    &self.type_name
  }

  pub fn name(&self) -> &str {
    &self.name
  }
}

impl fmt::Display for ItemId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.type_name, self.name)
  }
}

impl FromStr for ItemId {
  type Err = ValidationError;

  /// Parse `type:name`. The name may itself contain colons.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.split_once(':') {
      Some((type_name, name)) if !type_name.is_empty() && !name.is_empty() => Ok(ItemId::new(type_name, name)),
      _ => Err(ValidationError::InvalidId(s.to_string())),
    }
  }
}

impl Serialize for ItemId {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

/// One entry of a `needs` or `needed_by` list.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DependencySpec {
  /// A specific item.
  Item(ItemId),
  /// Every item of a type, written `type:`.
  Type(String),
}

impl DependencySpec {
  pub fn parse(owner: &ItemId, raw: &str) -> Result<Self, ValidationError> {
    match raw.split_once(':') {
      Some((type_name, "")) if !type_name.is_empty() => Ok(DependencySpec::Type(type_name.to_string())),
      Some((type_name, name)) if !type_name.is_empty() => Ok(DependencySpec::Item(ItemId::new(type_name, name))),
      _ => Err(ValidationError::InvalidDependency {
        item: owner.clone(),
        dependency: raw.to_string(),
      }),
    }
  }

  /// Whether `id` is selected by this entry.
  pub fn matches(&self, id: &ItemId) -> bool {
    match self {
      DependencySpec::Item(item) => item == id,
      DependencySpec::Type(type_name) => id.type_name() == type_name,
    }
  }
}

impl fmt::Display for DependencySpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DependencySpec::Item(id) => write!(f, "{}", id),
      DependencySpec::Type(type_name) => write!(f, "{}:", type_name),
    }
  }
}

/// Dependencies declared on an item instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
  /// Items this item must run after.
  pub needs: Vec<DependencySpec>,
  /// Items that must run after this item.
  pub needed_by: Vec<DependencySpec>,
}

impl Dependencies {
  /// Split the common dependency attributes off `attributes`.
  ///
  /// Returns the parsed dependencies and the remaining, type-specific
  /// attributes.
  pub fn extract(
    owner: &ItemId,
    attributes: &BTreeMap<String, ConfigValue>,
  ) -> Result<(Self, BTreeMap<String, ConfigValue>), ValidationError> {
    let mut rest = attributes.clone();
    let needs = parse_list(owner, "needs", rest.remove("needs"))?;
    let needed_by = parse_list(owner, "needed_by", rest.remove("needed_by"))?;
    Ok((Self { needs, needed_by }, rest))
  }
}

fn parse_list(
  owner: &ItemId,
  attribute: &str,
  value: Option<ConfigValue>,
) -> Result<Vec<DependencySpec>, ValidationError> {
  let Some(value) = value else {
    return Ok(Vec::new());
  };

  let invalid = |found: &ConfigValue| ValidationError::InvalidAttribute {
    item: owner.clone(),
    attribute: attribute.to_string(),
    expected: "list of strings",
    found: found.kind(),
  };

  let entries = value.as_sequence().ok_or_else(|| invalid(&value))?;
  let mut specs = Vec::with_capacity(entries.len());
  for entry in entries {
    let raw = entry.as_str().ok_or_else(|| invalid(entry))?;
    let spec = DependencySpec::parse(owner, raw)?;
    if !specs.contains(&spec) {
      specs.push(spec);
    }
  }
  Ok(specs)
}

/// Static, type-level metadata of an item kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemDescriptor {
  /// Type name, also the first half of every item id of this kind.
  pub type_name: &'static str,
  /// Types that items of this kind always run after, when present.
  pub needs_static: &'static [&'static str],
  /// Whether two items of this kind may be applied at the same time on one
  /// node. Package managers hold a global lock, so theirs is `false`.
  pub parallel_apply: bool,
}

/// Result of inspecting an item: whether it is in the desired state, plus
/// the facts that were discovered. Recomputed on every inspection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemStatus {
  pub correct: bool,
  pub info: BTreeMap<String, ConfigValue>,
}

impl ItemStatus {
  pub fn new(correct: bool, info: impl IntoIterator<Item = (String, ConfigValue)>) -> Self {
    Self {
      correct,
      info: info.into_iter().collect(),
    }
  }
}

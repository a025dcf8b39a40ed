//! Configuration value tree.
//!
//! [`ConfigValue`] is the shape every layer of desired-state configuration
//! takes once it has been parsed. Besides the usual scalars and mappings it
//! distinguishes three sequence kinds (list, tuple, set) because the merge
//! engine treats them differently, and carries an [`ConfigValue::Atomic`]
//! marker that tells the merge engine to replace instead of combine.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// A node in a configuration tree.
///
/// # Equality
///
/// Sets compare without regard to order. Every other variant compares
/// structurally. An atomic marker is part of the value, so `Atomic(x) != x`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
  Null,
  Bool(bool),
  Integer(i64),
  Float(f64),
  String(String),
  /// Ordered sequence. Merging appends.
  List(Vec<ConfigValue>),
  /// Ordered, fixed-shape sequence. Merging appends but keeps the tuple kind.
  Tuple(Vec<ConfigValue>),
  /// Duplicate-free collection, kept in first-insertion order so output is
  /// reproducible. Merging is a union.
  Set(Vec<ConfigValue>),
  Map(BTreeMap<String, ConfigValue>),
  /// Marks the wrapped value as non-mergeable.
  Atomic(Box<ConfigValue>),
}

impl ConfigValue {
  /// An empty mapping.
  pub fn empty_map() -> Self {
    ConfigValue::Map(BTreeMap::new())
  }

  pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, ConfigValue)>) -> Self {
    ConfigValue::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
  }

  pub fn list(items: impl IntoIterator<Item = ConfigValue>) -> Self {
    ConfigValue::List(items.into_iter().collect())
  }

  pub fn tuple(items: impl IntoIterator<Item = ConfigValue>) -> Self {
    ConfigValue::Tuple(items.into_iter().collect())
  }

  /// Build a set, dropping duplicates while keeping first occurrences in order.
  pub fn set(items: impl IntoIterator<Item = ConfigValue>) -> Self {
    let mut unique: Vec<ConfigValue> = Vec::new();
    for item in items {
      if !unique.contains(&item) {
        unique.push(item);
      }
    }
    ConfigValue::Set(unique)
  }

  pub fn atomic(value: ConfigValue) -> Self {
    ConfigValue::Atomic(Box::new(value))
  }

  pub fn is_atomic(&self) -> bool {
    matches!(self, ConfigValue::Atomic(_))
  }

  /// The value with any outer atomic markers peeled off.
  pub fn unwrapped(&self) -> &ConfigValue {
    match self {
      ConfigValue::Atomic(inner) => inner.unwrapped(),
      other => other,
    }
  }

  /// Deep copy with every atomic marker removed.
  ///
  /// Merge results are always plain: the marker only has meaning while a
  /// value is on the override side of a merge.
  pub fn to_plain(&self) -> ConfigValue {
    match self {
      ConfigValue::Atomic(inner) => inner.to_plain(),
      ConfigValue::List(items) => ConfigValue::List(items.iter().map(ConfigValue::to_plain).collect()),
      ConfigValue::Tuple(items) => ConfigValue::Tuple(items.iter().map(ConfigValue::to_plain).collect()),
      ConfigValue::Set(items) => ConfigValue::set(items.iter().map(ConfigValue::to_plain)),
      ConfigValue::Map(map) => ConfigValue::Map(map.iter().map(|(k, v)| (k.clone(), v.to_plain())).collect()),
      scalar => scalar.clone(),
    }
  }

  /// Elements of a list, tuple or set; `None` for anything else.
  pub fn as_sequence(&self) -> Option<&[ConfigValue]> {
    match self.unwrapped() {
      ConfigValue::List(items) | ConfigValue::Tuple(items) | ConfigValue::Set(items) => Some(items),
      _ => None,
    }
  }

  pub fn as_map(&self) -> Option<&BTreeMap<String, ConfigValue>> {
    match self.unwrapped() {
      ConfigValue::Map(map) => Some(map),
      _ => None,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self.unwrapped() {
      ConfigValue::Bool(b) => Some(*b),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self.unwrapped() {
      ConfigValue::String(s) => Some(s),
      _ => None,
    }
  }

  /// Short name of the value's kind, used in error messages.
  pub fn kind(&self) -> &'static str {
    match self {
      ConfigValue::Null => "null",
      ConfigValue::Bool(_) => "boolean",
      ConfigValue::Integer(_) => "integer",
      ConfigValue::Float(_) => "float",
      ConfigValue::String(_) => "string",
      ConfigValue::List(_) => "list",
      ConfigValue::Tuple(_) => "tuple",
      ConfigValue::Set(_) => "set",
      ConfigValue::Map(_) => "map",
      ConfigValue::Atomic(inner) => inner.kind(),
    }
  }
}

impl PartialEq for ConfigValue {
  fn eq(&self, other: &Self) -> bool {
    use ConfigValue::*;
    match (self, other) {
      (Null, Null) => true,
      (Bool(a), Bool(b)) => a == b,
      (Integer(a), Integer(b)) => a == b,
      (Float(a), Float(b)) => a == b,
      (String(a), String(b)) => a == b,
      (List(a), List(b)) | (Tuple(a), Tuple(b)) => a == b,
      (Set(a), Set(b)) => a.len() == b.len() && a.iter().all(|item| b.contains(item)),
      (Map(a), Map(b)) => a == b,
      (Atomic(a), Atomic(b)) => a == b,
      _ => false,
    }
  }
}

impl fmt::Display for ConfigValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigValue::Null => write!(f, "null"),
      ConfigValue::Bool(b) => write!(f, "{}", b),
      ConfigValue::Integer(n) => write!(f, "{}", n),
      ConfigValue::Float(n) => write!(f, "{}", n),
      ConfigValue::String(s) => write!(f, "{:?}", s),
      ConfigValue::Atomic(inner) => write!(f, "{}", inner),
      other => match serde_json::to_string(other) {
        Ok(json) => write!(f, "{}", json),
        Err(_) => write!(f, "<{}>", other.kind()),
      },
    }
  }
}

impl From<bool> for ConfigValue {
  fn from(value: bool) -> Self {
    ConfigValue::Bool(value)
  }
}

impl From<i64> for ConfigValue {
  fn from(value: i64) -> Self {
    ConfigValue::Integer(value)
  }
}

impl From<i32> for ConfigValue {
  fn from(value: i32) -> Self {
    ConfigValue::Integer(i64::from(value))
  }
}

impl From<f64> for ConfigValue {
  fn from(value: f64) -> Self {
    ConfigValue::Float(value)
  }
}

impl From<&str> for ConfigValue {
  fn from(value: &str) -> Self {
    ConfigValue::String(value.to_string())
  }
}

impl From<String> for ConfigValue {
  fn from(value: String) -> Self {
    ConfigValue::String(value)
  }
}

impl From<BTreeMap<String, ConfigValue>> for ConfigValue {
  fn from(value: BTreeMap<String, ConfigValue>) -> Self {
    ConfigValue::Map(value)
  }
}

//! Edge, option and error types of the item dependency graph.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::item::ItemId;

/// Where a dependency edge came from.
///
/// The order of the variants is the collection order: when two categories
/// produce the same edge, the earlier one is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
  /// Type-level precedence from [`ItemDescriptor::needs_static`](crate::item::ItemDescriptor).
  Static,
  /// Declared on the item with `needs`.
  Regular,
  /// Declared on the other item with `needed_by`.
  Reverse,
  /// Inferred to serialize items whose type forbids parallel apply.
  Concurrency,
}

impl EdgeKind {
  pub const ALL: [EdgeKind; 4] = [EdgeKind::Static, EdgeKind::Regular, EdgeKind::Reverse, EdgeKind::Concurrency];

  pub fn as_str(self) -> &'static str {
    match self {
      EdgeKind::Static => "static",
      EdgeKind::Regular => "regular",
      EdgeKind::Reverse => "reverse",
      EdgeKind::Concurrency => "concurrency",
    }
  }
}

impl fmt::Display for EdgeKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// `source` runs after `target`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DependencyEdge {
  pub source: ItemId,
  pub target: ItemId,
  pub kind: EdgeKind,
}

/// What produces reverse edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReversePolicy {
  /// `needed_by` on an item makes the named items depend on it.
  #[default]
  NeededBy,
  /// `needed_by` declarations are ignored.
  Ignore,
}

#[derive(Debug, Clone, Default)]
pub struct GraphOptions {
  pub reverse: ReversePolicy,
}

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
  /// The dependencies form a cycle. `items` lists every item on it, sorted.
  #[error("dependency cycle detected between {}", join(.items))]
  Cycle { items: Vec<ItemId> },

  /// Two items share one id.
  #[error("duplicate item: {0}")]
  DuplicateItem(ItemId),

  /// An explicit dependency names an item that is not part of the run.
  #[error("{item} depends on {dependency}, which does not exist")]
  UnknownDependency { item: ItemId, dependency: ItemId },
}

fn join(items: &[ItemId]) -> String {
  items.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

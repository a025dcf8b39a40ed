use std::path::PathBuf;

use thiserror::Error;

use super::parse::ParseError;
use crate::item::ValidationError;

/// Errors raised while loading a repository.
#[derive(Debug, Error)]
pub enum RepoError {
  #[error("repository root is not a directory: {0}")]
  NotADirectory(PathBuf),

  #[error("failed to read {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: ParseError,
  },

  #[error("invalid {kind} name '{name}'")]
  InvalidName { kind: &'static str, name: String },

  #[error("no such node: {0}")]
  UnknownNode(String),

  #[error("node {node} is in unknown group {group}")]
  UnknownGroup { node: String, group: String },

  #[error("{path}: '{field}' must be {expected}")]
  InvalidField {
    path: PathBuf,
    field: &'static str,
    expected: &'static str,
  },

  #[error("malformed items on node {node}: {reason}")]
  MalformedItems { node: String, reason: String },

  #[error(transparent)]
  Validation(#[from] ValidationError),
}

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::RepoError;
use super::parse::parse_document;
use crate::value::ConfigValue;

/// Parsed configuration files, keyed by path.
///
/// One cache lives for one run: files shared between nodes (defaults, group
/// files) are read and parsed once. Nothing is invalidated, so a cache must
/// not outlive the run it was created for.
#[derive(Debug, Default)]
pub struct ConfigCache {
  entries: HashMap<PathBuf, ConfigValue>,
  hits: usize,
  misses: usize,
}

impl ConfigCache {
  pub fn new() -> Self {
    Self::default()
  }

  /// The parsed contents of `path`, reading it on first use.
  pub fn load(&mut self, path: &Path) -> Result<&ConfigValue, RepoError> {
    match self.entries.entry(path.to_path_buf()) {
      Entry::Occupied(entry) => {
        self.hits += 1;
        debug!(path = %path.display(), "config cache hit");
        Ok(entry.into_mut())
      }
      Entry::Vacant(entry) => {
        self.misses += 1;
        debug!(path = %path.display(), "config cache miss");
        let content = std::fs::read_to_string(path).map_err(|source| RepoError::Io {
          path: path.to_path_buf(),
          source,
        })?;
        let value = parse_document(&content).map_err(|source| RepoError::Parse {
          path: path.to_path_buf(),
          source,
        })?;
        Ok(entry.insert(value))
      }
    }
  }

  pub fn hits(&self) -> usize {
    self.hits
  }

  pub fn misses(&self) -> usize {
    self.misses
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

mod fix;
mod graph;
mod items;
mod plan;
mod waves;

pub use fix::cmd_fix;
pub use graph::{GraphArgs, cmd_graph};
pub use items::cmd_items;
pub use plan::cmd_plan;
pub use waves::cmd_waves;

use std::path::Path;

use anyhow::{Context, Result};

use converge_lib::graph::{GraphOptions, ItemGraph};
use converge_lib::item::{Item, ItemRegistry};
use converge_lib::repo::{ConfigCache, NodeConfig, Repository};

/// A node with its items, ready for graph building.
pub(crate) struct LoadedNode {
  pub config: NodeConfig,
  pub items: Vec<Box<dyn Item>>,
}

impl LoadedNode {
  pub fn load(repo: &Path, node: &str) -> Result<Self> {
    let repository =
      Repository::open(repo).with_context(|| format!("Failed to open repository: {}", repo.display()))?;
    let mut cache = ConfigCache::new();
    let config = repository
      .load_node(node, &mut cache)
      .with_context(|| format!("Failed to load node: {}", node))?;
    let items = config
      .items(&ItemRegistry::builtin())
      .with_context(|| format!("Invalid items on node: {}", node))?;
    Ok(Self { config, items })
  }

  pub fn graph(&self) -> Result<ItemGraph> {
    ItemGraph::build(&self.items, &GraphOptions::default())
      .with_context(|| format!("Failed to build dependency graph for node: {}", self.config.name))
  }
}

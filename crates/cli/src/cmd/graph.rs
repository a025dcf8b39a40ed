//! Implementation of the `cvg graph` command.

use std::path::Path;

use anyhow::Result;
use clap::Args;

use converge_lib::graph::dot::{DotOptions, render};

use super::LoadedNode;

#[derive(Debug, Args)]
pub struct GraphArgs {
  /// Graph title (default: the node name)
  #[arg(long)]
  title: Option<String>,

  /// Hide static dependencies
  #[arg(long)]
  no_static: bool,

  /// Hide regular dependencies
  #[arg(long)]
  no_regular: bool,

  /// Hide concurrency dependencies
  #[arg(long)]
  no_concurrency: bool,

  /// Hide reverse dependencies
  #[arg(long)]
  no_reverse: bool,

  /// Hide all inferred (concurrency and reverse) dependencies
  #[arg(long)]
  no_auto: bool,

  /// Do not group items by type
  #[arg(long)]
  no_cluster: bool,
}

impl GraphArgs {
  fn dot_options(&self) -> DotOptions {
    DotOptions {
      cluster: !self.no_cluster,
      static_edges: !self.no_static,
      regular_edges: !self.no_regular,
      concurrency_edges: !self.no_concurrency,
      reverse_edges: !self.no_reverse,
      auto_edges: !self.no_auto,
    }
  }
}

pub fn cmd_graph(repo: &Path, node: &str, args: &GraphArgs) -> Result<()> {
  let loaded = LoadedNode::load(repo, node)?;
  let graph = loaded.graph()?;

  let title = args.title.as_deref().unwrap_or(node);
  print!("{}", render(title, &graph, &args.dot_options()));

  Ok(())
}

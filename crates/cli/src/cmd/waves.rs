//! Implementation of the `cvg waves` command.

use std::path::Path;

use anyhow::Result;
use owo_colors::{OwoColorize, Stream};

use super::LoadedNode;

pub fn cmd_waves(repo: &Path, node: &str) -> Result<()> {
  let loaded = LoadedNode::load(repo, node)?;
  let graph = loaded.graph()?;

  for (number, wave) in graph.execution_waves().iter().enumerate() {
    let header = format!("Wave {}:", number + 1);
    println!("{}", header.if_supports_color(Stream::Stdout, |s| s.bold()));
    for id in wave {
      println!("  {}", id);
    }
  }

  Ok(())
}

//! Implementation of the `cvg items` command.

use std::path::Path;

use anyhow::Result;
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

use converge_lib::item::ItemId;

use super::LoadedNode;
use crate::output::{OutputFormat, print_json};

#[derive(Serialize)]
struct ItemEntry {
  id: ItemId,
  needs: Vec<String>,
  needed_by: Vec<String>,
  parallel_apply: bool,
}

pub fn cmd_items(repo: &Path, node: &str, output: OutputFormat) -> Result<()> {
  let loaded = LoadedNode::load(repo, node)?;

  let mut entries: Vec<ItemEntry> = loaded
    .items
    .iter()
    .map(|item| ItemEntry {
      id: item.id(),
      needs: item.dependencies().needs.iter().map(ToString::to_string).collect(),
      needed_by: item.dependencies().needed_by.iter().map(ToString::to_string).collect(),
      parallel_apply: item.descriptor().parallel_apply,
    })
    .collect();
  entries.sort_by(|a, b| a.id.cmp(&b.id));

  if output.is_json() {
    return print_json(&entries);
  }

  for entry in &entries {
    println!("{}", entry.id.if_supports_color(Stream::Stdout, |s| s.bold()));
    if !entry.needs.is_empty() {
      println!("  needs: {}", entry.needs.join(", "));
    }
    if !entry.needed_by.is_empty() {
      println!("  needed_by: {}", entry.needed_by.join(", "));
    }
  }

  Ok(())
}

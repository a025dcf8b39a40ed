//! Implementation of the `cvg fix` command.
//!
//! Converges a single item: inspect, show the pending change, ask for
//! confirmation, fix, then re-inspect to confirm the result.

use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::info;

use converge_lib::item::ItemId;
use converge_lib::item::lifecycle::ItemRun;

use super::LoadedNode;
use crate::output::{print_info, print_pending, print_success, print_warning};
use crate::prompts::confirm;

pub fn cmd_fix(repo: &Path, node: &str, item_id: &str, force: bool) -> Result<()> {
  let id: ItemId = item_id
    .parse()
    .with_context(|| format!("Invalid item id: {}", item_id))?;

  let loaded = LoadedNode::load(repo, node)?;
  // Fails on cycles and unknown dependencies even though only one item runs.
  loaded.graph()?;

  let Some(item) = loaded.items.iter().find(|item| item.id() == id) else {
    bail!("No item {} on node {}", id, node);
  };

  let target = loaded.config.connect();
  let mut run = ItemRun::new(item.as_ref());
  run
    .inspect(target.as_ref())
    .with_context(|| format!("Failed to inspect {}", id))?;

  let Some(preview) = run.describe() else {
    print_success(&format!("{} is already correct", id));
    return Ok(());
  };

  print_pending(&id.to_string());
  for line in preview.lines() {
    println!("    {}", line);
  }

  if !confirm(&format!("Fix {} on {}?", id, node), false, force)? {
    print_info("Aborted");
    return Ok(());
  }

  run.fix(target.as_ref()).with_context(|| format!("Failed to fix {}", id))?;
  info!(item = %id, node, "fix applied");

  let after = run
    .verify(target.as_ref())
    .with_context(|| format!("Failed to re-inspect {}", id))?;

  if after.correct {
    print_success(&format!("{} fixed", id));
  } else {
    print_warning(&format!("{} was fixed but is still not correct", id));
  }

  Ok(())
}

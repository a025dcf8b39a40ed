//! Implementation of the `cvg plan` command.
//!
//! Inspects every item of a node in dependency order and shows what a fix
//! would change. Nothing on the node is modified.

use std::path::Path;

use anyhow::{Result, bail};

use converge_lib::item::lifecycle::ItemRun;

use super::LoadedNode;
use crate::output::{print_error, print_info, print_pending, print_success};

pub fn cmd_plan(repo: &Path, node: &str) -> Result<()> {
  let loaded = LoadedNode::load(repo, node)?;
  let graph = loaded.graph()?;
  let target = loaded.config.connect();

  let mut incorrect = 0;
  let mut failed = 0;

  for id in graph.topological_order() {
    let Some(item) = loaded.items.iter().find(|item| item.id() == id) else {
      continue;
    };

    let mut run = ItemRun::new(item.as_ref());
    if let Err(err) = run.inspect(target.as_ref()) {
      print_error(&format!("{}: {}", id, err));
      failed += 1;
      continue;
    }

    match run.describe() {
      None => print_success(&id.to_string()),
      Some(preview) => {
        incorrect += 1;
        print_pending(&id.to_string());
        for line in preview.lines() {
          println!("    {}", line);
        }
      }
    }
  }

  println!();
  print_info(&format!(
    "{} item(s), {} to fix, {} failed",
    graph.len(),
    incorrect,
    failed
  ));

  if failed > 0 {
    bail!("{} item(s) could not be inspected", failed);
  }
  Ok(())
}

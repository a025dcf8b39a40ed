//! Graphviz export of an [`ItemGraph`].

use std::collections::BTreeMap;
use std::fmt;

use super::{EdgeKind, ItemGraph};
use crate::item::ItemId;

/// Which parts of the graph to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DotOptions {
  /// Group items of the same type into a cluster.
  pub cluster: bool,
  pub static_edges: bool,
  pub regular_edges: bool,
  pub concurrency_edges: bool,
  pub reverse_edges: bool,
  /// Master switch for inferred edges. Off hides concurrency and reverse
  /// edges regardless of their own flags.
  pub auto_edges: bool,
}

impl Default for DotOptions {
  fn default() -> Self {
    Self {
      cluster: true,
      static_edges: true,
      regular_edges: true,
      concurrency_edges: true,
      reverse_edges: true,
      auto_edges: true,
    }
  }
}

impl DotOptions {
  fn shows(&self, kind: EdgeKind) -> bool {
    match kind {
      EdgeKind::Static => self.static_edges,
      EdgeKind::Regular => self.regular_edges,
      EdgeKind::Concurrency => self.auto_edges && self.concurrency_edges,
      EdgeKind::Reverse => self.auto_edges && self.reverse_edges,
    }
  }
}

/// Edge color for each category.
pub fn edge_color(kind: EdgeKind) -> &'static str {
  match kind {
    EdgeKind::Static => "#3991CC",
    EdgeKind::Regular => "#C24948",
    EdgeKind::Concurrency => "#714D99",
    EdgeKind::Reverse => "#D18C57",
  }
}

/// Lazily formatted DOT document.
pub struct Dot<'a> {
  title: &'a str,
  graph: &'a ItemGraph,
  options: DotOptions,
}

impl<'a> Dot<'a> {
  pub fn new(title: &'a str, graph: &'a ItemGraph, options: DotOptions) -> Self {
    Self { title, graph, options }
  }
}

/// Render `graph` as a Graphviz digraph.
pub fn render(title: &str, graph: &ItemGraph, options: &DotOptions) -> String {
  Dot::new(title, graph, *options).to_string()
}

/// Quote and escape a DOT identifier.
fn quoted(raw: &str) -> String {
  let mut out = String::with_capacity(raw.len() + 2);
  out.push('"');
  for c in raw.chars() {
    match c {
      '"' | '\\' => {
        out.push('\\');
        out.push(c);
      }
      '\n' => out.push_str("\\n"),
      _ => out.push(c),
    }
  }
  out.push('"');
  out
}

impl fmt::Display for Dot<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "digraph converge")?;
    writeln!(f, "{{")?;
    writeln!(f, "rankdir = LR")?;
    writeln!(
      f,
      "graph [color=\"#303030\"; fontname=Helvetica; penwidth=2; shape=box; style=\"rounded,dashed\"]"
    )?;
    writeln!(
      f,
      "node [color=\"#303030\"; fillcolor=\"#303030\"; fontcolor=white; fontname=Helvetica; shape=box; style=\"rounded,filled\"]"
    )?;
    writeln!(f, "edge [arrowhead=vee]")?;

    if self.options.cluster {
      let mut by_type: BTreeMap<&str, Vec<&ItemId>> = BTreeMap::new();
      for id in self.graph.item_ids() {
        by_type.entry(id.type_name()).or_default().push(id);
      }
      for (number, (type_name, ids)) in by_type.into_iter().enumerate() {
        writeln!(f, "subgraph cluster_{number}")?;
        writeln!(f, "{{")?;
        writeln!(f, "label = {}", quoted(type_name))?;
        for id in ids {
          writeln!(f, "{}", quoted(&id.to_string()))?;
        }
        writeln!(f, "}}")?;
      }
    } else {
      for id in self.graph.item_ids() {
        writeln!(f, "{}", quoted(&id.to_string()))?;
      }
    }

    for edge in self.graph.edges().iter().filter(|edge| self.options.shows(edge.kind)) {
      writeln!(
        f,
        "{} -> {} [color=\"{}\",penwidth=2]",
        quoted(&edge.source.to_string()),
        quoted(&edge.target.to_string()),
        edge_color(edge.kind)
      )?;
    }

    writeln!(f, "fontsize = 28")?;
    writeln!(f, "label = {}", quoted(self.title))?;
    writeln!(f, "labelloc = \"t\"")?;
    writeln!(f, "}}")
  }
}

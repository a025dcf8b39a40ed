//! Item dependency graph.
//!
//! [`ItemGraph::build`] turns the items of a run into a DAG whose edges are
//! precedence constraints for the scheduler. Edges come from four sources,
//! collected in this order:
//!
//! - **static**: each item runs after every item of the types its descriptor
//!   lists in `needs_static`
//! - **regular**: each item runs after the items (or whole types, `type:`)
//!   it names in `needs`
//! - **reverse**: items named in another item's `needed_by` run after it,
//!   unless that would directly contradict a static or regular edge
//! - **concurrency**: items whose type forbids parallel apply are serialized,
//!   one direction per pair, only where no ordering exists yet
//!
//! The result is checked for cycles. Everything is computed over sorted ids,
//! so identical input always yields an identical graph.
//!
//! # Submodules
//!
//! - [`dot`] - Graphviz export

pub mod dot;
mod types;

pub use types::*;

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::Direction;
use petgraph::algo::{has_path_connecting, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, info, warn};

use crate::item::{DependencySpec, Item, ItemId};

/// A validated, acyclic dependency graph over item ids.
#[derive(Debug)]
pub struct ItemGraph {
  /// Edges point from dependency to dependent.
  graph: DiGraph<ItemId, EdgeKind>,

  /// Map from item id to node index.
  nodes: BTreeMap<ItemId, NodeIndex>,

  /// All edges, sorted by (source, target).
  edges: Vec<DependencyEdge>,
}

/// Edges keyed by (source, target). The first category to claim a pair wins.
#[derive(Default)]
struct EdgeSet {
  edges: BTreeMap<(ItemId, ItemId), EdgeKind>,
}

impl EdgeSet {
  fn add(&mut self, source: &ItemId, target: &ItemId, kind: EdgeKind) {
    self.edges.entry((source.clone(), target.clone())).or_insert(kind);
  }

  fn get(&self, source: &ItemId, target: &ItemId) -> Option<EdgeKind> {
    self.edges.get(&(source.clone(), target.clone())).copied()
  }
}

struct Builder<'a> {
  items: BTreeMap<ItemId, &'a dyn Item>,
  by_type: BTreeMap<String, Vec<ItemId>>,
  edges: EdgeSet,
}

impl<'a> Builder<'a> {
  fn new(items: &'a [Box<dyn Item>]) -> Result<Self, GraphError> {
    let mut by_id: BTreeMap<ItemId, &'a dyn Item> = BTreeMap::new();
    for item in items {
      let id = item.id();
      if by_id.insert(id.clone(), item.as_ref()).is_some() {
        return Err(GraphError::DuplicateItem(id));
      }
    }

    let mut by_type: BTreeMap<String, Vec<ItemId>> = BTreeMap::new();
    for id in by_id.keys() {
      by_type.entry(id.type_name().to_string()).or_default().push(id.clone());
    }

    Ok(Self {
      items: by_id,
      by_type,
      edges: EdgeSet::default(),
    })
  }

  fn of_type(&self, type_name: &str) -> &[ItemId] {
    self.by_type.get(type_name).map(Vec::as_slice).unwrap_or_default()
  }

  /// Items selected by `spec`, never including `owner` through a wildcard.
  fn resolve(&self, owner: &ItemId, spec: &DependencySpec) -> Result<Vec<ItemId>, GraphError> {
    match spec {
      DependencySpec::Item(id) if self.items.contains_key(id) => Ok(vec![id.clone()]),
      DependencySpec::Item(id) => Err(GraphError::UnknownDependency {
        item: owner.clone(),
        dependency: id.clone(),
      }),
      DependencySpec::Type(type_name) => Ok(self.of_type(type_name).iter().filter(|id| *id != owner).cloned().collect()),
    }
  }

  fn collect_static(&mut self) {
    let mut found = Vec::new();
    for (id, item) in &self.items {
      for type_name in item.descriptor().needs_static {
        for other in self.of_type(type_name).iter().filter(|other| *other != id) {
          found.push((id.clone(), other.clone()));
        }
      }
    }
    for (source, target) in found {
      self.edges.add(&source, &target, EdgeKind::Static);
    }
  }

  fn collect_regular(&mut self) -> Result<(), GraphError> {
    let mut found = Vec::new();
    for (id, item) in &self.items {
      for spec in &item.dependencies().needs {
        for target in self.resolve(id, spec)? {
          found.push((id.clone(), target));
        }
      }
    }
    for (source, target) in found {
      self.edges.add(&source, &target, EdgeKind::Regular);
    }
    Ok(())
  }

  fn collect_reverse(&mut self) -> Result<(), GraphError> {
    let mut found = Vec::new();
    for (id, item) in &self.items {
      for spec in &item.dependencies().needed_by {
        for dependent in self.resolve(id, spec)? {
          found.push((dependent, id.clone()));
        }
      }
    }
    for (source, target) in found {
      if let Some(kind @ (EdgeKind::Static | EdgeKind::Regular)) = self.edges.get(&target, &source) {
        warn!(
          item = %target,
          needed_by = %source,
          existing = %kind,
          "needed_by contradicts an existing dependency, ignoring it"
        );
        continue;
      }
      self.edges.add(&source, &target, EdgeKind::Reverse);
    }
    Ok(())
  }

  /// Build the petgraph view of the edges collected so far.
  fn to_graph(&self) -> (DiGraph<ItemId, EdgeKind>, BTreeMap<ItemId, NodeIndex>) {
    let mut graph = DiGraph::new();
    let mut nodes = BTreeMap::new();
    for id in self.items.keys() {
      nodes.insert(id.clone(), graph.add_node(id.clone()));
    }
    for ((source, target), kind) in &self.edges.edges {
      graph.add_edge(nodes[target], nodes[source], *kind);
    }
    (graph, nodes)
  }

  /// Serialize items of non-parallel types.
  ///
  /// For each such type, items are visited in id order and each is compared
  /// with the earlier ones, nearest first. A pair that is already ordered
  /// (a path exists either way) is left alone; otherwise the later item is
  /// made to wait for the earlier one. An edge is only ever added between
  /// unconnected items, so this never contradicts existing edges and never
  /// closes a cycle.
  fn collect_concurrency(&mut self, graph: &mut DiGraph<ItemId, EdgeKind>, nodes: &BTreeMap<ItemId, NodeIndex>) {
    let mut found = Vec::new();
    for ids in self.by_type.values() {
      let exclusive = ids
        .first()
        .and_then(|id| self.items.get(id))
        .is_some_and(|item| !item.descriptor().parallel_apply);
      if !exclusive {
        continue;
      }

      for later in 1..ids.len() {
        for earlier in (0..later).rev() {
          let (a, b) = (nodes[&ids[earlier]], nodes[&ids[later]]);
          if has_path_connecting(&*graph, a, b, None) || has_path_connecting(&*graph, b, a, None) {
            continue;
          }
          graph.add_edge(a, b, EdgeKind::Concurrency);
          found.push((ids[later].clone(), ids[earlier].clone()));
        }
      }
    }
    for (source, target) in found {
      self.edges.add(&source, &target, EdgeKind::Concurrency);
    }
  }
}

/// Find the cycle containing the smallest item id, if any.
fn find_cycle(graph: &DiGraph<ItemId, EdgeKind>) -> Option<Vec<ItemId>> {
  tarjan_scc(graph)
    .into_iter()
    .filter(|component| component.len() > 1 || graph.contains_edge(component[0], component[0]))
    .map(|component| {
      let mut ids: Vec<ItemId> = component.into_iter().map(|idx| graph[idx].clone()).collect();
      ids.sort();
      ids
    })
    .min()
}

impl ItemGraph {
  /// Build and validate the dependency graph of `items`.
  ///
  /// # Errors
  ///
  /// - [`GraphError::DuplicateItem`] if two items share an id
  /// - [`GraphError::UnknownDependency`] if `needs`/`needed_by` names an item
  ///   that is not in `items`
  /// - [`GraphError::Cycle`] if the edges form a cycle
  pub fn build(items: &[Box<dyn Item>], options: &GraphOptions) -> Result<Self, GraphError> {
    let mut builder = Builder::new(items)?;

    builder.collect_static();
    builder.collect_regular()?;
    match options.reverse {
      ReversePolicy::NeededBy => builder.collect_reverse()?,
      ReversePolicy::Ignore => debug!("ignoring needed_by declarations"),
    }

    let (mut graph, nodes) = builder.to_graph();
    builder.collect_concurrency(&mut graph, &nodes);

    if let Some(items) = find_cycle(&graph) {
      return Err(GraphError::Cycle { items });
    }

    let edges: Vec<DependencyEdge> = builder
      .edges
      .edges
      .into_iter()
      .map(|((source, target), kind)| DependencyEdge { source, target, kind })
      .collect();

    info!(items = nodes.len(), edges = edges.len(), "built dependency graph");

    Ok(Self { graph, nodes, edges })
  }

  /// All item ids, sorted.
  pub fn item_ids(&self) -> impl Iterator<Item = &ItemId> {
    self.nodes.keys()
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  pub fn contains(&self, id: &ItemId) -> bool {
    self.nodes.contains_key(id)
  }

  /// All edges, sorted by (source, target).
  pub fn edges(&self) -> &[DependencyEdge] {
    &self.edges
  }

  pub fn edges_of_kind(&self, kind: EdgeKind) -> impl Iterator<Item = &DependencyEdge> {
    self.edges.iter().filter(move |edge| edge.kind == kind)
  }

  /// Category of the edge `source` → `target`, if there is one.
  pub fn edge_kind(&self, source: &ItemId, target: &ItemId) -> Option<EdgeKind> {
    self
      .edges
      .iter()
      .find(|edge| &edge.source == source && &edge.target == target)
      .map(|edge| edge.kind)
  }

  /// Items `id` runs after, sorted.
  pub fn dependencies(&self, id: &ItemId) -> Vec<&ItemId> {
    self.edges.iter().filter(|edge| &edge.source == id).map(|edge| &edge.target).collect()
  }

  /// Items that run after `id`, sorted.
  pub fn dependents(&self, id: &ItemId) -> Vec<&ItemId> {
    let mut dependents: Vec<&ItemId> = self.edges.iter().filter(|edge| &edge.target == id).map(|edge| &edge.source).collect();
    dependents.sort();
    dependents
  }

  /// Items grouped into waves that may each run in parallel.
  ///
  /// Every item's dependencies lie in earlier waves. Items within a wave are
  /// sorted.
  pub fn execution_waves(&self) -> Vec<Vec<ItemId>> {
    let mut in_degree: HashMap<NodeIndex, usize> = self
      .graph
      .node_indices()
      .map(|idx| (idx, self.graph.neighbors_directed(idx, Direction::Incoming).count()))
      .collect();
    let mut remaining: HashSet<NodeIndex> = self.graph.node_indices().collect();
    let mut waves = Vec::new();

    while !remaining.is_empty() {
      let ready: Vec<NodeIndex> = remaining.iter().filter(|idx| in_degree[*idx] == 0).copied().collect();

      // build() rejects cycles, so there is always something ready
      if ready.is_empty() {
        break;
      }

      for idx in &ready {
        remaining.remove(idx);
        for neighbor in self.graph.neighbors_directed(*idx, Direction::Outgoing) {
          if let Some(deg) = in_degree.get_mut(&neighbor) {
            *deg = deg.saturating_sub(1);
          }
        }
      }

      let mut wave: Vec<ItemId> = ready.into_iter().map(|idx| self.graph[idx].clone()).collect();
      wave.sort();
      waves.push(wave);
    }

    waves
  }

  /// A topological order: dependencies always come first.
  pub fn topological_order(&self) -> Vec<ItemId> {
    self.execution_waves().into_iter().flatten().collect()
  }
}

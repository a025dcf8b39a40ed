//! Repository loading.
//!
//! A repository is a directory of TOML files describing desired state:
//!
//! ```text
//! repo/
//! ├── defaults.toml        # optional, applies to every node
//! ├── groups/<group>.toml  # shared by the nodes that list the group
//! └── nodes/<node>.toml    # hostname, groups and node-specific config
//! ```
//!
//! A node's configuration is the [merge](crate::merge) of its layers, most
//! general first: defaults, then each group in the order the node lists
//! them, then the node file itself. Items live under
//! `[items.<type>.<name>]` in any layer.
//!
//! # Submodules
//!
//! - [`cache`] - per-run cache of parsed files
//! - [`names`] - node and group name rules
//! - [`parse`] - TOML conversion and marker tables

pub mod cache;
pub mod names;
pub mod parse;
mod types;

pub use cache::ConfigCache;
pub use names::validate_name;
pub use types::*;

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::item::{Item, ItemRegistry};
use crate::merge::merge_layers;
use crate::node::{LocalNode, Node, SshNode};
use crate::value::ConfigValue;

/// Keys of a node file that describe the node rather than its desired state.
const NODE_KEYS: &[&str] = &["hostname", "groups", "ssh_user", "ssh_port"];

/// A repository on disk.
#[derive(Debug, Clone)]
pub struct Repository {
  root: PathBuf,
}

/// Everything known about one node after layering.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeConfig {
  pub name: String,
  /// Host to connect to; `None` runs commands locally.
  pub hostname: Option<String>,
  pub groups: Vec<String>,
  pub ssh_user: Option<String>,
  pub ssh_port: Option<u16>,
  /// Merged configuration of all layers.
  pub attributes: ConfigValue,
}

impl Repository {
  pub fn open(root: impl Into<PathBuf>) -> Result<Self, RepoError> {
    let root = root.into();
    if !root.is_dir() {
      return Err(RepoError::NotADirectory(root));
    }
    Ok(Self { root })
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn node_path(&self, name: &str) -> PathBuf {
    self.root.join("nodes").join(format!("{name}.toml"))
  }

  fn group_path(&self, name: &str) -> PathBuf {
    self.root.join("groups").join(format!("{name}.toml"))
  }

  /// Names of all nodes, sorted.
  pub fn node_names(&self) -> Result<Vec<String>, RepoError> {
    let dir = self.root.join("nodes");
    if !dir.is_dir() {
      return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(&dir).map_err(|source| RepoError::Io {
      path: dir.clone(),
      source,
    })?;

    let mut names = Vec::new();
    for entry in entries {
      let entry = entry.map_err(|source| RepoError::Io {
        path: dir.clone(),
        source,
      })?;
      let path = entry.path();
      if path.extension().is_some_and(|ext| ext == "toml")
        && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
        && validate_name("node", stem).is_ok()
      {
        names.push(stem.to_string());
      }
    }
    names.sort();
    Ok(names)
  }

  /// Load and layer the configuration of node `name`.
  pub fn load_node(&self, name: &str, cache: &mut ConfigCache) -> Result<NodeConfig, RepoError> {
    validate_name("node", name)?;

    let node_path = self.node_path(name);
    if !node_path.is_file() {
      return Err(RepoError::UnknownNode(name.to_string()));
    }
    let node_layer = cache.load(&node_path)?.clone();

    let hostname = optional_string(&node_layer, "hostname", &node_path)?;
    let ssh_user = optional_string(&node_layer, "ssh_user", &node_path)?;
    let ssh_port = optional_port(&node_layer, &node_path)?;
    let groups = string_list(&node_layer, "groups", &node_path)?;

    let mut layers = Vec::with_capacity(groups.len() + 2);

    let defaults_path = self.root.join("defaults.toml");
    if defaults_path.is_file() {
      layers.push(cache.load(&defaults_path)?.clone());
    }

    for group in &groups {
      validate_name("group", group)?;
      let group_path = self.group_path(group);
      if !group_path.is_file() {
        return Err(RepoError::UnknownGroup {
          node: name.to_string(),
          group: group.clone(),
        });
      }
      debug!(node = name, group = %group, "applying group layer");
      layers.push(cache.load(&group_path)?.clone());
    }

    layers.push(strip_node_keys(&node_layer));

    let attributes = merge_layers(&layers);
    info!(node = name, layers = layers.len(), "loaded node configuration");

    Ok(NodeConfig {
      name: name.to_string(),
      hostname: hostname.filter(|h| h != "localhost"),
      groups,
      ssh_user,
      ssh_port,
      attributes,
    })
  }
}

impl NodeConfig {
  pub fn is_local(&self) -> bool {
    self.hostname.is_none()
  }

  /// Construct every item declared under `items`.
  pub fn items(&self, registry: &ItemRegistry) -> Result<Vec<Box<dyn Item>>, RepoError> {
    let Some(types) = self.attributes.as_map().and_then(|map| map.get("items")) else {
      return Ok(Vec::new());
    };
    let types = types.as_map().ok_or_else(|| self.malformed("'items' must be a table"))?;

    let mut items = Vec::new();
    for (type_name, instances) in types {
      let instances = instances
        .as_map()
        .ok_or_else(|| self.malformed(format!("'items.{type_name}' must be a table")))?;
      for (item_name, attributes) in instances {
        let attributes = attributes
          .as_map()
          .ok_or_else(|| self.malformed(format!("'items.{type_name}.{item_name}' must be a table")))?;
        items.push(registry.create(type_name, item_name, attributes)?);
      }
    }

    debug!(node = %self.name, items = items.len(), "constructed items");
    Ok(items)
  }

  /// A [`Node`] that runs commands on this host.
  pub fn connect(&self) -> Box<dyn Node> {
    match &self.hostname {
      None => Box::new(LocalNode::new(&self.name)),
      Some(hostname) => {
        let mut node = SshNode::new(&self.name, hostname);
        if let Some(user) = &self.ssh_user {
          node = node.with_user(user);
        }
        if let Some(port) = self.ssh_port {
          node = node.with_port(port);
        }
        Box::new(node)
      }
    }
  }

  fn malformed(&self, reason: impl Into<String>) -> RepoError {
    RepoError::MalformedItems {
      node: self.name.clone(),
      reason: reason.into(),
    }
  }
}

fn strip_node_keys(layer: &ConfigValue) -> ConfigValue {
  match layer.as_map() {
    Some(map) => ConfigValue::Map(
      map
        .iter()
        .filter(|(key, _)| !NODE_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect(),
    ),
    None => layer.clone(),
  }
}

fn optional_string(layer: &ConfigValue, field: &'static str, path: &Path) -> Result<Option<String>, RepoError> {
  match layer.as_map().and_then(|map| map.get(field)) {
    None => Ok(None),
    Some(value) => value.as_str().map(|s| Some(s.to_string())).ok_or(RepoError::InvalidField {
      path: path.to_path_buf(),
      field,
      expected: "a string",
    }),
  }
}

fn optional_port(layer: &ConfigValue, path: &Path) -> Result<Option<u16>, RepoError> {
  let Some(value) = layer.as_map().and_then(|map| map.get("ssh_port")) else {
    return Ok(None);
  };
  match value.unwrapped() {
    ConfigValue::Integer(n) if (1..=i64::from(u16::MAX)).contains(n) => Ok(u16::try_from(*n).ok()),
    _ => Err(RepoError::InvalidField {
      path: path.to_path_buf(),
      field: "ssh_port",
      expected: "a port number",
    }),
  }
}

fn string_list(layer: &ConfigValue, field: &'static str, path: &Path) -> Result<Vec<String>, RepoError> {
  let invalid = || RepoError::InvalidField {
    path: path.to_path_buf(),
    field,
    expected: "a list of strings",
  };

  match layer.as_map().and_then(|map| map.get(field)) {
    None => Ok(Vec::new()),
    Some(value) => value
      .as_sequence()
      .ok_or_else(invalid)?
      .iter()
      .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
      .collect(),
  }
}

#[cfg(test)]
mod tests {
  use std::fs;

  use tempfile::TempDir;

  use super::*;
  use crate::item::ValidationError;

  fn write(dir: &TempDir, path: &str, content: &str) {
    let full = dir.path().join(path);
    if let Some(parent) = full.parent() {
      fs::create_dir_all(parent).unwrap();
    }
    fs::write(full, content).unwrap();
  }

  fn fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(
      &dir,
      "defaults.toml",
      r#"
      packages = ["vim"]
      timezone = "UTC"

      [items.pkg_apt.vim]
      "#,
    );
    write(
      &dir,
      "groups/web.toml",
      r#"
      packages = ["nginx"]

      [items.pkg_apt.nginx]
      "#,
    );
    write(
      &dir,
      "groups/eu.toml",
      r#"
      timezone = "Europe/Berlin"
      "#,
    );
    write(
      &dir,
      "nodes/web01.toml",
      r#"
      hostname = "web01.example.com"
      ssh_user = "deploy"
      groups = ["web", "eu"]
      packages = { "$atomic" = ["htop"] }

      [items.pkg_apt.telnet]
      installed = false
      needs = ["pkg_apt:nginx"]
      "#,
    );
    write(&dir, "nodes/local.toml", "hostname = \"localhost\"\n");
    dir
  }

  #[test]
  fn open_requires_a_directory() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("file");
    fs::write(&file, "").unwrap();
    assert!(matches!(Repository::open(&file), Err(RepoError::NotADirectory(_))));
  }

  #[test]
  fn lists_nodes_sorted() {
    let dir = fixture();
    write(&dir, "nodes/README.md", "not a node");
    let repo = Repository::open(dir.path()).unwrap();
    assert_eq!(repo.node_names().unwrap(), vec!["local", "web01"]);
  }

  #[test]
  fn layers_defaults_groups_and_node() {
    let dir = fixture();
    let repo = Repository::open(dir.path()).unwrap();
    let mut cache = ConfigCache::new();

    let node = repo.load_node("web01", &mut cache).unwrap();

    assert_eq!(node.hostname.as_deref(), Some("web01.example.com"));
    assert_eq!(node.groups, vec!["web", "eu"]);
    assert_eq!(node.ssh_user.as_deref(), Some("deploy"));
    let attrs = node.attributes.as_map().unwrap();
    // atomic node value replaces the concatenated group/default lists
    assert_eq!(attrs["packages"], ConfigValue::list(["htop".into()]));
    assert_eq!(attrs["timezone"], "Europe/Berlin".into());
    assert!(!attrs.contains_key("hostname"));
    assert!(!attrs.contains_key("groups"));
  }

  #[test]
  fn lists_concatenate_across_layers() {
    let dir = fixture();
    write(&dir, "nodes/web02.toml", "groups = [\"web\"]\n");
    let repo = Repository::open(dir.path()).unwrap();

    let node = repo.load_node("web02", &mut ConfigCache::new()).unwrap();

    assert_eq!(
      node.attributes.as_map().unwrap()["packages"],
      ConfigValue::list(["vim".into(), "nginx".into()])
    );
    assert!(node.is_local());
  }

  #[test]
  fn shared_files_are_parsed_once_per_run() {
    let dir = fixture();
    write(&dir, "nodes/web02.toml", "groups = [\"web\"]\n");
    let repo = Repository::open(dir.path()).unwrap();
    let mut cache = ConfigCache::new();

    repo.load_node("web01", &mut cache).unwrap();
    repo.load_node("web02", &mut cache).unwrap();

    // defaults.toml and groups/web.toml hit on the second node
    assert_eq!(cache.hits(), 2);
    assert_eq!(cache.misses(), 5);
  }

  #[test]
  fn localhost_runs_locally() {
    let dir = fixture();
    let repo = Repository::open(dir.path()).unwrap();
    let node = repo.load_node("local", &mut ConfigCache::new()).unwrap();
    assert!(node.is_local());
    assert_eq!(node.connect().name(), "local");
  }

  #[test]
  fn builds_items_from_all_layers() {
    let dir = fixture();
    let repo = Repository::open(dir.path()).unwrap();
    let node = repo.load_node("web01", &mut ConfigCache::new()).unwrap();

    let items = node.items(&ItemRegistry::builtin()).unwrap();

    let ids: Vec<String> = items.iter().map(|item| item.id().to_string()).collect();
    assert_eq!(ids, vec!["pkg_apt:nginx", "pkg_apt:telnet", "pkg_apt:vim"]);
    assert_eq!(items[1].dependencies().needs.len(), 1);
  }

  #[test]
  fn unknown_node_and_group() {
    let dir = fixture();
    write(&dir, "nodes/orphan.toml", "groups = [\"missing\"]\n");
    let repo = Repository::open(dir.path()).unwrap();
    let mut cache = ConfigCache::new();

    assert!(matches!(repo.load_node("nope", &mut cache), Err(RepoError::UnknownNode(_))));
    assert!(matches!(
      repo.load_node("orphan", &mut cache),
      Err(RepoError::UnknownGroup { group, .. }) if group == "missing"
    ));
  }

  #[test]
  fn invalid_names_are_rejected_before_touching_disk() {
    let dir = fixture();
    write(&dir, "nodes/sneaky.toml", "groups = [\"../nodes/web01\"]\n");
    let repo = Repository::open(dir.path()).unwrap();
    let mut cache = ConfigCache::new();

    assert!(matches!(
      repo.load_node("../web01", &mut cache),
      Err(RepoError::InvalidName { kind: "node", .. })
    ));
    assert!(matches!(
      repo.load_node("sneaky", &mut cache),
      Err(RepoError::InvalidName { kind: "group", .. })
    ));
  }

  #[test]
  fn invalid_node_fields() {
    let dir = fixture();
    write(&dir, "nodes/bad.toml", "groups = \"web\"\n");
    write(&dir, "nodes/badport.toml", "hostname = \"h\"\nssh_port = 70000\n");
    let repo = Repository::open(dir.path()).unwrap();
    let mut cache = ConfigCache::new();

    assert!(matches!(
      repo.load_node("bad", &mut cache),
      Err(RepoError::InvalidField { field: "groups", .. })
    ));
    assert!(matches!(
      repo.load_node("badport", &mut cache),
      Err(RepoError::InvalidField { field: "ssh_port", .. })
    ));
  }

  #[test]
  fn item_errors() {
    let dir = TempDir::new().unwrap();
    write(&dir, "nodes/a.toml", "[items.pkg_foo.vim]\n");
    write(&dir, "nodes/b.toml", "[items.pkg_apt.vim]\ninstalled = 1\n");
    write(&dir, "nodes/c.toml", "[items]\npkg_apt = 3\n");
    let repo = Repository::open(dir.path()).unwrap();
    let registry = ItemRegistry::builtin();
    let mut cache = ConfigCache::new();

    let load = |name: &str, cache: &mut ConfigCache| repo.load_node(name, cache).unwrap().items(&registry);

    assert!(matches!(
      load("a", &mut cache),
      Err(RepoError::Validation(ValidationError::UnknownItemType(t))) if t == "pkg_foo"
    ));
    assert!(matches!(
      load("b", &mut cache),
      Err(RepoError::Validation(ValidationError::InvalidAttribute { .. }))
    ));
    assert!(matches!(load("c", &mut cache), Err(RepoError::MalformedItems { .. })));
  }
}

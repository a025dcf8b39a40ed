//! Layered configuration merge.
//!
//! [`merge`] combines a base configuration with an override, key by key:
//!
//! 1. An override marked [`ConfigValue::Atomic`] replaces the base value.
//! 2. Two mappings are merged recursively.
//! 3. A base list or tuple is extended with the elements of an override
//!    list, tuple or set; a base set takes the union.
//! 4. Anything else: the override wins, type mismatches included.
//!
//! Neither input is modified. The result shares no structure with either
//! input and contains no atomic markers.
//!
//! Layers (defaults, groups, node) are applied by folding with
//! [`merge_layers`], most general first.

use std::collections::BTreeMap;

use crate::value::ConfigValue;

/// Merge `update` on top of `base`, returning an independent value.
pub fn merge(base: &ConfigValue, update: &ConfigValue) -> ConfigValue {
  let (ConfigValue::Map(base_map), ConfigValue::Map(update_map)) = (base.unwrapped(), update) else {
    return update.to_plain();
  };

  let mut merged: BTreeMap<String, ConfigValue> = base_map.iter().map(|(k, v)| (k.clone(), v.to_plain())).collect();

  for (key, value) in update_map {
    let combined = match base_map.get(key) {
      Some(existing) if !value.is_atomic() => merge_value(existing.unwrapped(), value),
      _ => value.to_plain(),
    };
    merged.insert(key.clone(), combined);
  }

  ConfigValue::Map(merged)
}

/// Fold `layers` into one value, each layer overriding the ones before it.
pub fn merge_layers<'a>(layers: impl IntoIterator<Item = &'a ConfigValue>) -> ConfigValue {
  layers
    .into_iter()
    .fold(ConfigValue::empty_map(), |acc, layer| merge(&acc, layer))
}

fn merge_value(base: &ConfigValue, update: &ConfigValue) -> ConfigValue {
  match (base, update.as_sequence()) {
    (ConfigValue::Map(_), _) => merge(base, update),
    (ConfigValue::List(items), Some(extra)) => ConfigValue::List(concat(items, extra)),
    (ConfigValue::Tuple(items), Some(extra)) => ConfigValue::Tuple(concat(items, extra)),
    (ConfigValue::Set(items), Some(extra)) => ConfigValue::set(concat(items, extra)),
    _ => update.to_plain(),
  }
}

fn concat(base: &[ConfigValue], extra: &[ConfigValue]) -> Vec<ConfigValue> {
  base.iter().chain(extra).map(ConfigValue::to_plain).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn map(entries: Vec<(&str, ConfigValue)>) -> ConfigValue {
    ConfigValue::map(entries)
  }

  #[test]
  fn empty_override_is_identity() {
    let base = map(vec![("a", 1.into()), ("b", map(vec![("c", ConfigValue::list([2.into()]))]))]);
    assert_eq!(merge(&base, &ConfigValue::empty_map()), base);
  }

  #[test]
  fn result_is_independent_of_base() {
    let base = map(vec![("a", map(vec![("x", 1.into())]))]);
    let mut merged = merge(&base, &ConfigValue::empty_map());

    if let ConfigValue::Map(ref mut m) = merged
      && let Some(ConfigValue::Map(inner)) = m.get_mut("a")
    {
      inner.insert("x".to_string(), 99.into());
    }

    assert_eq!(base, map(vec![("a", map(vec![("x", 1.into())]))]));
    assert_ne!(merged, base);
  }

  #[test]
  fn scalar_override_wins() {
    let merged = merge(&map(vec![("a", 1.into())]), &map(vec![("a", 2.into())]));
    assert_eq!(merged, map(vec![("a", 2.into())]));
  }

  #[test]
  fn mappings_merge_recursively() {
    let merged = merge(
      &map(vec![("a", map(vec![("x", 1.into())]))]),
      &map(vec![("a", map(vec![("y", 2.into())]))]),
    );
    assert_eq!(merged, map(vec![("a", map(vec![("x", 1.into()), ("y", 2.into())]))]));
  }

  #[test]
  fn lists_concatenate_in_base_order() {
    let merged = merge(
      &map(vec![("a", ConfigValue::list([1.into(), 2.into()]))]),
      &map(vec![("a", ConfigValue::list([3.into()]))]),
    );
    assert_eq!(merged, map(vec![("a", ConfigValue::list([1.into(), 2.into(), 3.into()]))]));
  }

  #[test]
  fn list_base_accepts_tuple_and_set_overrides() {
    let merged = merge(
      &map(vec![("a", ConfigValue::list([1.into()])), ("b", ConfigValue::list([1.into()]))]),
      &map(vec![("a", ConfigValue::tuple([2.into()])), ("b", ConfigValue::set([3.into()]))]),
    );
    assert_eq!(
      merged,
      map(vec![
        ("a", ConfigValue::list([1.into(), 2.into()])),
        ("b", ConfigValue::list([1.into(), 3.into()])),
      ])
    );
  }

  #[test]
  fn tuple_base_stays_a_tuple() {
    let merged = merge(
      &map(vec![("a", ConfigValue::tuple([1.into()]))]),
      &map(vec![("a", ConfigValue::list([2.into()]))]),
    );
    assert_eq!(merged, map(vec![("a", ConfigValue::tuple([1.into(), 2.into()]))]));
  }

  #[test]
  fn set_base_takes_union() {
    let merged = merge(
      &map(vec![("a", ConfigValue::set([1.into(), 2.into()]))]),
      &map(vec![("a", ConfigValue::list([2.into(), 3.into()]))]),
    );
    assert_eq!(merged, map(vec![("a", ConfigValue::set([1.into(), 2.into(), 3.into()]))]));
  }

  #[test]
  fn atomic_override_replaces_nested_structure() {
    let base = map(vec![(
      "a",
      map(vec![("x", ConfigValue::list([1.into()])), ("y", 2.into())]),
    )]);
    let update = map(vec![("a", ConfigValue::atomic(map(vec![("x", ConfigValue::list([9.into()]))])))]);

    let merged = merge(&base, &update);

    assert_eq!(merged, map(vec![("a", map(vec![("x", ConfigValue::list([9.into()]))]))]));
  }

  #[test]
  fn atomic_list_is_not_concatenated() {
    let merged = merge(
      &map(vec![("a", ConfigValue::list([1.into(), 2.into()]))]),
      &map(vec![("a", ConfigValue::atomic(ConfigValue::list([3.into()])))]),
    );
    assert_eq!(merged, map(vec![("a", ConfigValue::list([3.into()]))]));
  }

  #[test]
  fn type_mismatch_override_wins() {
    let merged = merge(
      &map(vec![("a", map(vec![("x", 1.into())])), ("b", ConfigValue::list([1.into()]))]),
      &map(vec![("a", "scalar".into()), ("b", 5.into())]),
    );
    assert_eq!(merged, map(vec![("a", "scalar".into()), ("b", 5.into())]));
  }

  #[test]
  fn keys_from_either_side_survive() {
    let merged = merge(&map(vec![("a", 1.into())]), &map(vec![("b", 2.into())]));
    assert_eq!(merged, map(vec![("a", 1.into()), ("b", 2.into())]));
  }

  #[test]
  fn non_map_update_is_returned() {
    assert_eq!(merge(&map(vec![("a", 1.into())]), &ConfigValue::from(3)), ConfigValue::from(3));
  }

  #[test]
  fn layers_apply_most_general_first() {
    let defaults = map(vec![("pkgs", ConfigValue::list(["vim".into()])), ("tz", "UTC".into())]);
    let group = map(vec![("pkgs", ConfigValue::list(["nginx".into()]))]);
    let node = map(vec![("tz", "Europe/Berlin".into())]);

    let merged = merge_layers([&defaults, &group, &node]);

    assert_eq!(
      merged,
      map(vec![
        ("pkgs", ConfigValue::list(["vim".into(), "nginx".into()])),
        ("tz", "Europe/Berlin".into()),
      ])
    );
  }

  #[test]
  fn layered_output_has_no_markers() {
    let node = map(vec![("a", ConfigValue::atomic(ConfigValue::list([1.into()])))]);
    let merged = merge_layers([&node]);
    assert_eq!(merged, map(vec![("a", ConfigValue::list([1.into()]))]));
  }
}

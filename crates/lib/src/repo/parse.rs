//! TOML to [`ConfigValue`] conversion.
//!
//! TOML only knows arrays and tables, so the other kinds the merge engine
//! understands are written as single-key marker tables:
//!
//! ```toml
//! packages = { "$atomic" = ["vim"] }   # replace, never merge
//! users = { "$set" = ["alice", "bob"] }
//! pair = { "$tuple" = [1, 2] }
//! ```

use std::collections::BTreeMap;

use thiserror::Error;

use crate::value::ConfigValue;

const ATOMIC: &str = "$atomic";
const SET: &str = "$set";
const TUPLE: &str = "$tuple";

#[derive(Debug, Error)]
pub enum ParseError {
  #[error(transparent)]
  Toml(#[from] toml::de::Error),

  #[error("unknown marker '{0}'")]
  UnknownMarker(String),

  #[error("marker '{0}' must be the only key in its table")]
  MixedMarker(String),

  #[error("marker '{marker}' expects an array, got {found}")]
  MarkerType { marker: String, found: &'static str },
}

/// Parse a TOML document into a mapping.
pub fn parse_document(content: &str) -> Result<ConfigValue, ParseError> {
  let table: toml::Table = toml::from_str(content)?;
  convert_table(&table)
}

fn convert(value: &toml::Value) -> Result<ConfigValue, ParseError> {
  Ok(match value {
    toml::Value::String(s) => ConfigValue::String(s.clone()),
    toml::Value::Integer(n) => ConfigValue::Integer(*n),
    toml::Value::Float(n) => ConfigValue::Float(*n),
    toml::Value::Boolean(b) => ConfigValue::Bool(*b),
    toml::Value::Datetime(dt) => ConfigValue::String(dt.to_string()),
    toml::Value::Array(items) => ConfigValue::List(convert_array(items)?),
    toml::Value::Table(table) => convert_table(table)?,
  })
}

fn convert_array(items: &[toml::Value]) -> Result<Vec<ConfigValue>, ParseError> {
  items.iter().map(convert).collect()
}

fn convert_table(table: &toml::Table) -> Result<ConfigValue, ParseError> {
  if let Some(marker) = table.keys().find(|key| key.starts_with('$')) {
    if table.len() > 1 {
      return Err(ParseError::MixedMarker(marker.clone()));
    }
    return convert_marker(marker, &table[marker.as_str()]);
  }

  let mut map = BTreeMap::new();
  for (key, value) in table {
    map.insert(key.clone(), convert(value)?);
  }
  Ok(ConfigValue::Map(map))
}

fn convert_marker(marker: &str, value: &toml::Value) -> Result<ConfigValue, ParseError> {
  let sequence = || match value {
    toml::Value::Array(items) => convert_array(items),
    other => Err(ParseError::MarkerType {
      marker: marker.to_string(),
      found: other.type_str(),
    }),
  };

  match marker {
    ATOMIC => Ok(ConfigValue::atomic(convert(value)?)),
    SET => Ok(ConfigValue::set(sequence()?)),
    TUPLE => Ok(ConfigValue::Tuple(sequence()?)),
    other => Err(ParseError::UnknownMarker(other.to_string())),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn plain_document() {
    let value = parse_document(
      r#"
      hostname = "web01"
      port = 22
      ratio = 0.5
      enabled = true
      groups = ["web", "eu"]

      [nested]
      key = "value"
      "#,
    )
    .unwrap();

    let map = value.as_map().unwrap();
    assert_eq!(map["hostname"], "web01".into());
    assert_eq!(map["port"], 22.into());
    assert_eq!(map["ratio"], 0.5.into());
    assert_eq!(map["enabled"], true.into());
    assert_eq!(map["groups"], ConfigValue::list(["web".into(), "eu".into()]));
    assert_eq!(map["nested"], ConfigValue::map([("key", "value".into())]));
  }

  #[test]
  fn markers() {
    let value = parse_document(
      r#"
      a = { "$atomic" = ["x"] }
      s = { "$set" = ["x", "y", "x"] }
      t = { "$tuple" = [1, 2] }
      m = { "$atomic" = { k = 1 } }
      "#,
    )
    .unwrap();

    let map = value.as_map().unwrap();
    assert_eq!(map["a"], ConfigValue::atomic(ConfigValue::list(["x".into()])));
    assert_eq!(map["s"], ConfigValue::set(["x".into(), "y".into()]));
    assert_eq!(map["t"], ConfigValue::tuple([1.into(), 2.into()]));
    assert_eq!(map["m"], ConfigValue::atomic(ConfigValue::map([("k", 1.into())])));
  }

  #[test]
  fn marker_errors() {
    assert!(matches!(
      parse_document(r#"x = { "$bogus" = 1 }"#),
      Err(ParseError::UnknownMarker(m)) if m == "$bogus"
    ));
    assert!(matches!(
      parse_document(r#"x = { "$set" = [1], other = 2 }"#),
      Err(ParseError::MixedMarker(_))
    ));
    assert!(matches!(
      parse_document(r#"x = { "$tuple" = 1 }"#),
      Err(ParseError::MarkerType { found: "integer", .. })
    ));
  }

  #[test]
  fn invalid_toml() {
    assert!(matches!(parse_document("this is = = not toml"), Err(ParseError::Toml(_))));
  }
}

//! Node and group name rules.

use super::RepoError;

/// Check that `name` is usable as a node or group name.
///
/// Names map to file names, so they are limited to ASCII letters, digits and
/// `. _ + -`, must not be empty and must not start with a dot.
pub fn validate_name(kind: &'static str, name: &str) -> Result<(), RepoError> {
  let valid = !name.is_empty()
    && !name.starts_with('.')
    && name
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '+' | '-'));

  if valid {
    Ok(())
  } else {
    Err(RepoError::InvalidName {
      kind,
      name: name.to_string(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accepts_usual_names() {
    for name in ["web01", "db.example.com", "edge_1", "c++", "a-b"] {
      assert!(validate_name("node", name).is_ok(), "{name}");
    }
  }

  #[test]
  fn rejects_bad_names() {
    for name in ["", ".hidden", "a/b", "../x", "with space", "ümlaut", "a:b"] {
      assert!(validate_name("group", name).is_err(), "{name}");
    }
  }

  #[test]
  fn error_names_the_kind() {
    let err = validate_name("group", ".x").unwrap_err();
    assert_eq!(err.to_string(), "invalid group name '.x'");
  }
}

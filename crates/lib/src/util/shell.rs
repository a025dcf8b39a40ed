//! Shell quoting.

/// Characters that never need quoting in a POSIX shell word.
fn is_safe(c: char) -> bool {
  c.is_ascii_alphanumeric() || "@%+=:,./-_".contains(c)
}

/// Quote `word` so a POSIX shell treats it as a single literal argument.
///
/// Safe words pass through unchanged; everything else is wrapped in single
/// quotes with embedded single quotes spelled `'"'"'`.
pub fn quote(word: &str) -> String {
  if word.is_empty() {
    return "''".to_string();
  }
  if word.chars().all(is_safe) {
    return word.to_string();
  }
  format!("'{}'", word.replace('\'', r#"'"'"'"#))
}

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Result, bail};

/// Ask a yes/no question on the terminal. `force` answers yes without asking.
pub fn confirm(message: &str, default: bool, force: bool) -> Result<bool> {
  if force {
    return Ok(true);
  }

  if !io::stdin().is_terminal() || !io::stderr().is_terminal() {
    bail!("Cannot prompt for confirmation in non-interactive mode. Use --force to proceed.");
  }

  ask(message, default, &mut io::stdin().lock(), &mut io::stderr())
}

/// Ask until the answer is yes, no, or empty (which picks `default`).
pub fn ask(message: &str, default: bool, input: &mut impl BufRead, output: &mut impl Write) -> Result<bool> {
  let hint = if default { "[Y/n]" } else { "[y/N]" };

  loop {
    write!(output, "{} {} ", message, hint)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
      bail!("No answer given");
    }

    let answer = line.strip_suffix('\n').unwrap_or(&line);
    let answer = answer.strip_suffix('\r').unwrap_or(answer);
    if answer.is_empty() {
      return Ok(default);
    }

    match answer.trim().to_ascii_lowercase().as_str() {
      "y" | "yes" => return Ok(true),
      "n" | "no" => return Ok(false),
      _ => writeln!(output, "Please answer with 'y' or 'n'.")?,
    }
  }
}

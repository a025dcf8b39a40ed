//! Shared utilities.
//!
//! Shell quoting and test helpers.

pub mod shell;

#[cfg(test)]
pub mod testutil;

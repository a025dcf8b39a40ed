//! converge-lib: Core types and logic for converge
//!
//! This crate provides the building blocks of a convergence run:
//! - `Item`: a piece of desired state with inspect/describe/fix steps
//! - `ItemGraph`: dependency graph and execution waves over items
//! - `merge`: layered configuration merge
//! - `Node`: where item commands run (locally or over SSH)
//! - `Repository`: TOML repository loader producing per-node configuration

pub mod graph;
pub mod item;
pub mod merge;
pub mod node;
pub mod repo;
pub mod util;
pub mod value;

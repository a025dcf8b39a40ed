//! Per-run state machine of a single item.
//!
//! ```text
//! Created → Validated → Inspected ─┬→ Correct
//!                                  └→ Incorrect → Fixed
//! ```
//!
//! `Correct` and `Fixed` are terminal. An execution error while inspecting
//! or fixing moves the item to the terminal `Failed` state: the item is done
//! for this run and nothing is rolled back. Starting over means a new run
//! (a new [`ItemRun`]).

use thiserror::Error;
use tracing::{debug, info, warn};

use super::{Item, ItemId, ItemStatus};
use crate::node::{ExecutionError, Node};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
  Created,
  Validated,
  Inspected,
  Correct,
  Incorrect,
  Fixed,
  Failed,
}

impl ItemState {
  pub fn can_transition_to(self, next: ItemState) -> bool {
    use ItemState::*;
    matches!(
      (self, next),
      (Created, Validated)
        | (Validated, Inspected)
        | (Inspected, Correct)
        | (Inspected, Incorrect)
        | (Incorrect, Fixed)
        | (Validated, Failed)
        | (Incorrect, Failed)
    )
  }

  pub fn is_terminal(self) -> bool {
    matches!(self, ItemState::Correct | ItemState::Fixed | ItemState::Failed)
  }
}

#[derive(Debug, Error, PartialEq)]
#[error("invalid transition for {item}: {from:?} -> {to:?}")]
pub struct LifecycleError {
  pub item: ItemId,
  pub from: ItemState,
  pub to: ItemState,
}

#[derive(Debug, Error)]
pub enum ConvergeError {
  #[error(transparent)]
  Lifecycle(#[from] LifecycleError),

  #[error(transparent)]
  Execution(#[from] ExecutionError),
}

/// Drives one item through a single convergence run.
#[derive(Debug)]
pub struct ItemRun<'a> {
  item: &'a dyn Item,
  state: ItemState,
  status: Option<ItemStatus>,
}

impl<'a> ItemRun<'a> {
  /// Start a run for an item whose attributes have not been accepted yet.
  pub fn created(item: &'a dyn Item) -> Self {
    Self {
      item,
      state: ItemState::Created,
      status: None,
    }
  }

  /// Record that the item's attributes passed validation.
  pub fn validated(mut self) -> Result<Self, LifecycleError> {
    self.advance(ItemState::Validated)?;
    Ok(self)
  }

  /// Start a run for a constructed item.
  ///
  /// [`ItemType::from_config`](super::ItemType::from_config) validates, so a
  /// constructed item skips `Created`.
  pub fn new(item: &'a dyn Item) -> Self {
    Self {
      state: ItemState::Validated,
      ..Self::created(item)
    }
  }

  pub fn item(&self) -> &'a dyn Item {
    self.item
  }

  pub fn state(&self) -> ItemState {
    self.state
  }

  /// Status recorded by [`ItemRun::inspect`].
  pub fn status(&self) -> Option<&ItemStatus> {
    self.status.as_ref()
  }

  fn advance(&mut self, next: ItemState) -> Result<(), LifecycleError> {
    if !self.state.can_transition_to(next) {
      return Err(LifecycleError {
        item: self.item.id(),
        from: self.state,
        to: next,
      });
    }
    debug!(item = %self.item.id(), from = ?self.state, to = ?next, "item state change");
    self.state = next;
    Ok(())
  }

  fn ensure(&self, next: ItemState) -> Result<(), LifecycleError> {
    if self.state.can_transition_to(next) {
      Ok(())
    } else {
      Err(LifecycleError {
        item: self.item.id(),
        from: self.state,
        to: next,
      })
    }
  }

  /// Inspect the item, ending in `Correct` or `Incorrect`.
  pub fn inspect(&mut self, node: &dyn Node) -> Result<&ItemStatus, ConvergeError> {
    self.ensure(ItemState::Inspected)?;

    let status = match self.item.inspect(node) {
      Ok(status) => status,
      Err(err) => {
        self.advance(ItemState::Failed)?;
        return Err(err.into());
      }
    };

    self.advance(ItemState::Inspected)?;
    self.advance(if status.correct {
      ItemState::Correct
    } else {
      ItemState::Incorrect
    })?;

    Ok(self.status.insert(status))
  }

  /// Preview of the pending fix; `None` unless the item is `Incorrect`.
  pub fn describe(&self) -> Option<String> {
    match (&self.status, self.state) {
      (Some(status), ItemState::Incorrect) => Some(self.item.describe(status)),
      _ => None,
    }
  }

  /// Fix an `Incorrect` item.
  pub fn fix(&mut self, node: &dyn Node) -> Result<(), ConvergeError> {
    self.ensure(ItemState::Fixed)?;
    let Some(status) = self.status.as_ref() else {
      return Err(
        LifecycleError {
          item: self.item.id(),
          from: self.state,
          to: ItemState::Fixed,
        }
        .into(),
      );
    };

    match self.item.fix(node, status) {
      Ok(()) => {
        self.advance(ItemState::Fixed)?;
        info!(item = %self.item.id(), "item fixed");
        Ok(())
      }
      Err(err) => {
        warn!(item = %self.item.id(), error = %err, "fix failed");
        self.advance(ItemState::Failed)?;
        Err(err.into())
      }
    }
  }

  /// Re-inspect a `Fixed` item without changing state.
  pub fn verify(&self, node: &dyn Node) -> Result<ItemStatus, ConvergeError> {
    if self.state != ItemState::Fixed {
      return Err(
        LifecycleError {
          item: self.item.id(),
          from: self.state,
          to: ItemState::Fixed,
        }
        .into(),
      );
    }
    Ok(self.item.inspect(node)?)
  }
}

/// How a convergence run of one item ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
  /// Nothing to do.
  Correct(ItemStatus),
  /// The item was fixed. `after` holds the re-inspection, if requested.
  Fixed {
    before: ItemStatus,
    after: Option<ItemStatus>,
  },
}

/// Inspect `item` and fix it if needed.
pub fn converge(item: &dyn Item, node: &dyn Node, reinspect: bool) -> Result<Outcome, ConvergeError> {
  let mut run = ItemRun::new(item);
  let status = run.inspect(node)?.clone();
  if run.state() == ItemState::Correct {
    return Ok(Outcome::Correct(status));
  }

  run.fix(node)?;
  let after = if reinspect { Some(run.verify(node)?) } else { None };
  Ok(Outcome::Fixed { before: status, after })
}

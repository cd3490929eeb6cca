use crate::{
  block::{GRANULARITY, HEADER_SIZE},
  error::ConfigError,
  strategy::{ListOrder, Strategy},
};

/// Bytes requested from the heap source on every growth.
pub const DEFAULT_INCREMENT: usize = 1024;

/// Tunables for a [`Heap`](crate::Heap).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapConfig {
  pub increment: usize,
  pub strategy: Strategy,
  pub list_order: ListOrder,
}

impl Default for HeapConfig {
  fn default() -> Self {
    Self {
      increment: DEFAULT_INCREMENT,
      strategy: Strategy::default(),
      list_order: ListOrder::default(),
    }
  }
}

impl HeapConfig {
  pub fn with_increment(
    mut self,
    increment: usize,
  ) -> Self {
    self.increment = increment;
    self
  }

  pub fn with_strategy(
    mut self,
    strategy: Strategy,
  ) -> Self {
    self.strategy = strategy;
    self
  }

  pub fn with_list_order(
    mut self,
    list_order: ListOrder,
  ) -> Self {
    self.list_order = list_order;
    self
  }

  /// Checks that one increment can be formatted as a usable free block.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.increment % GRANULARITY != 0 {
      return Err(ConfigError::IncrementMisaligned {
        increment: self.increment,
        granularity: GRANULARITY,
      });
    }
    if self.increment <= HEADER_SIZE {
      return Err(ConfigError::IncrementTooSmall {
        increment: self.increment,
        granularity: GRANULARITY,
      });
    }
    Ok(())
  }
}

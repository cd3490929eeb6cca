use thiserror::Error;

/// Failures reported by a [`HeapSource`](crate::source::HeapSource).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapError {
  /// The source could not supply another increment.
  #[error("heap source exhausted while growing by {increment} bytes")]
  Exhausted { increment: usize },

  /// A new segment did not start at the current growth cursor.
  #[error("heap segment at {found:#x} does not continue the heap ending at {expected:#x}")]
  Discontiguous { expected: usize, found: usize },
}

/// Reasons an allocation request produced no memory.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
  #[error("zero-sized allocation")]
  ZeroSize,

  #[error("out of memory: {0}")]
  OutOfMemory(#[from] HeapError),

  /// The request exceeds what a single growth increment can ever hold and no
  /// existing free block is large enough.
  #[error("request of {requested} bytes exceeds the {max} bytes one increment can hold")]
  TooLarge { requested: usize, max: usize },
}

/// Rejected [`HeapConfig`](crate::config::HeapConfig) values.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
  #[error("increment of {increment} bytes cannot hold a header plus one {granularity}-byte unit")]
  IncrementTooSmall { increment: usize, granularity: usize },

  #[error("increment of {increment} bytes is not a multiple of {granularity}")]
  IncrementMisaligned { increment: usize, granularity: usize },
}

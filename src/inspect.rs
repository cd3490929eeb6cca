//! Read-only views of the heap layout.

use std::fmt;

use crate::{
  block::{Block, GRANULARITY},
  heap::Heap,
  source::HeapSource,
};

/// Snapshot of one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  /// Address of the data region.
  pub address: usize,
  /// Capacity of the data region in bytes.
  pub size: usize,
  pub is_free: bool,
}

impl BlockInfo {
  fn of(block: *mut Block) -> Self {
    unsafe {
      Self {
        address: Block::data(block) as usize,
        size: (*block).size * GRANULARITY,
        is_free: (*block).is_free,
      }
    }
  }
}

impl<S: HeapSource> Heap<S> {
  /// Every block from the heap start, in address order.
  pub fn inspect(&self) -> Vec<BlockInfo> {
    self.blocks().map(BlockInfo::of).collect()
  }

  /// Free blocks in free-list order.
  pub fn free_list(&self) -> Vec<BlockInfo> {
    self.free_blocks().map(BlockInfo::of).collect()
  }

  /// Writes the block dump to stdout.
  pub fn print_heap(&self) {
    print!("{self}");
  }
}

impl<S: HeapSource> fmt::Display for Heap<S> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    for block in self.inspect() {
      writeln!(f, "---------------")?;
      writeln!(f, "Free: {}", u8::from(block.is_free))?;
      writeln!(f, "Size: {}", block.size)?;
    }
    writeln!(f, "---------------")
  }
}

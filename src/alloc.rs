//! Allocation: free-list search, growth on a miss, splitting.

use std::ptr::NonNull;

use log::trace;

use crate::{
  block::{Block, GRANULARITY, HEADER_UNITS, blocks_needed},
  error::{AllocError, HeapError},
  heap::{Heap, free_from},
  source::HeapSource,
  strategy::Strategy,
};

impl<S: HeapSource> Heap<S> {
  /// Allocates at least `bytes` bytes and returns the start of the data
  /// region, aligned to [`GRANULARITY`].
  ///
  /// A miss in the free list grows the heap by exactly one increment and
  /// searches once more. Requests that no single increment could ever hold
  /// fail with [`AllocError::TooLarge`] unless a coalesced free block already
  /// fits them.
  pub fn allocate(
    &mut self,
    bytes: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    if bytes == 0 {
      return Err(AllocError::ZeroSize);
    }

    let capacity = Block::capacity_of(self.config.increment);
    let too_large = AllocError::TooLarge {
      requested: bytes,
      max: capacity * GRANULARITY,
    };
    let needed = blocks_needed(bytes);
    self.ensure_initialized()?;

    let block = match self.find_fit(needed) {
      Some(block) => block,
      None if needed > capacity => return Err(too_large),
      None => {
        self.grow()?;
        self.find_fit(needed).ok_or(HeapError::Exhausted {
          increment: self.config.increment,
        })?
      }
    };

    unsafe {
      // Searching resumes here next time; splitting or unlinking moves the
      // rover on to the block's successor.
      self.rover = block;

      if (*block).size > needed + HEADER_UNITS {
        self.split(block, needed);
      }

      self.unlink(block);
      (*block).is_free = false;

      trace!(
        "allocate({}): {} units at {:?}",
        bytes,
        (*block).size,
        block
      );

      Ok(NonNull::new_unchecked(Block::data(block)))
    }
  }

  /// Picks a free block of at least `needed` units with the current strategy.
  fn find_fit(
    &self,
    needed: usize,
  ) -> Option<*mut Block> {
    let fits = |block: &*mut Block| unsafe { (**block).is_free && (**block).size >= needed };
    let size = |block: &*mut Block| unsafe { (**block).size };

    match self.config.strategy {
      Strategy::FirstFit => self.free_blocks().find(fits),
      Strategy::BestFit => self.free_blocks().filter(fits).min_by_key(size),
      Strategy::WorstFit => self.free_blocks().max_by_key(size).filter(fits),
      Strategy::NextFit => {
        let from = if self.rover.is_null() {
          self.free_head
        } else {
          self.rover
        };
        free_from(from)
          .chain(self.free_blocks().take_while(|&block| block != from))
          .find(fits)
      }
    }
  }

  /// Carves the tail of `block` beyond `needed` units into a new free block
  /// that takes over `block`'s place in the free list.
  ///
  /// # Safety
  ///
  /// `block` must be on the free list with `size > needed + HEADER_UNITS`.
  unsafe fn split(
    &mut self,
    block: *mut Block,
    needed: usize,
  ) {
    unsafe {
      let remaining = (*block).size - needed - HEADER_UNITS;
      let at = Block::data(block).add(needed * GRANULARITY);
      let rest = Block::format(at, remaining, true);

      self.replace_free(block, rest);
      (*block).size = needed;

      trace!("split {:?}: {} units kept, {} units at {:?}", block, needed, remaining, rest);
    }
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use proptest::prelude::*;

  use crate::{
    block::{Block, GRANULARITY, HEADER_SIZE, HEADER_UNITS},
    config::HeapConfig,
    error::{AllocError, HeapError},
    heap::Heap,
    source::Arena,
    strategy::{ListOrder, Strategy},
  };

  fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
  }

  fn capacity(ptr: std::ptr::NonNull<u8>) -> usize {
    unsafe { (*Block::from_data(ptr.as_ptr())).size * GRANULARITY }
  }

  #[test]
  fn test_zero_size_has_no_effect() {
    let mut heap = Heap::new(Arena::new(1024));

    assert_eq!(heap.allocate(0), Err(AllocError::ZeroSize));
    assert_eq!(heap.heap_size(), 0);
    assert_eq!(heap.growths(), 0);
    assert!(heap.inspect().is_empty());
  }

  #[test]
  fn test_first_allocation_splits_initial_block() {
    init_logger();
    let mut heap = Heap::new(Arena::new(1024));

    let a = heap.allocate(10).unwrap();

    assert_eq!(a.as_ptr(), Block::data(heap.start));
    assert_eq!(capacity(a), 16);
    assert_eq!(a.as_ptr() as usize % GRANULARITY, 0);

    let blocks = heap.inspect();
    assert_eq!(blocks.len(), 2);
    assert!(!blocks[0].is_free);
    assert!(blocks[1].is_free);
    assert_eq!(blocks[1].size, 1024 - 2 * HEADER_SIZE - 16);
    heap.assert_consistent();
  }

  #[test]
  fn test_consecutive_allocations_do_not_overlap() {
    let mut heap = Heap::new(Arena::new(1024));

    let a = heap.allocate(10).unwrap();
    let b = heap.allocate(20).unwrap();

    assert!(b > a);
    assert!(a.as_ptr() as usize + capacity(a) <= b.as_ptr() as usize - HEADER_SIZE);
    assert_eq!(capacity(b), 32);
    heap.assert_consistent();
  }

  #[test]
  fn test_whole_block_used_when_remainder_too_small() {
    let mut heap = Heap::new(Arena::new(1024));
    let whole = Block::capacity_of(1024);

    // Leaves exactly one header worth of units, which cannot hold a block.
    let p = heap.allocate((whole - HEADER_UNITS) * GRANULARITY).unwrap();

    assert_eq!(capacity(p), whole * GRANULARITY);
    assert!(heap.free_blocks().next().is_none());
    heap.assert_consistent();
  }

  #[test]
  fn test_smallest_split_leaves_one_unit() {
    let mut heap = Heap::new(Arena::new(1024));
    let whole = Block::capacity_of(1024);

    heap.allocate((whole - HEADER_UNITS - 1) * GRANULARITY).unwrap();

    let free: Vec<_> = heap.inspect().into_iter().filter(|b| b.is_free).collect();
    assert_eq!(free.len(), 1);
    assert_eq!(free[0].size, GRANULARITY);
    heap.assert_consistent();
  }

  #[test]
  fn test_exhausting_first_increment_grows_once() {
    init_logger();
    let mut heap = Heap::new(Arena::new(4096));

    let first = heap.allocate(100).unwrap();
    let mut last = first;
    while heap.growths() == 1 {
      last = heap.allocate(100).unwrap();
    }

    assert_eq!(heap.growths(), 2);
    assert_eq!(heap.heap_size(), 2048);
    assert!(last.as_ptr() as usize >= heap.start as usize + 1024);
    heap.assert_consistent();
  }

  #[test]
  fn test_growth_failure_is_out_of_memory() {
    let mut heap = Heap::new(Arena::new(1024));

    let whole = Block::capacity_of(1024) * GRANULARITY;
    heap.allocate(whole).unwrap();

    assert_eq!(
      heap.allocate(1),
      Err(AllocError::OutOfMemory(HeapError::Exhausted { increment: 1024 }))
    );
    assert_eq!(heap.growths(), 1);
    heap.assert_consistent();
  }

  #[test]
  fn test_request_beyond_one_increment() {
    let mut heap = Heap::new(Arena::new(8192));

    let result = heap.allocate(2000);

    assert!(matches!(result, Err(AllocError::TooLarge { requested: 2000, .. })));
    assert_eq!(heap.growths(), 1);
    assert!(matches!(
      heap.allocate(usize::MAX),
      Err(AllocError::TooLarge { .. })
    ));
  }

  #[test]
  fn test_first_fit_takes_first_listed_block() {
    let mut heap = Heap::new(Arena::new(1024));
    let a = heap.allocate(64).unwrap();
    let _guard1 = heap.allocate(16).unwrap();
    let b = heap.allocate(32).unwrap();
    let _guard2 = heap.allocate(16).unwrap();

    unsafe {
      heap.release(a.as_ptr());
      heap.release(b.as_ptr());
    }

    // LIFO: `b` is at the head and big enough.
    assert_eq!(heap.allocate(16).unwrap(), b);
  }

  #[test]
  fn test_best_fit_takes_smallest_sufficient_block() {
    let config = HeapConfig::default().with_strategy(Strategy::BestFit);
    let mut heap = Heap::with_config(Arena::new(1024), config).unwrap();
    let a = heap.allocate(32).unwrap();
    let _guard1 = heap.allocate(16).unwrap();
    let b = heap.allocate(96).unwrap();
    let _guard2 = heap.allocate(16).unwrap();

    unsafe {
      heap.release(b.as_ptr());
      heap.release(a.as_ptr());
    }

    assert_eq!(heap.allocate(20).unwrap(), a);
    assert_eq!(heap.allocate(80).unwrap(), b);
    heap.assert_consistent();
  }

  #[test]
  fn test_worst_fit_takes_largest_block() {
    let config = HeapConfig::default().with_strategy(Strategy::WorstFit);
    let mut heap = Heap::with_config(Arena::new(1024), config).unwrap();
    let a = heap.allocate(32).unwrap();
    let _guard = heap.allocate(16).unwrap();

    unsafe { heap.release(a.as_ptr()) };

    // The tail of the increment is larger than `a`.
    let c = heap.allocate(16).unwrap();
    assert_ne!(c, a);
    assert!(c > a);
    heap.assert_consistent();
  }

  #[test]
  fn test_next_fit_resumes_after_last_allocation() {
    let config = HeapConfig::default()
      .with_strategy(Strategy::NextFit)
      .with_list_order(ListOrder::AddressOrdered);
    let mut heap = Heap::with_config(Arena::new(1024), config).unwrap();

    // Twenty-one 16-byte blocks use up the increment exactly.
    let blocks: Vec<_> = (0..21).map(|_| heap.allocate(16).unwrap()).collect();
    assert!(heap.free_blocks().next().is_none());

    unsafe {
      heap.release(blocks[0].as_ptr());
      heap.release(blocks[2].as_ptr());
      heap.release(blocks[4].as_ptr());
    }

    assert_eq!(heap.allocate(16).unwrap(), blocks[0]);
    unsafe { heap.release(blocks[0].as_ptr()) };

    // First-fit would hand `blocks[0]` straight back.
    assert_eq!(heap.allocate(16).unwrap(), blocks[2]);
    assert_eq!(heap.allocate(16).unwrap(), blocks[4]);

    // Past the end of the list the search wraps to the head.
    assert_eq!(heap.allocate(16).unwrap(), blocks[0]);
    heap.assert_consistent();
  }

  #[test]
  fn test_strategy_switch_at_runtime() {
    let mut heap = Heap::new(Arena::new(1024));

    assert_eq!(heap.strategy(), Strategy::FirstFit);
    heap.set_strategy(Strategy::BestFit);
    assert_eq!(heap.strategy(), Strategy::BestFit);

    let p = heap.allocate(40).unwrap();
    assert_eq!(capacity(p), 48);
  }

  proptest! {
    #[test]
    fn prop_capacity_covers_request(size in 1usize..=Block::capacity_of(1024) * GRANULARITY) {
      let mut heap = Heap::new(Arena::new(1024));

      let p = heap.allocate(size).unwrap();

      prop_assert!(capacity(p) >= size);
      prop_assert!(capacity(p) < size + GRANULARITY * (HEADER_UNITS + 1));
      prop_assert_eq!(p.as_ptr() as usize % GRANULARITY, 0);
    }

    #[test]
    fn prop_live_blocks_never_overlap(sizes in prop::collection::vec(1usize..300, 1..40)) {
      let mut heap = Heap::new(Arena::new(64 * 1024));
      let mut live = Vec::new();

      for size in sizes {
        let p = heap.allocate(size).unwrap();
        live.push((p.as_ptr() as usize, capacity(p)));
      }

      let starts: HashSet<_> = live.iter().map(|&(start, _)| start).collect();
      prop_assert_eq!(starts.len(), live.len());

      live.sort_unstable();
      for pair in live.windows(2) {
        prop_assert!(pair[0].0 + pair[0].1 <= pair[1].0);
      }
      heap.assert_consistent();
    }
  }
}

//! Release: coalescing with address neighbours and reinsertion.

use std::ptr;

use log::trace;

use crate::{
  block::{Block, HEADER_UNITS},
  heap::Heap,
  source::HeapSource,
};

impl<S: HeapSource> Heap<S> {
  /// Returns the block holding `ptr` to the heap, merging it with free
  /// neighbours. A null `ptr` is ignored.
  ///
  /// # Safety
  ///
  /// The caller must ensure that:
  ///
  /// - `ptr` is null or was returned by [`allocate`](Self::allocate) on this
  ///   same heap
  /// - `ptr` has not been released since it was allocated
  /// - nothing reads or writes through `ptr` afterwards
  ///
  /// None of this is checked; violating it corrupts the heap.
  pub unsafe fn release(
    &mut self,
    ptr: *mut u8,
  ) {
    if ptr.is_null() {
      return;
    }

    unsafe {
      let block = Block::from_data(ptr);
      (*block).is_free = true;
      (*block).free_next = ptr::null_mut();
      (*block).free_prev = ptr::null_mut();

      // Left first: merging right first would leave `block` stale when the
      // left neighbour absorbs it.
      let block = self.coalesce_left(block);
      let block = self.coalesce_right(block);

      self.insert_free(block);
      self.last_released = block;

      trace!("release({:?}): free block of {} units at {:?}", ptr, (*block).size, block);
    }
  }

  /// Folds `block` into its physically previous block if that one is free.
  /// Returns the block that now covers `block`.
  unsafe fn coalesce_left(
    &mut self,
    block: *mut Block,
  ) -> *mut Block {
    unsafe {
      match self.physically_previous(block) {
        Some(left) if (*left).is_free => {
          self.unlink(left);
          (*left).size += (*block).size + HEADER_UNITS;
          trace!("coalesced {:?} into left neighbour {:?}", block, left);
          left
        }
        _ => block,
      }
    }
  }

  /// Absorbs the physically next block into `block` if that one is free.
  unsafe fn coalesce_right(
    &mut self,
    block: *mut Block,
  ) -> *mut Block {
    unsafe {
      if let Some(right) = self.physically_next(block) {
        if (*right).is_free {
          self.unlink(right);
          (*block).size += (*right).size + HEADER_UNITS;
          trace!("coalesced right neighbour {:?} into {:?}", right, block);
        }
      }
      block
    }
  }
}

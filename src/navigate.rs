//! Address-order navigation, independent of the free list.

use std::{marker::PhantomData, ptr};

use crate::{block::Block, heap::Heap, source::HeapSource};

/// Block that physically follows `block`, or `None` at the growth cursor.
///
/// # Safety
///
/// `block` must be a valid header below `end`.
unsafe fn next_in(
  block: *mut Block,
  end: *mut u8,
) -> Option<*mut Block> {
  let next = block
    .cast::<u8>()
    .wrapping_add(Block::footprint(unsafe { (*block).size }));

  (next < end).then(|| next.cast::<Block>())
}

/// Every block of a heap, free or not, in ascending address order.
pub(crate) struct AddressOrder<'a> {
  current: *mut Block,
  end: *mut u8,
  _heap: PhantomData<&'a ()>,
}

impl Iterator for AddressOrder<'_> {
  type Item = *mut Block;

  fn next(&mut self) -> Option<Self::Item> {
    if self.current.is_null() {
      return None;
    }

    let block = self.current;
    self.current = unsafe { next_in(block, self.end) }.unwrap_or(ptr::null_mut());
    Some(block)
  }
}

impl<S: HeapSource> Heap<S> {
  /// # Safety
  ///
  /// `block` must be a block of this heap.
  pub(crate) unsafe fn physically_next(
    &self,
    block: *mut Block,
  ) -> Option<*mut Block> {
    unsafe { next_in(block, self.end) }
  }

  /// Finds the block ending where `block` starts by walking from the heap
  /// start. Linear in the number of blocks below `block`.
  ///
  /// # Safety
  ///
  /// `block` must be a block of this heap.
  pub(crate) unsafe fn physically_previous(
    &self,
    block: *mut Block,
  ) -> Option<*mut Block> {
    if self.start.is_null() || block == self.start {
      return None;
    }

    let mut current = self.start;
    loop {
      let next = unsafe { self.physically_next(current) }?;
      if next == block {
        return Some(current);
      }
      if next > block {
        return None;
      }
      current = next;
    }
  }

  pub(crate) fn blocks(&self) -> AddressOrder<'_> {
    AddressOrder {
      current: self.start,
      end: self.end,
      _heap: PhantomData,
    }
  }
}

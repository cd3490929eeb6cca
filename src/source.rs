//! Where heap memory comes from.

use std::{
  alloc::{self, Layout},
  ptr::NonNull,
};

use libc::{c_void, intptr_t, sbrk};
use log::trace;

use crate::{align, block::GRANULARITY, error::HeapError};

/// A primitive that extends the heap by a fixed number of bytes at a time.
///
/// Consecutive successful calls should hand out adjacent segments. The heap
/// rejects a segment that does not continue the previous one.
///
/// # Safety
///
/// The heap writes block headers through every segment it receives, so each
/// segment returned by a successful [`grow`](HeapSource::grow) must be:
///
/// - aligned to [`GRANULARITY`]
/// - valid for reads and writes of `increment` bytes
/// - owned exclusively by the heap and not handed out again
/// - kept valid for as long as the source itself is alive
pub unsafe trait HeapSource {
  /// Extends the heap by `increment` bytes and returns the start of the new
  /// segment.
  fn grow(
    &mut self,
    increment: usize,
  ) -> Result<NonNull<u8>, HeapError>;
}

/// Grows the process data segment with `sbrk(2)`.
///
/// The program break is shared by the whole process, so only one `Heap<Sbrk>`
/// should exist at a time and nothing else should move the break while it is
/// in use.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sbrk;

impl Sbrk {
  /// Current program break, as reported by `sbrk(0)`.
  pub fn program_break() -> *mut u8 {
    unsafe { sbrk(0) }.cast()
  }
}

unsafe impl HeapSource for Sbrk {
  fn grow(
    &mut self,
    increment: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    unsafe {
      let exhausted = HeapError::Exhausted { increment };

      let brk = sbrk(0);
      if brk == usize::MAX as *mut c_void {
        return Err(exhausted);
      }

      // The initial break is not guaranteed to sit on a granule boundary.
      let pad = align!(brk as usize, GRANULARITY) - brk as usize;
      let request = intptr_t::try_from(pad + increment).map_err(|_| exhausted)?;

      let address = sbrk(request);
      if address == usize::MAX as *mut c_void {
        return Err(exhausted);
      }
      if address != brk {
        return Err(HeapError::Discontiguous {
          expected: brk as usize,
          found: address as usize,
        });
      }

      trace!("sbrk: grew by {} bytes (+{} padding) at {:?}", increment, pad, address);

      NonNull::new(address.cast::<u8>().add(pad)).ok_or(exhausted)
    }
  }
}

/// A fixed-capacity region reserved up front and handed out in increments.
///
/// Each arena is independent, so any number of heaps can coexist, which is
/// what the tests rely on.
#[derive(Debug)]
pub struct Arena {
  pub(crate) base: NonNull<u8>,
  layout: Layout,
  used: usize,
}

unsafe impl Send for Arena {}

impl Arena {
  /// Reserves `capacity` bytes, rounded up to the granularity.
  pub fn new(capacity: usize) -> Self {
    let layout = capacity
      .max(GRANULARITY)
      .checked_next_multiple_of(GRANULARITY)
      .and_then(|size| Layout::from_size_align(size, GRANULARITY).ok());
    let Some(layout) = layout else {
      panic!("arena capacity {capacity} is too large");
    };

    let base = unsafe { alloc::alloc(layout) };
    let Some(base) = NonNull::new(base) else {
      alloc::handle_alloc_error(layout);
    };

    Self {
      base,
      layout,
      used: 0,
    }
  }

  pub fn capacity(&self) -> usize {
    self.layout.size()
  }

  pub fn remaining(&self) -> usize {
    self.capacity() - self.used
  }
}

unsafe impl HeapSource for Arena {
  fn grow(
    &mut self,
    increment: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    if increment > self.remaining() {
      return Err(HeapError::Exhausted { increment });
    }

    let segment = unsafe { self.base.add(self.used) };
    self.used += increment;

    trace!("arena: grew by {} bytes, {} remaining", increment, self.remaining());

    Ok(segment)
  }
}

impl Drop for Arena {
  fn drop(&mut self) {
    unsafe { alloc::dealloc(self.base.as_ptr(), self.layout) };
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_arena_hands_out_adjacent_segments() {
    let mut arena = Arena::new(3 * 1024);

    let first = arena.grow(1024).unwrap();
    let second = arena.grow(1024).unwrap();

    assert_eq!(first.as_ptr() as usize % GRANULARITY, 0);
    assert_eq!(second.as_ptr() as usize - first.as_ptr() as usize, 1024);
    assert_eq!(arena.remaining(), 1024);
  }

  #[test]
  fn test_arena_exhaustion() {
    let mut arena = Arena::new(1024);

    assert!(arena.grow(1024).is_ok());
    assert_eq!(
      arena.grow(1024),
      Err(HeapError::Exhausted { increment: 1024 })
    );
    assert_eq!(arena.remaining(), 0);
  }

  #[test]
  fn test_arena_rounds_capacity() {
    assert_eq!(Arena::new(1).capacity(), GRANULARITY);
    assert_eq!(Arena::new(100).capacity(), 112);
  }

  #[test]
  #[should_panic(expected = "is too large")]
  fn test_arena_rejects_unrepresentable_capacity() {
    Arena::new(usize::MAX - 3);
  }
}

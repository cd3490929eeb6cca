//! Inline block header and the size arithmetic around it.

use std::{mem, ptr};

/// Allocation granularity in bytes. Every block capacity is a multiple of it.
pub const GRANULARITY: usize = 16;

/// Bytes taken by a block header in front of each data region.
pub const HEADER_SIZE: usize = mem::size_of::<Block>();

/// Header size expressed in granularity units.
pub const HEADER_UNITS: usize = HEADER_SIZE / GRANULARITY;

const _: () = assert!(HEADER_SIZE % GRANULARITY == 0);
const _: () = assert!(mem::align_of::<Block>() == GRANULARITY);

/// Header stored at the start of every block, free or allocated.
///
/// `free_next` and `free_prev` only mean something while `is_free` is set.
#[repr(C, align(16))]
#[derive(Debug)]
pub struct Block {
  pub free_next: *mut Block,
  pub free_prev: *mut Block,
  /// Capacity of the data region in granularity units.
  pub size: usize,
  pub is_free: bool,
}

impl Block {
  pub fn new(
    size: usize,
    is_free: bool,
  ) -> Self {
    Self {
      free_next: ptr::null_mut(),
      free_prev: ptr::null_mut(),
      size,
      is_free,
    }
  }

  /// Writes a fresh header at `at` and returns it.
  ///
  /// # Safety
  ///
  /// `at` must be 16-byte aligned and point to at least
  /// `HEADER_SIZE + size * GRANULARITY` writable bytes owned by the heap.
  pub unsafe fn format(
    at: *mut u8,
    size: usize,
    is_free: bool,
  ) -> *mut Block {
    #[allow(clippy::cast_ptr_alignment)]
    let block = at.cast::<Block>();
    debug_assert!(block.is_aligned());
    unsafe { block.write(Block::new(size, is_free)) };
    block
  }

  /// Data region of `block`, the address handed to callers.
  pub fn data(block: *mut Block) -> *mut u8 {
    block.cast::<u8>().wrapping_add(HEADER_SIZE)
  }

  /// Inverse of [`Block::data`].
  pub fn from_data(data: *mut u8) -> *mut Block {
    data.wrapping_sub(HEADER_SIZE).cast::<Block>()
  }

  /// Total bytes covered by a block of `size` units, header included.
  pub const fn footprint(size: usize) -> usize {
    HEADER_SIZE + size * GRANULARITY
  }

  /// Capacity in units of a block formatted over a whole `bytes` region.
  pub const fn capacity_of(bytes: usize) -> usize {
    (bytes - HEADER_SIZE) / GRANULARITY
  }
}

/// Number of granularity units needed to hold `bytes`, never less than one.
pub fn blocks_needed(bytes: usize) -> usize {
  bytes.div_ceil(GRANULARITY).max(1)
}

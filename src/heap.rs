//! Heap bounds, growth and the explicit free list.

use std::{
  iter,
  ptr::{self, NonNull},
};

use log::debug;

use crate::{
  block::Block,
  config::HeapConfig,
  error::{ConfigError, HeapError},
  source::HeapSource,
  strategy::{ListOrder, Strategy},
};

/// An explicit free-list allocator over memory obtained from `S`.
///
/// All allocator state lives here, so independent heaps never interfere.
/// The heap is initialised lazily by the first allocation and grows one
/// [`HeapConfig::increment`] at a time.
///
/// # Thread Safety
///
/// Every mutating operation takes `&mut self`. The heap is `Send` when its
/// source is, and never `Sync`; wrap it in a mutex to share it.
pub struct Heap<S: HeapSource> {
  source: S,
  pub(crate) config: HeapConfig,
  /// First block ever formatted, the origin of address-order walks.
  pub(crate) start: *mut Block,
  /// Growth cursor: one past the last byte the heap owns.
  pub(crate) end: *mut u8,
  pub(crate) free_head: *mut Block,
  /// Where a next-fit search resumes.
  pub(crate) rover: *mut Block,
  pub(crate) last_released: *mut Block,
  grown: usize,
  growths: usize,
}

unsafe impl<S: HeapSource + Send> Send for Heap<S> {}

/// Walks a free list starting at `first`.
pub(crate) fn free_from(first: *mut Block) -> impl Iterator<Item = *mut Block> {
  iter::successors(NonNull::new(first), |block| {
    NonNull::new(unsafe { (*block.as_ptr()).free_next })
  })
  .map(NonNull::as_ptr)
}

impl<S: HeapSource> Heap<S> {
  /// Creates an empty heap with the default configuration.
  pub fn new(source: S) -> Self {
    Self::build(source, HeapConfig::default())
  }

  pub fn with_config(
    source: S,
    config: HeapConfig,
  ) -> Result<Self, ConfigError> {
    config.validate()?;
    Ok(Self::build(source, config))
  }

  fn build(
    source: S,
    config: HeapConfig,
  ) -> Self {
    Self {
      source,
      config,
      start: ptr::null_mut(),
      end: ptr::null_mut(),
      free_head: ptr::null_mut(),
      rover: ptr::null_mut(),
      last_released: ptr::null_mut(),
      grown: 0,
      growths: 0,
    }
  }

  pub fn config(&self) -> &HeapConfig {
    &self.config
  }

  pub fn source(&self) -> &S {
    &self.source
  }

  pub fn strategy(&self) -> Strategy {
    self.config.strategy
  }

  pub fn set_strategy(
    &mut self,
    strategy: Strategy,
  ) {
    debug!("search strategy: {} -> {}", self.config.strategy, strategy);
    self.config.strategy = strategy;
  }

  pub fn list_order(&self) -> ListOrder {
    self.config.list_order
  }

  /// Switches how released blocks are inserted.
  ///
  /// Moving to [`ListOrder::AddressOrdered`] sorts the current free list.
  pub fn set_list_order(
    &mut self,
    list_order: ListOrder,
  ) {
    debug!("free list order: {} -> {}", self.config.list_order, list_order);
    let resort = list_order == ListOrder::AddressOrdered && self.config.list_order != list_order;
    self.config.list_order = list_order;
    if resort {
      self.sort_free_list();
    }
  }

  /// Total bytes obtained from the source so far.
  pub fn heap_size(&self) -> usize {
    self.grown
  }

  /// Number of successful growth requests, the initial one included.
  pub fn growths(&self) -> usize {
    self.growths
  }

  /// Data address of the block most recently put back on the free list.
  pub fn last_released(&self) -> Option<NonNull<u8>> {
    NonNull::new(self.last_released).and_then(|block| NonNull::new(Block::data(block.as_ptr())))
  }

  pub(crate) fn free_blocks(&self) -> impl Iterator<Item = *mut Block> + '_ {
    free_from(self.free_head)
  }

  /// Formats the first increment on first use.
  pub(crate) fn ensure_initialized(&mut self) -> Result<(), HeapError> {
    if !self.start.is_null() {
      return Ok(());
    }

    let block = self.add_segment()?;
    self.start = block;

    debug!(
      "heap initialized at {:?} with a {} byte increment",
      block, self.config.increment
    );

    Ok(())
  }

  /// Requests one more increment and puts it on the free list as one block.
  pub(crate) fn grow(&mut self) -> Result<*mut Block, HeapError> {
    let block = self.add_segment()?;

    debug!(
      "heap grew to {} bytes in {} increments, new block at {:?}",
      self.grown, self.growths, block
    );

    Ok(block)
  }

  fn add_segment(&mut self) -> Result<*mut Block, HeapError> {
    let increment = self.config.increment;
    let segment = self.source.grow(increment)?.as_ptr();

    if !self.end.is_null() && segment != self.end {
      return Err(HeapError::Discontiguous {
        expected: self.end as usize,
        found: segment as usize,
      });
    }

    unsafe {
      let block = Block::format(segment, Block::capacity_of(increment), true);
      self.end = segment.add(increment);
      self.grown += increment;
      self.growths += 1;
      self.insert_free(block);
      Ok(block)
    }
  }

  /// Puts a free, unlinked block on the free list according to the list order.
  ///
  /// # Safety
  ///
  /// `block` must be a block of this heap that is not on the free list.
  pub(crate) unsafe fn insert_free(
    &mut self,
    block: *mut Block,
  ) {
    let prev = match self.config.list_order {
      ListOrder::Unordered => ptr::null_mut(),
      ListOrder::AddressOrdered => self
        .free_blocks()
        .take_while(|&candidate| candidate < block)
        .last()
        .unwrap_or(ptr::null_mut()),
    };

    unsafe { self.link_after(prev, block) };
  }

  /// Links `block` behind `prev`, or at the head when `prev` is null.
  unsafe fn link_after(
    &mut self,
    prev: *mut Block,
    block: *mut Block,
  ) {
    unsafe {
      let next = if prev.is_null() {
        self.free_head
      } else {
        (*prev).free_next
      };

      (*block).free_prev = prev;
      (*block).free_next = next;

      if !next.is_null() {
        (*next).free_prev = block;
      }
      if prev.is_null() {
        self.free_head = block;
      } else {
        (*prev).free_next = block;
      }
    }
  }

  /// Splices `block` out of the free list and clears its links.
  ///
  /// A block whose links are already clear and which is not the head is left
  /// untouched.
  ///
  /// # Safety
  ///
  /// `block` must be a block of this heap.
  pub(crate) unsafe fn unlink(
    &mut self,
    block: *mut Block,
  ) {
    unsafe {
      let prev = (*block).free_prev;
      let next = (*block).free_next;

      if !prev.is_null() {
        (*prev).free_next = next;
      } else if self.free_head == block {
        self.free_head = next;
      }
      if !next.is_null() {
        (*next).free_prev = prev;
      }
      if self.rover == block {
        self.rover = next;
      }

      (*block).free_next = ptr::null_mut();
      (*block).free_prev = ptr::null_mut();
    }
  }

  /// Gives `new` the free-list position of `old`, which ends up unlinked.
  ///
  /// # Safety
  ///
  /// `old` must be on the free list and `new` must not be.
  pub(crate) unsafe fn replace_free(
    &mut self,
    old: *mut Block,
    new: *mut Block,
  ) {
    unsafe {
      let prev = (*old).free_prev;
      let next = (*old).free_next;

      (*new).free_prev = prev;
      (*new).free_next = next;

      if !prev.is_null() {
        (*prev).free_next = new;
      } else if self.free_head == old {
        self.free_head = new;
      }
      if !next.is_null() {
        (*next).free_prev = new;
      }
      if self.rover == old {
        self.rover = new;
      }

      (*old).free_next = ptr::null_mut();
      (*old).free_prev = ptr::null_mut();
    }
  }

  /// Rebuilds the free list in ascending address order.
  fn sort_free_list(&mut self) {
    let free: Vec<*mut Block> = self
      .blocks()
      .filter(|&block| unsafe { (*block).is_free })
      .collect();

    self.free_head = ptr::null_mut();
    let mut prev: *mut Block = ptr::null_mut();

    for block in free {
      unsafe {
        (*block).free_prev = prev;
        (*block).free_next = ptr::null_mut();
        if prev.is_null() {
          self.free_head = block;
        } else {
          (*prev).free_next = block;
        }
      }
      prev = block;
    }
  }
}

#[cfg(test)]
impl<S: HeapSource> Heap<S> {
  /// Checks the structural invariants: the free list holds exactly the free
  /// blocks, once each, with consistent back links, and the blocks tile every
  /// byte obtained from the source.
  pub(crate) fn assert_consistent(&self) {
    use std::collections::HashSet;

    let mut listed = HashSet::new();
    let mut prev: *mut Block = ptr::null_mut();
    for block in self.free_blocks() {
      unsafe {
        assert!((*block).is_free, "allocated block {block:?} on the free list");
        assert_eq!((*block).free_prev, prev, "broken back link at {block:?}");
      }
      assert!(listed.insert(block), "block {block:?} listed twice");
      if self.config.list_order == ListOrder::AddressOrdered && !prev.is_null() {
        assert!(prev < block, "free list out of address order");
      }
      prev = block;
    }

    let mut total = 0;
    for block in self.blocks() {
      unsafe {
        assert_eq!((*block).is_free, listed.contains(&block));
        total += Block::footprint((*block).size);
      }
    }
    assert_eq!(total, self.heap_size());
  }
}

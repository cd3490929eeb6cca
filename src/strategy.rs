//! Placement policies selectable at runtime.

use std::fmt;

/// How the free list is searched for a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
  /// Smallest block that fits.
  BestFit,
  /// Like first-fit, but resumes after the previous allocation.
  NextFit,
  /// First block that fits, scanning from the head.
  #[default]
  FirstFit,
  /// Largest block, if it fits.
  WorstFit,
}

/// How freed and newly grown blocks are put back on the free list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListOrder {
  /// Sorted by ascending address.
  AddressOrdered,
  /// LIFO: inserted at the head.
  #[default]
  Unordered,
}

impl fmt::Display for Strategy {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    let name = match self {
      Strategy::BestFit => "best-fit",
      Strategy::NextFit => "next-fit",
      Strategy::FirstFit => "first-fit",
      Strategy::WorstFit => "worst-fit",
    };
    f.write_str(name)
  }
}

impl fmt::Display for ListOrder {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    let name = match self {
      ListOrder::AddressOrdered => "address-ordered",
      ListOrder::Unordered => "unordered",
    };
    f.write_str(name)
  }
}

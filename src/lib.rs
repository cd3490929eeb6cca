//! # freelist - An Explicit Free-List Memory Allocator
//!
//! This crate provides a general-purpose allocator that manages a growable
//! heap obtained in fixed-size increments, typically from the `sbrk` system
//! call. Block metadata lives inline in front of every allocation, free
//! blocks are kept on an explicit doubly linked free list, and released
//! blocks are merged with their free address neighbours.
//!
//! ## Overview
//!
//! ```text
//!   Heap Layout (one increment, after a few allocations):
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                         HEAP MEMORY                                  │
//!   │                                                                      │
//!   │   ┌────┬──────┬────┬──────────┬────┬──────┬────┬──────────────────┐  │
//!   │   │ H  │  A1  │ H  │   free   │ H  │  A3  │ H  │      free        │  │
//!   │   └────┴──────┴────┴──────────┴────┴──────┴────┴──────────────────┘  │
//!   │   ▲                 ▲                           ▲                 ▲  │
//!   │   │                 └───── free list ───────────┘                 │  │
//!   │ heap start                                                growth     │
//!   │                                                           cursor     │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   H = block header. Blocks tile the heap without gaps, so the next block
//!   is always at `header + 32 + size * 16`.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   freelist
//!   ├── align      - Rounding macro (align!)
//!   ├── block      - Inline block header, granularity, size arithmetic
//!   ├── heap       - Heap context: bounds, growth, free-list primitives
//!   ├── alloc      - allocate: search strategies, splitting
//!   ├── release    - release: left/right coalescing
//!   ├── navigate   - Address-order neighbours of a block
//!   ├── inspect    - Heap dumps and block snapshots
//!   ├── source     - Heap sources: Sbrk and Arena
//!   ├── strategy   - Strategy and ListOrder switches
//!   ├── config     - HeapConfig
//!   └── error      - Error types
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use freelist::{Arena, Heap};
//!
//! let mut heap = Heap::new(Arena::new(16 * 1024));
//!
//! let ptr = heap.allocate(24).unwrap().cast::<u64>();
//! unsafe {
//!   ptr.write(42);
//!   assert_eq!(ptr.read(), 42);
//!
//!   heap.release(ptr.as_ptr().cast());
//! }
//! ```
//!
//! ## How It Works
//!
//! Each block starts with a 32 byte header:
//!
//! ```text
//!   ┌───────────────────────────────────┬────────────────────────────────┐
//!   │    Block Header                   │         User Data              │
//!   │  ┌─────────────────────────────┐  │                                │
//!   │  │ free_next: *mut Block       │  │  ┌──────────────────────────┐  │
//!   │  │ free_prev: *mut Block       │  │  │                          │  │
//!   │  │ size: N (16 byte units)     │  │  │    N * 16 bytes usable   │  │
//!   │  │ is_free: bool               │  │  │                          │  │
//!   │  └─────────────────────────────┘  │  └──────────────────────────┘  │
//!   │      32 bytes                     │                                │
//!   └───────────────────────────────────┴────────────────────────────────┘
//!                                       ▲
//!                                       └── Pointer returned to user
//! ```
//!
//! - **allocate** searches the free list (first-fit by default), grows the
//!   heap by one increment on a miss, splits off any tail large enough to be
//!   a block of its own and unlinks the chosen block.
//! - **release** marks the block free, merges it into a free left neighbour,
//!   absorbs a free right neighbour and pushes the result onto the free list.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: No synchronization primitives
//! - **Fixed increments**: A request larger than one increment only succeeds
//!   if coalescing already produced a big enough block
//! - **No pointer validation**: Releasing a foreign pointer or releasing twice
//!   is undefined behaviour
//! - **16 byte alignment**: Larger alignments are not supported
//!
//! ## Safety
//!
//! Allocation is safe to call; using the returned memory and releasing it
//! requires `unsafe` blocks.

pub mod align;
mod alloc;
mod block;
pub mod config;
pub mod error;
mod heap;
mod inspect;
mod navigate;
mod release;
pub mod source;
pub mod strategy;

pub use block::{GRANULARITY, HEADER_SIZE, blocks_needed};
pub use config::{DEFAULT_INCREMENT, HeapConfig};
pub use error::{AllocError, ConfigError, HeapError};
pub use heap::Heap;
pub use inspect::BlockInfo;
pub use source::{Arena, HeapSource, Sbrk};
pub use strategy::{ListOrder, Strategy};

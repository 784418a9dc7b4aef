//! # brkalloc - A Thread-Safe First-Fit Allocator
//!
//! This crate provides a minimal **first-fit allocator** over a single
//! growable arena, by default the process program break moved with `sbrk(2)`.
//!
//! ## Overview
//!
//! Every region handed out is prefixed by a descriptor, and all descriptors
//! are threaded into one chain in the order the arena grew:
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                              ARENA                                   │
//!   │                                                                      │
//!   │   ┌───┬──────┬───┬──────────┬───┬────┬───┬──────┐                    │
//!   │   │ H │  A1  │ H │    A2    │ H │ A3 │ H │  A4  │                    │
//!   │   └───┴──────┴───┴──────────┴───┴────┴───┴──────┘                    │
//!   │     head ───► ... ───────────────────► tail     ▲                    │
//!   │                                                 │                    │
//!   │                                           Program Break              │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **allocate(n)**: walk the chain from the head and reuse the first free
//!   block holding at least `n` bytes. If none fits, grow the arena by one
//!   descriptor plus `n` bytes and append a new block at the tail.
//! - **release(p)**: if `p`'s block ends exactly at the program break, unlink
//!   it and shrink the arena, handing the bytes back to the OS. Otherwise just
//!   mark it free.
//!
//! Free blocks are never split or merged. A freed block is reused whole,
//! which keeps the chain trivial at the cost of fragmentation.
//!
//! ## Crate Structure
//!
//! ```text
//!   brkalloc
//!   ├── align      - ALIGNMENT and the align_up! macro
//!   ├── arena      - ArenaGrowth trait, ProgramBreak and SimulatedArena
//!   ├── block      - Block descriptor layout (internal)
//!   ├── registry   - Append-ordered descriptor chain (internal)
//!   ├── allocator  - Allocator: allocation and release engines
//!   ├── config     - AllocatorConfig
//!   └── error      - AllocError
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! fn main() -> Result<(), brkalloc::AllocError> {
//!     let ptr = brkalloc::allocate(64)?;
//!
//!     unsafe {
//!         ptr.as_ptr().write_bytes(0xAB, 64);
//!         brkalloc::release(ptr.as_ptr())?;
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! Independent allocators can be built over any [`ArenaGrowth`] backend:
//!
//! ```rust
//! use brkalloc::{Allocator, SimulatedArena};
//!
//! let allocator = Allocator::new(SimulatedArena::new(4096));
//!
//! let first = allocator.allocate(100).unwrap();
//! let _second = allocator.allocate(100).unwrap();
//!
//! unsafe { allocator.release(first.as_ptr()).unwrap() };
//! assert_eq!(allocator.allocate(50).unwrap(), first);
//! ```
//!
//! ## Single Allocation
//!
//! ```text
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │    Block Header       │         User Data              │
//!   │  ┌─────────────────┐  │                                │
//!   │  │ size: N         │  │  ┌──────────────────────────┐  │
//!   │  │ next: null/ptr  │  │  │                          │  │
//!   │  │ is_free: false  │  │  │     N bytes usable       │  │
//!   │  │ canary          │  │  │                          │  │
//!   │  └─────────────────┘  │  └──────────────────────────┘  │
//!   │      32 bytes         │                                │
//!   └───────────────────────┴────────────────────────────────┘
//!                           ▲
//!                           └── Pointer returned to user (16-byte aligned)
//! ```
//!
//! ## Concurrency
//!
//! One `parking_lot` mutex serializes each call from registry scan to arena
//! update. `allocate` and `release` are mutually exclusive across threads.
//!
//! ## Limitations
//!
//! - **No splitting or coalescing**: a large free block satisfies a small
//!   request whole.
//! - **Tail-only shrinking**: memory returns to the OS only when the released
//!   block is the last one in the arena.
//! - **Unix-only**: the default backend requires `libc` and `sbrk`.
//! - **Not a `GlobalAlloc`**: the program break is shared with the platform
//!   malloc, so the crate only exposes its explicit API.
//!
//! ## Logging
//!
//! Arena growth and shrinking are reported through the `log` facade at
//! `debug`, reuse at `trace`, and failures at `warn`. No logger is installed.

pub mod align;
mod allocator;
pub mod arena;
mod block;
mod config;
mod error;
mod registry;

use std::ptr::NonNull;

pub use allocator::{Allocator, BlockInfo};
pub use arena::{ArenaGrowth, ProgramBreak, SimulatedArena};
pub use block::HEADER_SIZE;
pub use config::AllocatorConfig;
pub use error::AllocError;

static GLOBAL: Allocator<ProgramBreak> = Allocator::new(ProgramBreak);

/// The process-wide allocator over the program break.
pub fn global() -> &'static Allocator<ProgramBreak> {
  &GLOBAL
}

/// Allocates `size` bytes from the process-wide allocator.
pub fn allocate(size: usize) -> Result<NonNull<u8>, AllocError> {
  GLOBAL.allocate(size)
}

/// Releases a pointer obtained from [`allocate`].
///
/// # Safety
///
/// See [`Allocator::release`].
pub unsafe fn release(ptr: *mut u8) -> Result<(), AllocError> {
  unsafe { GLOBAL.release(ptr) }
}

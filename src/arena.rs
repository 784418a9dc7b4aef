//! Backends for moving the end of the arena.
//!
//! The allocator only ever talks to the arena through [`ArenaGrowth`], so the
//! real program break and an in-process buffer are interchangeable.

use std::{alloc, ptr::NonNull};

use libc::{c_void, intptr_t, sbrk};

use crate::align::ALIGNMENT;

/// Moves the high boundary of an arena by a signed byte count.
///
/// Mirrors `sbrk(2)`:
///
/// - `delta == 0` returns the current boundary without side effects.
/// - `delta > 0` extends the arena and returns the boundary as it was
///   *before* the extension, or `None` when the extension cannot be granted.
/// - `delta < 0` gives the top `|delta|` bytes back and returns the old
///   boundary.
pub trait ArenaGrowth {
  /// # Safety
  ///
  /// A negative `delta` must only give back bytes previously granted by this
  /// backend and no longer referenced by anyone.
  unsafe fn grow_or_shrink(
    &mut self,
    delta: isize,
  ) -> Option<NonNull<u8>>;
}

/// The process program break, driven through `sbrk(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProgramBreak;

impl ArenaGrowth for ProgramBreak {
  unsafe fn grow_or_shrink(
    &mut self,
    delta: isize,
  ) -> Option<NonNull<u8>> {
    let previous = unsafe { sbrk(delta as intptr_t) };

    if previous == usize::MAX as *mut c_void {
      return None;
    }

    NonNull::new(previous.cast::<u8>())
  }
}

/// A fixed-capacity arena carved out of one heap buffer.
///
/// Behaves like a program break that cannot grow past `capacity` bytes, which
/// makes boundary movements observable and deterministic.
#[derive(Debug)]
pub struct SimulatedArena {
  base: NonNull<u8>,
  capacity: usize,
  len: usize,
}

// The buffer is exclusively owned; the pointer is never shared outside
// of the arena and the blocks carved out of it.
unsafe impl Send for SimulatedArena {}

impl SimulatedArena {
  pub fn new(capacity: usize) -> Self {
    let layout = Self::layout(capacity);
    let base = unsafe { alloc::alloc_zeroed(layout) };

    let Some(base) = NonNull::new(base) else {
      alloc::handle_alloc_error(layout);
    };

    Self {
      base,
      capacity,
      len: 0,
    }
  }

  fn layout(capacity: usize) -> alloc::Layout {
    alloc::Layout::from_size_align(capacity.max(ALIGNMENT), ALIGNMENT)
      .unwrap_or_else(|_| panic!("simulated arena capacity {capacity} is too large"))
  }

  /// Lowest address of the arena.
  pub fn base(&self) -> NonNull<u8> {
    self.base
  }

  /// Bytes currently claimed.
  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  fn boundary(&self) -> NonNull<u8> {
    unsafe { self.base.add(self.len) }
  }
}

impl ArenaGrowth for SimulatedArena {
  unsafe fn grow_or_shrink(
    &mut self,
    delta: isize,
  ) -> Option<NonNull<u8>> {
    let previous = self.boundary();

    if delta >= 0 {
      let len = self.len.checked_add(delta.unsigned_abs())?;
      if len > self.capacity {
        return None;
      }
      self.len = len;
    } else {
      self.len = self.len.checked_sub(delta.unsigned_abs())?;
    }

    Some(previous)
  }
}

impl Drop for SimulatedArena {
  fn drop(&mut self) {
    unsafe { alloc::dealloc(self.base.as_ptr(), Self::layout(self.capacity)) };
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::align::is_aligned;

  #[test]
  fn probe_has_no_side_effects() {
    let mut arena = SimulatedArena::new(256);

    let first = unsafe { arena.grow_or_shrink(0) }.unwrap();
    let second = unsafe { arena.grow_or_shrink(0) }.unwrap();

    assert_eq!(first, arena.base());
    assert_eq!(first, second);
    assert!(arena.is_empty());
    assert!(is_aligned(arena.base().as_ptr() as usize));
  }

  #[test]
  fn grow_returns_previous_boundary() {
    let mut arena = SimulatedArena::new(256);
    let base = arena.base().as_ptr() as usize;

    let first = unsafe { arena.grow_or_shrink(48) }.unwrap();
    let second = unsafe { arena.grow_or_shrink(32) }.unwrap();
    let boundary = unsafe { arena.grow_or_shrink(0) }.unwrap();

    assert_eq!(first.as_ptr() as usize, base);
    assert_eq!(second.as_ptr() as usize, base + 48);
    assert_eq!(boundary.as_ptr() as usize, base + 80);
    assert_eq!(arena.len(), 80);
  }

  #[test]
  fn grow_past_capacity_fails_without_moving() {
    let mut arena = SimulatedArena::new(64);

    assert!(unsafe { arena.grow_or_shrink(48) }.is_some());
    assert!(unsafe { arena.grow_or_shrink(32) }.is_none());
    assert_eq!(arena.len(), 48);
    assert_eq!(arena.capacity(), 64);
  }

  #[test]
  fn shrink_moves_boundary_down() {
    let mut arena = SimulatedArena::new(128);

    unsafe { arena.grow_or_shrink(96) }.unwrap();
    let previous = unsafe { arena.grow_or_shrink(-64) }.unwrap();

    assert_eq!(previous.as_ptr() as usize, arena.base().as_ptr() as usize + 96);
    assert_eq!(arena.len(), 32);
  }
}

use std::{marker::PhantomData, ptr::{self, NonNull}};

use crate::{
  align::is_aligned,
  block::{Block, HEADER_SIZE},
  error::AllocError,
};

/// Every descriptor ever carved out of the arena, oldest first.
///
/// ```text
///   head                                           tail
///    │                                              │
///    ▼                                              ▼
///   ┌─────┬────────┐   ┌─────┬────────┐   ┌─────┬────────┐
///   │ hdr │  data  │──►│ hdr │  data  │──►│ hdr │  data  │──► null
///   └─────┴────────┘   └─────┴────────┘   └─────┴────────┘
///                                                        ▲
///                                                   arena boundary
/// ```
///
/// The chain follows arena growth order, so it is also sorted by address.
/// It never reorders; it only grows and shrinks at the tail.
pub struct BlockRegistry {
  head: *mut Block,
  tail: *mut Block,
}

impl BlockRegistry {
  pub const fn new() -> Self {
    Self {
      head: ptr::null_mut(),
      tail: ptr::null_mut(),
    }
  }

  pub fn head(&self) -> *mut Block {
    self.head
  }

  pub fn tail(&self) -> *mut Block {
    self.tail
  }

  pub fn is_empty(&self) -> bool {
    self.head.is_null() && self.tail.is_null()
  }

  /// First-fit: the oldest free block with at least `size` usable bytes.
  ///
  /// # Safety
  ///
  /// Every descriptor reachable from the head must be valid.
  pub unsafe fn find_free_block(
    &self,
    size: usize,
  ) -> Option<NonNull<Block>> {
    unsafe { self.iter() }.find(|block| {
      let block = unsafe { block.as_ref() };
      block.is_free && block.size >= size
    })
  }

  /// Whether `block` is linked into the chain.
  ///
  /// # Safety
  ///
  /// Every descriptor reachable from the head must be valid.
  pub unsafe fn contains(
    &self,
    block: *const Block,
  ) -> bool {
    unsafe { self.iter() }.any(|candidate| ptr::eq(candidate.as_ptr(), block))
  }

  /// Links a freshly created descriptor after the current tail.
  ///
  /// # Safety
  ///
  /// `block` must be valid, unlinked, and have a null `next`.
  pub unsafe fn append(
    &mut self,
    block: NonNull<Block>,
  ) {
    let block = block.as_ptr();

    if self.head.is_null() {
      self.head = block;
    }

    if !self.tail.is_null() {
      unsafe { (*self.tail).next = block };
    }

    self.tail = block;
  }

  /// Unlinks `block`, which must be the tail, making its predecessor the
  /// new tail.
  ///
  /// # Safety
  ///
  /// Every descriptor reachable from the head must be valid.
  pub unsafe fn remove_tail(
    &mut self,
    block: NonNull<Block>,
  ) -> Result<(), AllocError> {
    let block = block.as_ptr();

    if self.head == self.tail {
      if self.head != block {
        return Err(AllocError::Corrupted("sole block is not the released tail"));
      }
      self.head = ptr::null_mut();
      self.tail = ptr::null_mut();
      return Ok(());
    }

    let predecessor = unsafe { self.iter() }
      .find(|candidate| unsafe { candidate.as_ref() }.next == block)
      .ok_or(AllocError::Corrupted("released tail has no predecessor"))?;

    unsafe { (*predecessor.as_ptr()).next = ptr::null_mut() };
    self.tail = predecessor.as_ptr();

    Ok(())
  }

  /// Walks the chain from the head.
  ///
  /// # Safety
  ///
  /// Every descriptor reachable from the head must be valid and the chain
  /// must be acyclic for as long as the iterator is used.
  pub unsafe fn iter(&self) -> Blocks<'_> {
    Blocks {
      current: self.head,
      _registry: PhantomData,
    }
  }

  /// Checks the structural invariants of the chain against the arena
  /// boundary and returns the number of blocks.
  ///
  /// Cycles are caught by the address ordering: a chain that loops back
  /// must at some point link to a lower address.
  ///
  /// # Safety
  ///
  /// Every descriptor address reachable from the head must be readable.
  pub unsafe fn validate(
    &self,
    boundary: usize,
  ) -> Result<usize, AllocError> {
    if self.head.is_null() != self.tail.is_null() {
      return Err(AllocError::Corrupted("head and tail disagree on emptiness"));
    }

    let mut count = 0;
    let mut previous_end = 0;
    let mut last = ptr::null_mut();
    let mut current = self.head;

    while !current.is_null() {
      let addr = current as usize;
      if !is_aligned(addr) {
        return Err(AllocError::Corrupted("misaligned descriptor"));
      }
      if addr < previous_end {
        return Err(AllocError::Corrupted("descriptors overlap or loop back"));
      }

      let block = unsafe { &*current };
      if !block.canary_intact() {
        return Err(AllocError::Corrupted("descriptor canary overwritten"));
      }
      if block.end() > boundary {
        return Err(AllocError::Corrupted("block extends past the arena boundary"));
      }

      count += 1;
      previous_end = addr + HEADER_SIZE + block.size;
      last = current;
      current = block.next;
    }

    if last != self.tail {
      return Err(AllocError::Corrupted("chain does not end at the tail"));
    }

    Ok(count)
  }
}

/// Iterator over the descriptors of a [`BlockRegistry`], oldest first.
pub struct Blocks<'a> {
  current: *mut Block,
  _registry: PhantomData<&'a BlockRegistry>,
}

impl Iterator for Blocks<'_> {
  type Item = NonNull<Block>;

  fn next(&mut self) -> Option<Self::Item> {
    let block = NonNull::new(self.current)?;
    self.current = unsafe { block.as_ref() }.next;
    Some(block)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[repr(C, align(16))]
  struct Storage([u8; 512]);

  /// Lays out consecutive blocks of the given sizes in `storage`.
  fn carve(
    storage: &mut Storage,
    sizes: &[usize],
  ) -> Vec<NonNull<Block>> {
    let mut offset = 0;
    let mut blocks = Vec::new();

    for &size in sizes {
      let at = NonNull::new(unsafe { storage.0.as_mut_ptr().add(offset) }).unwrap();
      blocks.push(unsafe { Block::init(at, size) });
      offset += HEADER_SIZE + size;
    }

    blocks
  }

  fn end_of(block: NonNull<Block>) -> usize {
    unsafe { block.as_ref() }.end()
  }

  #[test]
  fn append_links_in_order() {
    let mut storage = Storage([0; 512]);
    let blocks = carve(&mut storage, &[16, 32, 16]);
    let mut registry = BlockRegistry::new();

    assert!(registry.is_empty());

    for &block in &blocks {
      unsafe { registry.append(block) };
    }

    let walked: Vec<_> = unsafe { registry.iter() }.collect();
    assert_eq!(walked, blocks);
    assert_eq!(registry.head(), blocks[0].as_ptr());
    assert_eq!(registry.tail(), blocks[2].as_ptr());
    assert_eq!(unsafe { registry.validate(end_of(blocks[2])) }, Ok(3));
  }

  #[test]
  fn first_fit_skips_busy_and_small_blocks() {
    let mut storage = Storage([0; 512]);
    let blocks = carve(&mut storage, &[16, 64, 32, 96]);
    let mut registry = BlockRegistry::new();

    for &block in &blocks {
      unsafe { registry.append(block) };
    }

    unsafe {
      (*blocks[0].as_ptr()).is_free = true;
      (*blocks[2].as_ptr()).is_free = true;
      (*blocks[3].as_ptr()).is_free = true;
    }

    assert_eq!(unsafe { registry.find_free_block(16) }, Some(blocks[0]));
    assert_eq!(unsafe { registry.find_free_block(20) }, Some(blocks[2]));
    assert_eq!(unsafe { registry.find_free_block(64) }, Some(blocks[3]));
    assert_eq!(unsafe { registry.find_free_block(128) }, None);
  }

  #[test]
  fn remove_tail_promotes_predecessor() {
    let mut storage = Storage([0; 512]);
    let blocks = carve(&mut storage, &[16, 16, 16]);
    let mut registry = BlockRegistry::new();

    for &block in &blocks {
      unsafe { registry.append(block) };
    }

    unsafe { registry.remove_tail(blocks[2]) }.unwrap();

    assert_eq!(registry.tail(), blocks[1].as_ptr());
    assert!(unsafe { blocks[1].as_ref() }.next.is_null());
    assert!(!unsafe { registry.contains(blocks[2].as_ptr()) });
    assert_eq!(unsafe { registry.validate(end_of(blocks[1])) }, Ok(2));
  }

  #[test]
  fn remove_sole_block_empties_registry() {
    let mut storage = Storage([0; 512]);
    let blocks = carve(&mut storage, &[48]);
    let mut registry = BlockRegistry::new();

    unsafe { registry.append(blocks[0]) };
    unsafe { registry.remove_tail(blocks[0]) }.unwrap();

    assert!(registry.is_empty());
    assert!(registry.head().is_null());
    assert_eq!(unsafe { registry.validate(0) }, Ok(0));
  }

  #[test]
  fn remove_unlinked_block_is_reported() {
    let mut storage = Storage([0; 512]);
    let blocks = carve(&mut storage, &[16, 16, 16]);
    let mut registry = BlockRegistry::new();

    unsafe { registry.append(blocks[0]) };
    unsafe { registry.append(blocks[1]) };

    assert!(matches!(
      unsafe { registry.remove_tail(blocks[2]) },
      Err(AllocError::Corrupted(_))
    ));
  }

  #[test]
  fn validate_detects_loops_and_bad_canaries() {
    let mut storage = Storage([0; 512]);
    let blocks = carve(&mut storage, &[16, 16]);
    let mut registry = BlockRegistry::new();

    unsafe { registry.append(blocks[0]) };
    unsafe { registry.append(blocks[1]) };
    let boundary = end_of(blocks[1]);

    unsafe { (*blocks[1].as_ptr()).next = blocks[0].as_ptr() };
    assert!(unsafe { registry.validate(boundary) }.is_err());
    unsafe { (*blocks[1].as_ptr()).next = ptr::null_mut() };

    unsafe { (*blocks[0].as_ptr()).canary = 0 };
    assert_eq!(
      unsafe { registry.validate(boundary) },
      Err(AllocError::Corrupted("descriptor canary overwritten"))
    );
  }
}

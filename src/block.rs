use std::{mem, ptr::NonNull};

use crate::align_up;

/// Descriptor written in front of every region handed out by the allocator.
///
/// ```text
///   ┌──────┬──────┬─────────┬────────┬─────┐┌───────────────────┐
///   │ size │ next │ is_free │ canary │ pad ││ size usable bytes │
///   └──────┴──────┴─────────┴────────┴─────┘└───────────────────┘
///   ◄──────────── HEADER_SIZE ─────────────►▲
///                                           └── pointer returned to callers
/// ```
#[repr(C)]
pub struct Block {
  pub size: usize,
  pub next: *mut Block,
  pub is_free: bool,
  pub canary: u32,
}

/// Bytes between the start of a descriptor and the start of its data region.
pub const HEADER_SIZE: usize = align_up!(mem::size_of::<Block>());

impl Block {
  pub const CANARY: u32 = 0xB10C_A11C;

  pub fn new(
    size: usize,
    is_free: bool,
    next: *mut Block,
  ) -> Self {
    Self {
      size,
      next,
      is_free,
      canary: Self::CANARY,
    }
  }

  /// Writes a fresh in-use descriptor of `size` usable bytes at `at`.
  ///
  /// # Safety
  ///
  /// `at` must be aligned and valid for writes of `HEADER_SIZE + size` bytes.
  pub unsafe fn init(
    at: NonNull<u8>,
    size: usize,
  ) -> NonNull<Block> {
    let block = at.cast::<Block>();
    unsafe { block.as_ptr().write(Block::new(size, false, std::ptr::null_mut())) };
    block
  }

  /// Address of the data region following `block`.
  pub fn data(block: NonNull<Block>) -> NonNull<u8> {
    unsafe { NonNull::new_unchecked(block.as_ptr().cast::<u8>().wrapping_add(HEADER_SIZE)) }
  }

  /// Address of the descriptor owning the data region at `data`.
  pub fn from_data(data: NonNull<u8>) -> *mut Block {
    data.as_ptr().wrapping_sub(HEADER_SIZE).cast::<Block>()
  }

  /// Exclusive end address of the data region.
  pub fn end(&self) -> usize {
    self as *const Block as usize + HEADER_SIZE + self.size
  }

  pub fn canary_intact(&self) -> bool {
    self.canary == Self::CANARY
  }
}

use std::{alloc::Layout, fmt, ptr::NonNull};

use log::{debug, trace, warn};
use parking_lot::Mutex;

use crate::{
  align::{ALIGNMENT, is_aligned},
  align_up,
  arena::ArenaGrowth,
  block::{Block, HEADER_SIZE},
  config::AllocatorConfig,
  error::AllocError,
  registry::BlockRegistry,
};

/// Largest request whose descriptor, rounding and padding still fit in an
/// `isize` growth delta.
const MAX_REQUEST: usize = isize::MAX as usize - HEADER_SIZE - 2 * ALIGNMENT;

/// A snapshot of one block, as seen from the caller's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  /// Data address, i.e. the pointer handed out by `allocate`.
  pub addr: usize,
  /// Usable bytes, at least the size originally requested.
  pub size: usize,
  pub is_free: bool,
}

struct State<A> {
  arena: A,
  registry: BlockRegistry,
  /// Bytes claimed from the arena and not yet given back.
  claimed: usize,
}

// Descriptors live inside the arena owned by the same state, and every
// access to them goes through the allocator's mutex.
unsafe impl<A: Send> Send for State<A> {}

impl<A: ArenaGrowth> State<A> {
  fn boundary(&mut self) -> Result<usize, AllocError> {
    unsafe { self.arena.grow_or_shrink(0) }
      .map(|boundary| boundary.as_ptr() as usize)
      .ok_or(AllocError::Corrupted("arena boundary probe failed"))
  }

  /// Extends the arena by one descriptor plus `size` usable bytes and returns
  /// the new, not yet linked, descriptor.
  fn grow(
    &mut self,
    size: usize,
    limit: Option<usize>,
  ) -> Result<NonNull<Block>, AllocError> {
    let out_of_memory = AllocError::OutOfMemory { requested: size };

    let usable = align_up!(size);
    let total = HEADER_SIZE + usable;

    let boundary = self.boundary()?;
    let pad = align_up!(boundary) - boundary;
    let claim = pad + total;

    if limit.is_some_and(|limit| self.claimed + claim > limit) {
      warn!("arena limit reached: {} bytes claimed, {claim} more requested", self.claimed);
      return Err(out_of_memory);
    }

    let Some(previous) = (unsafe { self.arena.grow_or_shrink(claim as isize) }) else {
      warn!("arena refused to grow by {claim} bytes");
      return Err(out_of_memory);
    };

    let offset = align_up!(previous.as_ptr() as usize) - previous.as_ptr() as usize;
    if offset > pad {
      // Someone else moved the boundary between the probe and the growth.
      let undone = unsafe { self.arena.grow_or_shrink(-(claim as isize)) };
      debug_assert!(undone.is_some());
      warn!("arena boundary moved underneath the allocator");
      return Err(out_of_memory);
    }

    self.claimed += claim;

    let block = unsafe { Block::init(previous.add(offset), usable) };
    debug!(
      "grew arena by {claim} bytes: block {:p} holds {usable} bytes",
      block.as_ptr()
    );

    Ok(block)
  }

  fn blocks(&self) -> Vec<BlockInfo> {
    unsafe { self.registry.iter() }
      .map(|block| {
        let descriptor = unsafe { block.as_ref() };
        BlockInfo {
          addr: Block::data(block).as_ptr() as usize,
          size: descriptor.size,
          is_free: descriptor.is_free,
        }
      })
      .collect()
  }

  /// Hardened release checks. Leaves the state untouched on failure.
  fn verify(
    &self,
    data: NonNull<u8>,
    boundary: usize,
  ) -> Result<(), AllocError> {
    let addr = data.as_ptr() as usize;
    let invalid = AllocError::InvalidFree { addr };
    let descriptor = Block::from_data(data);

    if !is_aligned(addr)
      || self.registry.is_empty()
      || (descriptor as usize) < self.registry.head() as usize
      || addr >= boundary
    {
      return Err(invalid);
    }

    if !unsafe { self.registry.contains(descriptor) } {
      return Err(invalid);
    }

    let block = unsafe { &*descriptor };
    if !block.canary_intact() || block.is_free {
      return Err(invalid);
    }

    Ok(())
  }
}

/// A first-fit allocator over one growable arena.
///
/// All bookkeeping happens under a single mutex: an `allocate` or `release`
/// runs from registry scan through arena growth or shrink to the registry
/// update without any other call interleaving.
pub struct Allocator<A> {
  config: AllocatorConfig,
  state: Mutex<State<A>>,
}

impl<A> Allocator<A> {
  /// An allocator with an empty registry that has not claimed any memory yet.
  pub const fn new(arena: A) -> Self {
    Self::with_config(arena, AllocatorConfig::DEFAULT)
  }

  pub const fn with_config(
    arena: A,
    config: AllocatorConfig,
  ) -> Self {
    Self {
      config,
      state: parking_lot::const_mutex(State {
        arena,
        registry: BlockRegistry::new(),
        claimed: 0,
      }),
    }
  }

  pub fn config(&self) -> &AllocatorConfig {
    &self.config
  }
}

impl<A: ArenaGrowth> Allocator<A> {
  /// Hands out at least `size` bytes, aligned to 16.
  ///
  /// Reuses the first free block large enough, whole and unsplit, and grows
  /// the arena only when none fits.
  pub fn allocate(
    &self,
    size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    if size == 0 {
      return Err(AllocError::InvalidArgument);
    }

    if size > MAX_REQUEST {
      return Err(AllocError::OutOfMemory { requested: size });
    }

    let mut state = self.state.lock();

    if let Some(block) = unsafe { state.registry.find_free_block(size) } {
      unsafe { (*block.as_ptr()).is_free = false };
      trace!("reusing block {:p} for {size} bytes", block.as_ptr());
      return Ok(Block::data(block));
    }

    let block = state.grow(size, self.config.arena_limit)?;
    unsafe { state.registry.append(block) };

    Ok(Block::data(block))
  }

  /// [`allocate`](Self::allocate) for a [`Layout`].
  ///
  /// Alignments above 16 bytes are not supported.
  pub fn allocate_layout(
    &self,
    layout: Layout,
  ) -> Result<NonNull<u8>, AllocError> {
    if layout.align() > ALIGNMENT {
      return Err(AllocError::UnsupportedAlignment {
        align: layout.align(),
      });
    }

    self.allocate(layout.size())
  }

  /// Gives a block back.
  ///
  /// The block at the end of the arena is unlinked and its bytes returned to
  /// the arena backend. Any other block is only marked free for reuse; free
  /// neighbours are never merged.
  ///
  /// # Safety
  ///
  /// `ptr` must be null or a pointer returned by this allocator that has not
  /// been released since. With hardening enabled, pointers that fail
  /// validation are reported as [`AllocError::InvalidFree`] instead.
  pub unsafe fn release(
    &self,
    ptr: *mut u8,
  ) -> Result<(), AllocError> {
    let Some(data) = NonNull::new(ptr) else {
      return Ok(());
    };

    let mut state = self.state.lock();
    let boundary = state.boundary()?;

    if self.config.hardened {
      state
        .verify(data, boundary)
        .inspect_err(|_| warn!("rejected release of {ptr:p}: not a live allocation"))?;
    }

    let block = Block::from_data(data);
    let (end, size) = unsafe { ((*block).end(), (*block).size) };

    if end == boundary {
      debug_assert_eq!(block, state.registry.tail());
      unsafe { state.registry.remove_tail(NonNull::new_unchecked(block)) }?;

      let released = HEADER_SIZE + size;
      let shrunk = unsafe { state.arena.grow_or_shrink(-(released as isize)) };
      debug_assert!(shrunk.is_some());
      state.claimed = state.claimed.saturating_sub(released);

      debug!("shrank arena by {released} bytes releasing tail block {block:p}");
      return Ok(());
    }

    unsafe { (*block).is_free = true };
    trace!("marked block {block:p} free");

    Ok(())
  }

  /// Current high boundary of the arena.
  pub fn boundary(&self) -> Result<usize, AllocError> {
    self.state.lock().boundary()
  }

  /// Bytes claimed from the arena, descriptors and padding included.
  pub fn claimed(&self) -> usize {
    self.state.lock().claimed
  }

  /// Whether the registry holds no blocks at all.
  pub fn is_empty(&self) -> bool {
    self.state.lock().registry.is_empty()
  }

  /// Every block in registry order, oldest first.
  pub fn blocks(&self) -> Vec<BlockInfo> {
    self.state.lock().blocks()
  }

  /// Checks the registry's structural invariants and returns its block count.
  pub fn validate(&self) -> Result<usize, AllocError> {
    let mut state = self.state.lock();
    let boundary = state.boundary()?;
    unsafe { state.registry.validate(boundary) }
  }
}

impl<A: ArenaGrowth> fmt::Display for Allocator<A> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    let (blocks, claimed, boundary) = {
      let mut state = self.state.lock();
      let boundary = state.boundary().map_err(|_| fmt::Error)?;
      (state.blocks(), state.claimed, boundary)
    };

    writeln!(
      f,
      "{} blocks, {claimed} bytes claimed, boundary = {boundary:#x}",
      blocks.len()
    )?;

    for (i, block) in blocks.iter().enumerate() {
      writeln!(
        f,
        "  [{i}] {:#x} size = {} {}",
        block.addr,
        block.size,
        if block.is_free { "free" } else { "in use" }
      )?;
    }

    Ok(())
  }
}

use thiserror::Error;

/// Why an allocator call failed.
///
/// Every error is local to the call that produced it; the allocator stays
/// usable and its lock is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
  #[error("zero-size allocation requested")]
  InvalidArgument,
  #[error("arena cannot grow to satisfy a request of {requested} bytes")]
  OutOfMemory { requested: usize },
  #[error("alignment {align} exceeds the supported 16 bytes")]
  UnsupportedAlignment { align: usize },
  #[error("{addr:#x} is not a live allocation")]
  InvalidFree { addr: usize },
  #[error("block registry corrupted: {0}")]
  Corrupted(&'static str),
}

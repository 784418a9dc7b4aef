/// Tunables for an [`Allocator`](crate::Allocator).
///
/// All values are fixed once the allocator is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorConfig {
  /// Validate pointers passed to `release` (alignment, range, canary, double
  /// free) and report `InvalidFree` instead of corrupting the registry.
  ///
  /// Default: `true`.
  pub hardened: bool,

  /// Upper bound on the bytes the allocator will claim from its arena,
  /// counting descriptors and alignment padding.
  ///
  /// Default: `None` (bounded only by the arena backend).
  pub arena_limit: Option<usize>,
}

impl AllocatorConfig {
  pub const DEFAULT: Self = Self {
    hardened: true,
    arena_limit: None,
  };

  pub const fn with_hardening(
    mut self,
    hardened: bool,
  ) -> Self {
    self.hardened = hardened;
    self
  }

  pub const fn with_arena_limit(
    mut self,
    limit: usize,
  ) -> Self {
    self.arena_limit = Some(limit);
    self
  }
}

impl Default for AllocatorConfig {
  fn default() -> Self {
    Self::DEFAULT
  }
}

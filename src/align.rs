/// Alignment, in bytes, of every descriptor and every pointer handed out.
///
/// Fixed at 16 regardless of the platform word size, which covers every
/// primitive type including `u128` and SSE vectors.
pub const ALIGNMENT: usize = 16;

/// Rounds the given byte count up to the next multiple of [`ALIGNMENT`].
///
/// # Examples
///
/// ```rust
/// use brkalloc::align_up;
///
/// assert_eq!(align_up!(1), 16);
/// assert_eq!(align_up!(16), 16);
/// assert_eq!(align_up!(33), 48);
/// ```
#[macro_export]
macro_rules! align_up {
  ($value:expr) => {
    ($value + $crate::align::ALIGNMENT - 1) & !($crate::align::ALIGNMENT - 1)
  };
}

/// Whether `addr` sits on an [`ALIGNMENT`] boundary.
#[inline]
pub const fn is_aligned(addr: usize) -> bool {
  addr & (ALIGNMENT - 1) == 0
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_align_up() {
    let mut alignments = Vec::new();

    for i in 0..10 {
      let sizes = (ALIGNMENT * i + 1)..=(ALIGNMENT * (i + 1));

      let expected_alignment = ALIGNMENT * (i + 1);

      alignments.push((sizes, expected_alignment));
    }

    for (sizes, expected) in alignments {
      for size in sizes {
        assert_eq!(expected, align_up!(size));
      }
    }
  }

  #[test]
  fn zero_stays_zero() {
    assert_eq!(align_up!(0usize), 0);
  }

  #[test]
  fn test_is_aligned() {
    assert!(is_aligned(0));
    assert!(is_aligned(0x1000));
    assert!(!is_aligned(0x1008));
    assert!(!is_aligned(1));
  }
}

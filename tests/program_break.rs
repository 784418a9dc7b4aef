//! Runs against the real program break, so everything lives in one test to
//! keep the test harness from moving the break concurrently.

use brkalloc::{AllocError, global};

#[test]
fn global_allocator_uses_the_program_break() {
  assert_eq!(brkalloc::allocate(0), Err(AllocError::InvalidArgument));

  let first = brkalloc::allocate(48).unwrap();
  let second = brkalloc::allocate(24).unwrap();

  assert_eq!(first.as_ptr() as usize % 16, 0);
  assert_eq!(second.as_ptr() as usize % 16, 0);
  assert!(second.as_ptr() as usize >= first.as_ptr() as usize + 48);

  unsafe {
    first.as_ptr().write_bytes(0xAB, 48);
    second.as_ptr().write_bytes(0xCD, 24);
    assert_eq!(*first.as_ptr().add(47), 0xAB);
    assert_eq!(*second.as_ptr().add(23), 0xCD);
  }

  assert!(global().validate().is_ok());

  unsafe {
    brkalloc::release(second.as_ptr()).unwrap();
    brkalloc::release(first.as_ptr()).unwrap();
    assert_eq!(brkalloc::release(std::ptr::null_mut()), Ok(()));
  }

  assert!(global().blocks().iter().all(|block| block.is_free));
}

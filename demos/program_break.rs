use std::io::Read;

use brkalloc::{AllocError, ProgramBreak, global};
use libc::sbrk;

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`,
/// `gdb`, or just to watch the program break move between steps.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break using `sbrk(0)`.
fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    unsafe { sbrk(0) },
  );
}

fn print_registry(label: &str) {
  println!("[{label}] registry:\n{}", global());
}

fn main() -> Result<(), AllocError> {
  print_program_break("start");
  block_until_enter_pressed();

  // ------------------------------------------------------------------------
  // 1) Two allocations grow the break by one descriptor plus the
  //    (16-rounded) size each.
  // ------------------------------------------------------------------------
  let first = brkalloc::allocate(100)?;
  let second = brkalloc::allocate(12)?;
  unsafe {
    first.as_ptr().write_bytes(0xAB, 100);
    second.as_ptr().write_bytes(0xCD, 12);
  }
  println!("\n[1] first = {first:p}, second = {second:p}");
  print_program_break("1");
  print_registry("1");
  block_until_enter_pressed();

  // ------------------------------------------------------------------------
  // 2) Releasing the interior block only marks it free.
  // ------------------------------------------------------------------------
  unsafe { brkalloc::release(first.as_ptr())? };
  println!("\n[2] Released first (interior), the break does not move");
  print_program_break("2");
  print_registry("2");
  block_until_enter_pressed();

  // ------------------------------------------------------------------------
  // 3) A smaller request reuses the freed block whole.
  // ------------------------------------------------------------------------
  let third = brkalloc::allocate(50)?;
  println!(
    "\n[3] third = {third:p}, reused first? {}",
    if third == first { "Yes" } else { "No" }
  );
  print_program_break("3");
  block_until_enter_pressed();

  // ------------------------------------------------------------------------
  // 4) Releasing the tail block hands its bytes back to the OS.
  // ------------------------------------------------------------------------
  print_program_break("before tail release");
  unsafe { brkalloc::release(second.as_ptr())? };
  print_program_break("after tail release");
  print_registry("4");
  block_until_enter_pressed();

  // ------------------------------------------------------------------------
  // 5) Releasing a pointer twice is caught instead of corrupting the chain.
  // ------------------------------------------------------------------------
  unsafe { brkalloc::release(third.as_ptr())? };
  match unsafe { brkalloc::release(third.as_ptr()) } {
    Ok(()) => println!("\n[5] second release unexpectedly accepted"),
    Err(err) => println!("\n[5] second release rejected: {err}"),
  }

  println!(
    "\n[6] End of example ({:?} backend). Remaining blocks are reclaimed at exit.",
    ProgramBreak
  );

  Ok(())
}

use std::io::Read;

use freelist::{Heap, Sbrk};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap` or
/// `gdb` between steps, or just watch the program break move.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    Sbrk::program_break(),
  );
}

fn main() {
  env_logger::init();

  let mut heap = Heap::new(Sbrk);

  print_program_break("start");
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 1) Two small allocations carve the first increment.
  // --------------------------------------------------------------------
  let (Ok(a), Ok(b)) = (heap.allocate(10), heap.allocate(20)) else {
    eprintln!("the heap could not be grown");
    return;
  };
  println!("\n[1] allocate(10) = {a:?}, allocate(20) = {b:?}");
  print_program_break("after first allocations");
  heap.print_heap();
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 2) Releasing `a` puts it at the head of the free list, so the next
  //    small request reuses it.
  // --------------------------------------------------------------------
  unsafe { heap.release(a.as_ptr()) };
  let Ok(c) = heap.allocate(8) else {
    return;
  };
  println!(
    "\n[2] allocate(8) = {c:?}, reused the released block? {}",
    c == a
  );
  heap.print_heap();
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 3) Releasing both blocks coalesces everything back into one block.
  // --------------------------------------------------------------------
  unsafe {
    heap.release(b.as_ptr());
    heap.release(c.as_ptr());
  }
  println!("\n[3] released everything");
  heap.print_heap();
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 4) Exhaust the first increment to watch the heap grow.
  // --------------------------------------------------------------------
  while heap.growths() < 2 {
    if heap.allocate(100).is_err() {
      break;
    }
  }
  println!("\n[4] heap grew to {} bytes in {} increments", heap.heap_size(), heap.growths());
  print_program_break("after growth");
  heap.print_heap();

  println!("\n[5] End of example. Process will exit and the OS will reclaim all memory.");
}

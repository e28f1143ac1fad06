// Pattern 1: Stack Address Escaping Through an Output Parameter
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::time::Instant;

// Process-wide pointer slot, like a C global `int *pointer`.
static POINTER: AtomicPtr<i32> = AtomicPtr::new(ptr::null_mut());

fn define_pointer(parm_p: &AtomicPtr<i32>) {
    let mut a = [
        10, 25, 30, 40, 50, 60, 70, 80, 90, 100, 110, 120, 130, 140, 150, 160, 170, 180, 190,
        200,
    ];
    parm_p.store(&mut a[5] as *mut i32, Ordering::SeqCst);
    println!("{}", a[5]);
    println!("{:p}", parm_p.load(Ordering::SeqCst));
} // `a` is destroyed here - the stored address now dangles

fn main() {
    let start = Instant::now();

    define_pointer(&POINTER);
    let p = POINTER.load(Ordering::SeqCst);
    unsafe {
        *p = 80; // UB - the target stack frame no longer exists
        println!("Value pointed by pointer {}", *p);
    }
    println!("Address stored in pointer {:p}", p);

    println!(
        "Execution time: {} microseconds",
        start.elapsed().as_micros()
    );
}

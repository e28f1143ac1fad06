//==============================================================================
// Dangling Stack Pointer Demonstration - Complete Implementation
//==============================================================================

use colored::Colorize;
use std::io::{self, Write};
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

//==============================================================================
// Milestone 1: The Demonstration Frame and the Pointer Escape
//==============================================================================

/// Values held by the demonstration frame while it is alive.
const FRAME_VALUES: [i32; 20] = [
    10, 25, 30, 40, 50, 60, 70, 80, 90, 100, 110, 120, 130, 140, 150, 160, 170, 180, 190, 200,
];

/// Index of the element whose address escapes the frame.
const ESCAPED_INDEX: usize = 5;

/// Value the driver writes through the dangling pointer.
const DANGLING_WRITE: i32 = 80;

/// Process-wide pointer slot, the Rust spelling of a C global `int *pointer`.
static POINTER: AtomicPtr<i32> = AtomicPtr::new(ptr::null_mut());

/// Builds a stack-local array and stores the address of its sixth element
/// into `parm_p`, then prints that element's value and the stored address.
///
/// The array is destroyed when this function returns, so the slot is left
/// holding a dangling address. Dereferencing it afterwards is undefined
/// behavior, not a guaranteed read of 60.
fn define_pointer(parm_p: &AtomicPtr<i32>, out: &mut impl Write) -> io::Result<()> {
    let mut a = FRAME_VALUES;
    parm_p.store(&mut a[ESCAPED_INDEX] as *mut i32, Ordering::SeqCst);
    writeln!(out, "{}", a[ESCAPED_INDEX])?;
    writeln!(out, "{:p}", parm_p.load(Ordering::SeqCst))?;
    Ok(())
} // `a` no longer exists past this point

//==============================================================================
// Milestone 2: Wall-Clock Stopwatch
//==============================================================================

/// Wall-clock timer for the demo run.
pub struct Stopwatch {
    start: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Stopwatch {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_micros(&self) -> u128 {
        self.elapsed().as_micros()
    }
}

//==============================================================================
// Milestone 3: Driver
//==============================================================================

#[derive(Error, Debug)]
pub enum DemoError {
    #[error("failed to write diagnostic output: {0}")]
    Output(#[from] io::Error),
}

/// What the driver observed after writing through the escaped pointer.
#[derive(Debug)]
pub struct EscapeReport {
    pub address: usize,
    pub observed: i32,
    pub elapsed: Duration,
}

impl EscapeReport {
    pub fn summary(&self) -> String {
        let mut report = String::new();
        report.push_str(&format!("{}\n", "Escape summary".bold()));
        report.push_str(&format!("  Address stored in pointer {:#x}\n", self.address));
        report.push_str(&format!("  Value observed after write {}\n", self.observed));
        report.push_str(&format!(
            "  Execution time: {} microseconds\n",
            self.elapsed.as_micros()
        ));
        report
    }
}

/// Stores `value` through `p` and reads it back.
///
/// # Safety
///
/// `p` must point to live, writable storage for an `i32`. The driver below
/// calls this with a pointer whose frame is already gone, which is exactly
/// the bug being demonstrated.
unsafe fn write_through(p: *mut i32, value: i32) -> i32 {
    *p = value;
    *p
}

/// Runs the whole demonstration against the global slot.
fn run_demo(out: &mut impl Write) -> Result<EscapeReport, DemoError> {
    let watch = Stopwatch::start();

    define_pointer(&POINTER, out)?;

    let p = POINTER.load(Ordering::SeqCst);
    // The frame behind `p` is gone: nothing about the next two accesses
    // is defined.
    let observed = unsafe { write_through(p, DANGLING_WRITE) };
    writeln!(out, "Value pointed by pointer {}", observed)?;
    writeln!(out, "Address stored in pointer {:p}", p)?;

    writeln!(out, "Execution time: {} microseconds", watch.elapsed_micros())?;

    Ok(EscapeReport {
        address: p as usize,
        observed,
        elapsed: watch.elapsed(),
    })
}

//==============================================================================
// Milestone 4: Checked Alternatives
//==============================================================================

/// Returns the escaped element by value; no address leaves the frame.
fn checked_escape() -> i32 {
    let a = FRAME_VALUES;
    a[ESCAPED_INDEX]
}

/// Promotes the escaped element to the heap; the returned reference stays
/// valid to write through for the rest of the process.
fn promoted_escape() -> &'static mut i32 {
    Box::leak(Box::new(FRAME_VALUES[ESCAPED_INDEX]))
}

//==============================================================================
// Main Example
//==============================================================================

fn main() -> Result<(), DemoError> {
    let mut stdout = io::stdout().lock();

    writeln!(stdout, "{}", "=== Dangling Stack Pointer Demo ===".bold())?;
    writeln!(
        stdout,
        "{}",
        "⚠ the value and address below come from a destroyed stack frame".yellow()
    )?;

    let report = run_demo(&mut stdout)?;
    writeln!(stdout)?;
    write!(stdout, "{}", report.summary())?;

    writeln!(stdout)?;
    writeln!(stdout, "{}", "Checked alternatives".bold())?;
    writeln!(stdout, "  copy out: {}", checked_escape())?;
    let promoted = promoted_escape();
    *promoted = DANGLING_WRITE;
    writeln!(stdout, "  heap promotion after write: {}", promoted)?;
    writeln!(stdout, "{}", "✓ no dangling address involved".green())?;

    Ok(())
}

//==============================================================================
// Tests
//==============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn frame_holds_expected_values() {
        assert_eq!(FRAME_VALUES.len(), 20);
        assert_eq!(FRAME_VALUES[0], 10);
        assert_eq!(FRAME_VALUES[ESCAPED_INDEX], 60);
        assert_eq!(FRAME_VALUES[19], 200);
    }

    #[test]
    fn define_pointer_fills_slot_and_prints() {
        let slot = AtomicPtr::new(ptr::null_mut());
        let mut out = Vec::new();

        define_pointer(&slot, &mut out).unwrap();

        assert!(!slot.load(Ordering::SeqCst).is_null());

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("60"));
        assert!(lines.next().unwrap().starts_with("0x"));
    }

    #[test]
    fn write_through_live_storage_round_trips() {
        let mut target = 0;
        let observed = unsafe { write_through(&mut target, DANGLING_WRITE) };

        assert_eq!(observed, 80);
        assert_eq!(target, 80);
    }

    #[test]
    fn stopwatch_measures_at_least_the_sleep() {
        let watch = Stopwatch::start();
        thread::sleep(Duration::from_millis(5));

        assert!(watch.elapsed() >= Duration::from_millis(5));
        assert!(watch.elapsed_micros() >= 5_000);
    }

    #[test]
    fn stopwatch_is_monotonic() {
        let watch = Stopwatch::start();
        let first = watch.elapsed();
        let second = watch.elapsed();

        assert!(second >= first);
    }

    #[test]
    fn checked_escape_returns_the_element() {
        assert_eq!(checked_escape(), 60);
    }

    #[test]
    fn promoted_escape_accepts_the_write() {
        let slot = promoted_escape();
        assert_eq!(*slot, 60);

        *slot = DANGLING_WRITE;
        assert_eq!(*slot, 80);
    }

    #[test]
    fn summary_reports_elapsed_microseconds() {
        let report = EscapeReport {
            address: 0x7ffd_1234,
            observed: 80,
            elapsed: Duration::from_micros(42),
        };

        let summary = report.summary();
        assert!(summary.contains("42 microseconds"));
        assert!(summary.contains("0x7ffd1234"));
        assert!(summary.contains("80"));
    }
}

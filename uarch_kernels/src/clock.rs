//! Timer-call baseline kernel.
//!
//! Measures the round-trip cost of the wall-clock query everything else
//! in a measurement stack sits on top of. On current systems this is
//! usually a vDSO call rather than a real syscall, which is exactly the
//! cost worth knowing.

use crate::KernelArg;

/// Calls `gettimeofday` once per iteration into the same stack slot.
/// Returns the microsecond field of the last reading.
pub fn gettimeofday_bench(iters: u64, _arg: KernelArg) -> i64 {
    let mut tv = libc::timeval {
        tv_sec: 0,
        tv_usec: 0,
    };
    for _ in 0..iters {
        // SAFETY: `tv` is a valid timeval and a null timezone is allowed.
        unsafe {
            libc::gettimeofday(&mut tv, std::ptr::null_mut());
        }
    }
    // `tv_usec` is narrower than i64 on some platforms.
    tv.tv_usec.into()
}

#[cfg(test)]
mod tests {
    use super::gettimeofday_bench;
    use crate::KernelArg;

    #[test]
    fn microseconds_stay_in_range() {
        let usec = gettimeofday_bench(3, KernelArg::None);
        assert!((0..1_000_000).contains(&usec));
    }

    #[test]
    fn zero_iterations_leave_the_slot_zeroed() {
        assert_eq!(gettimeofday_bench(0, KernelArg::None), 0);
    }
}

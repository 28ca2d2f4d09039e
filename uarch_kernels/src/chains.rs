//! Multiply-chain and add-chain kernels.
//!
//! The multiply kernels push the same data through one serial product
//! chain and through four interleaved accumulators, measuring how much
//! of the multiply latency the out-of-order window can hide. The halves
//! summation splits each element into 16-bit halves, a pattern
//! autovectorizers handle unevenly across compilers. The portable add
//! chain is pure register arithmetic with an optimizer barrier between
//! decrements, a baseline for the add and exit-branch pipeline that
//! needs no platform timers or memory.

use crate::{opaque, KernelArg, SCRATCH_LEN};

/// Serial product of all elements, one multiply depending on the last.
#[must_use]
#[inline(never)]
pub fn mul_chain(data: &[u32]) -> u32 {
    let mut product: u32 = 1;
    for &x in data {
        product = product.wrapping_mul(x);
    }
    product
}

/// Product of all elements through four independent accumulators.
///
/// Equal to [`mul_chain`] on any length that is a multiple of four
/// (wrapping multiplication commutes); trailing elements beyond that are
/// ignored.
#[must_use]
#[inline(never)]
pub fn mul_chain4(data: &[u32]) -> u32 {
    let mut p1: u32 = 1;
    let mut p2: u32 = 1;
    let mut p3: u32 = 1;
    let mut p4: u32 = 1;
    for quad in data.chunks_exact(4) {
        p1 = p1.wrapping_mul(quad[0]);
        p2 = p2.wrapping_mul(quad[1]);
        p3 = p3.wrapping_mul(quad[2]);
        p4 = p4.wrapping_mul(quad[3]);
    }
    p1.wrapping_mul(p2).wrapping_mul(p3).wrapping_mul(p4)
}

/// Sum of `data[i] * data[i + 1] * m * i * i` over all adjacent pairs.
///
/// The quadratic index term keeps the products distinct enough that the
/// chain cannot be strength-reduced away.
#[must_use]
#[inline(never)]
pub fn mul_by(data: &[u32], m: u32) -> u32 {
    let mut sum: u32 = 0;
    for (i, pair) in data.windows(2).enumerate() {
        let i = i as u32;
        sum = sum.wrapping_add(
            pair[0]
                .wrapping_mul(pair[1])
                .wrapping_mul(m)
                .wrapping_mul(i)
                .wrapping_mul(i),
        );
    }
    sum
}

/// The two half-sums produced by [`sum_halves`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopBottom {
    /// Sum of the high 16-bit halves.
    pub top: u32,
    /// Sum of the low 16-bit halves.
    pub bottom: u32,
}

/// Sums the high and low 16-bit halves of every element separately, two
/// elements per pass. Expects an even length; a trailing odd element is
/// ignored.
#[must_use]
pub fn sum_halves(data: &[u32]) -> TopBottom {
    let mut top: u32 = 0;
    let mut bottom: u32 = 0;
    for pair in data.chunks_exact(2) {
        let elem = pair[0];
        top = top.wrapping_add(elem >> 16);
        bottom = bottom.wrapping_add(elem & 0xffff);
        let elem = pair[1];
        top = top.wrapping_add(elem >> 16);
        bottom = bottom.wrapping_add(elem & 0xffff);
    }
    TopBottom { top, bottom }
}

#[inline(always)]
fn scratch_pass<F>(iters: u64, f: F) -> i64
where
    F: Fn(&[u32], u32) -> u32,
{
    let buf = [0_u32; SCRATCH_LEN];
    opaque::sink_ptr(buf.as_ptr());
    let mut m: u32 = 123;
    opaque::modify(&mut m);
    for _ in 0..iters {
        opaque::sink(f(&buf, m));
    }
    0
}

/// Runs [`mul_by`] over a zeroed scratch buffer with an opaque
/// multiplier, once per iteration.
pub fn mul_by_bench(iters: u64, _arg: KernelArg) -> i64 {
    scratch_pass(iters, mul_by)
}

/// Runs [`mul_chain`] over a zeroed scratch buffer, once per iteration.
pub fn mul_chain_bench(iters: u64, _arg: KernelArg) -> i64 {
    scratch_pass(iters, |data, _m| mul_chain(data))
}

/// Runs [`mul_chain4`] over a zeroed scratch buffer, once per iteration.
pub fn mul_chain4_bench(iters: u64, _arg: KernelArg) -> i64 {
    scratch_pass(iters, |data, _m| mul_chain4(data))
}

/// Runs [`sum_halves`] over a zeroed scratch buffer, once per iteration,
/// sinking the combined half-sums.
pub fn sum_halves_bench(iters: u64, _arg: KernelArg) -> i64 {
    scratch_pass(iters, |data, _m| {
        let halves = sum_halves(data);
        halves.top.wrapping_add(halves.bottom)
    })
}

/// Four barriered decrements per pass, no memory traffic at all.
///
/// `iters` must be a nonzero multiple of four; the count underflows
/// otherwise. Returns the counter, always 0.
pub fn portable_add_chain(iters: u64, _arg: KernelArg) -> i64 {
    debug_assert!(iters != 0 && iters % 4 == 0);
    let mut n = iters;
    // `modify` keeps the decrements apart, so four real subtractions are
    // issued per pass instead of one folded `n -= 4`.
    loop {
        opaque::modify(&mut n);
        n -= 1;
        opaque::modify(&mut n);
        n -= 1;
        opaque::modify(&mut n);
        n -= 1;
        opaque::modify(&mut n);
        n -= 1;
        // No barrier between the last decrement and the test: that pair
        // stays eligible for fusion.
        if n == 0 {
            break;
        }
    }
    n as i64
}

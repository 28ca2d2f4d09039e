//! Table-lookup and gather kernels.
//!
//! The CRC8 walk is the degenerate gather: every load address is derived
//! from the previously loaded byte, one serial chain through a 256-entry
//! table. The two indirect sums gather `data[offsets[i]]` over pairs of
//! independent accumulators and differ only in how each index pair is
//! fetched: two 32-bit loads, or one 64-bit load split by shift and
//! mask.

use crate::{opaque, KernelArg, SCRATCH_LEN};

/// A real reflected-polynomial table would go here; all-zero entries
/// exercise exactly the same dependent load chain.
static LOOKUP_TABLE: [u8; 256] = [0; 256];

/// One CRC8 step per byte, each table index derived from the previous
/// lookup. The chain is serial by construction.
#[must_use]
pub fn crc8(crc: u8, data: &[u8]) -> u8 {
    let mut crc = crc;
    for &byte in data {
        crc = LOOKUP_TABLE[usize::from(crc ^ byte)];
    }
    crc
}

/// Runs [`crc8`] over a zeroed scratch buffer, feeding each iteration's
/// result into the next so iterations serialize.
pub fn crc8_bench(iters: u64, _arg: KernelArg) -> i64 {
    let buf = [0_u8; SCRATCH_LEN];
    opaque::sink_ptr(buf.as_ptr());
    let mut crc: u8 = 0;
    for _ in 0..iters {
        crc = crc8(crc, &buf);
    }
    i64::from(crc)
}

/// Pairwise gather-sum of `data[offsets[i]]`, walking `offsets` from the
/// end, one 32-bit index load per element.
///
/// # Safety
///
/// Every element of `offsets` must be a valid index into `data`, and
/// `offsets` must hold an even number of elements, at least two.
#[must_use]
#[inline(never)]
pub unsafe fn add_indirect_sum(data: &[u32], offsets: &[u32]) -> u32 {
    debug_assert!(offsets.len() >= 2 && offsets.len() % 2 == 0);
    let mut sum1: u32 = 0;
    let mut sum2: u32 = 0;
    let mut i = offsets.len();
    loop {
        // SAFETY: `i >= 2` here, and the index values are valid for
        // `data` per the function contract.
        unsafe {
            sum1 = sum1.wrapping_add(*data.get_unchecked(*offsets.get_unchecked(i - 1) as usize));
            sum2 = sum2.wrapping_add(*data.get_unchecked(*offsets.get_unchecked(i - 2) as usize));
        }
        i -= 2;
        if i == 0 {
            break;
        }
    }
    sum1.wrapping_add(sum2)
}

/// Like [`add_indirect_sum`], but each index pair arrives as a single
/// unaligned 64-bit load, split by shift and mask.
///
/// # Safety
///
/// Same contract as [`add_indirect_sum`].
#[must_use]
#[inline(never)]
pub unsafe fn add_indirect_shift_sum(data: &[u32], offsets: &[u32]) -> u32 {
    debug_assert!(offsets.len() >= 2 && offsets.len() % 2 == 0);
    let mut sum1: u32 = 0;
    let mut sum2: u32 = 0;
    let mut i = offsets.len();
    loop {
        // SAFETY: `i >= 2`, so the eight bytes ending at `offsets + i`
        // are in bounds; the index values are valid per the contract.
        unsafe {
            let packed = offsets.as_ptr().add(i - 2).cast::<u64>().read_unaligned();
            sum1 = sum1.wrapping_add(*data.get_unchecked((packed >> 32) as usize));
            sum2 = sum2.wrapping_add(*data.get_unchecked((packed & 0xffff_ffff) as usize));
        }
        i -= 2;
        if i == 0 {
            break;
        }
    }
    sum1.wrapping_add(sum2)
}

#[inline(always)]
fn gather_pass<F>(iters: u64, f: F) -> i64
where
    F: Fn(&[u32], &[u32]) -> u32,
{
    let data = [0_u32; SCRATCH_LEN];
    let offsets = [0_u32; SCRATCH_LEN];
    opaque::sink_ptr(data.as_ptr());
    opaque::sink_ptr(offsets.as_ptr());
    for _ in 0..iters {
        opaque::sink(f(&data, &offsets));
    }
    0
}

/// Gather-sum over zeroed scratch buffers, plain index loads.
pub fn add_indirect(iters: u64, _arg: KernelArg) -> i64 {
    // SAFETY: the offset buffer is all zeros, each a valid index into
    // the nonempty data buffer, and its length is even.
    gather_pass(iters, |data, offsets| unsafe {
        add_indirect_sum(data, offsets)
    })
}

/// Gather-sum over zeroed scratch buffers, packed index loads.
pub fn add_indirect_shift(iters: u64, _arg: KernelArg) -> i64 {
    // SAFETY: as for `add_indirect`.
    gather_pass(iters, |data, offsets| unsafe {
        add_indirect_shift_sum(data, offsets)
    })
}

//! Integer division latency and throughput kernels.
//!
//! Hardware dividers are early-out: cost depends on the magnitudes
//! involved, so each dividend width gets its own kernel set. Per width
//! there are four variants along two axes:
//!
//! - `lat` vs `tput`: the latency variants mix an opaque zero of the
//!   running sum into the next divisor, chaining the divides into one
//!   serial dependency; the throughput variants keep iterations
//!   independent.
//! - `inline` vs `noinline`: whether the divide is fused into the loop or
//!   sits behind an opaque call, exposing call overhead and the optimizer
//!   barrier as a measurable difference.
//!
//! Divisors run `1..=iters`, so a divide-by-zero cannot occur; the
//! divisor type carries that proof. Quotients accumulate wrapping and the
//! sum is returned as the proof-of-work sentinel.

use core::num::NonZeroU64;

use paste::paste;

use crate::{opaque::always_zero, ArgKind, KernelArg, KernelSpec};

/// 32-bit dividend, in the low half of a 64-bit operand.
const DIVIDEND_32: u64 = 0x12345678;
/// Full-width 64-bit dividend.
const DIVIDEND_64: u64 = 0x1234567812345678;

#[inline(always)]
fn div_32_64(divisor: NonZeroU64) -> u64 {
    DIVIDEND_32 / divisor
}

#[inline(always)]
fn div_64_64(divisor: NonZeroU64) -> u64 {
    DIVIDEND_64 / divisor
}

/// 128-bit dividend through the native 128/64 divide.
///
/// The divisor is ORed with a large constant so the quotient always fits
/// in 64 bits and the instruction cannot fault.
#[cfg(target_arch = "x86_64")]
#[inline(always)]
fn div_128_64(divisor: NonZeroU64) -> u64 {
    let divisor = divisor.get() | 0xF234567890123456;
    let quotient: u64;
    // SAFETY: the divisor is nonzero and exceeds the high dividend word,
    // so the quotient fits and `div` cannot fault.
    unsafe {
        core::arch::asm!(
            "div {divisor}",
            divisor = in(reg) divisor,
            inout("rax") 2_u64 => quotient,
            inout("rdx") 123_u64 => _,
            options(pure, nomem, nostack),
        );
    }
    quotient
}

/// Targets without a native 128/64 divide fall back to a constant, so the
/// kernel still satisfies the catalog contract there (and measures only
/// loop overhead).
#[cfg(not(target_arch = "x86_64"))]
#[inline(always)]
fn div_128_64(_divisor: NonZeroU64) -> u64 {
    1
}

/// The shared loop all division kernels instantiate.
///
/// `divide` is a function item, so each instantiation monomorphizes and
/// the call inlines away; the `noinline` kernels get their call boundary
/// from the outlined wrapper they pass in, not from this loop. With
/// `FORCE_DEP` the next divisor adds `sum & always_zero()`: numerically
/// nothing, but the compiler must order every divide after the previous
/// one.
#[inline(always)]
fn div_loop<F, const FORCE_DEP: bool>(iters: u64, divide: F) -> i64
where
    F: Fn(NonZeroU64) -> u64,
{
    let zero = always_zero();
    let mut sum: u64 = 0;
    for k in 1..=iters {
        let mut divisor = k;
        if FORCE_DEP {
            divisor = divisor.wrapping_add(sum & zero);
        }
        // SAFETY: `k >= 1` and the mixed-in term is zero at run time.
        sum = sum.wrapping_add(divide(unsafe { NonZeroU64::new_unchecked(divisor) }));
    }
    sum as i64
}

macro_rules! div_kernel_family {
    ($($suffix:ident: $desc:literal),+ $(,)?) => {
        paste! {
            $(
                #[inline(never)]
                fn [<div $suffix _outlined>](divisor: NonZeroU64) -> u64 {
                    [<div $suffix>](divisor)
                }

                #[doc = concat!("Division latency, ", $desc, ", divide inlined into the loop.")]
                pub fn [<div_lat_inline $suffix>](iters: u64, _arg: KernelArg) -> i64 {
                    div_loop::<_, true>(iters, [<div $suffix>])
                }

                #[doc = concat!("Division throughput, ", $desc, ", divide inlined into the loop.")]
                pub fn [<div_tput_inline $suffix>](iters: u64, _arg: KernelArg) -> i64 {
                    div_loop::<_, false>(iters, [<div $suffix>])
                }

                #[doc = concat!("Division latency, ", $desc, ", divide behind a call boundary.")]
                pub fn [<div_lat_noinline $suffix>](iters: u64, _arg: KernelArg) -> i64 {
                    div_loop::<_, true>(iters, [<div $suffix _outlined>])
                }

                #[doc = concat!("Division throughput, ", $desc, ", divide behind a call boundary.")]
                pub fn [<div_tput_noinline $suffix>](iters: u64, _arg: KernelArg) -> i64 {
                    div_loop::<_, false>(iters, [<div $suffix _outlined>])
                }
            )+

            /// Catalog entries for the whole family, four per width.
            pub(crate) static DIV_KERNELS: &[KernelSpec] = &[
                $(
                    KernelSpec {
                        name: stringify!([<div_lat_inline $suffix>]),
                        kernel: [<div_lat_inline $suffix>],
                        arg: ArgKind::None,
                    },
                    KernelSpec {
                        name: stringify!([<div_tput_inline $suffix>]),
                        kernel: [<div_tput_inline $suffix>],
                        arg: ArgKind::None,
                    },
                    KernelSpec {
                        name: stringify!([<div_lat_noinline $suffix>]),
                        kernel: [<div_lat_noinline $suffix>],
                        arg: ArgKind::None,
                    },
                    KernelSpec {
                        name: stringify!([<div_tput_noinline $suffix>]),
                        kernel: [<div_tput_noinline $suffix>],
                        arg: ArgKind::None,
                    },
                )+
            ];
        }
    };
}

// Adding a dividend width means one line here plus its divide helper
// above; the four variants and their catalog entries follow.
div_kernel_family! {
    _32_64: "32-bit dividend over a 64-bit divisor",
    _64_64: "64-bit dividend over a 64-bit divisor",
    _128_64: "128-bit dividend over a 64-bit divisor",
}

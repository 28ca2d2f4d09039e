//! Primitives that hide values and memory from the optimizer.
//!
//! Every measured loop in this library leans on one of these to keep the
//! compiler from folding, hoisting or deleting the work under test. Each
//! one compiles to zero instructions; only the dependencies it declares
//! differ:
//!
//! - [`sink`] consumes a value through a register, so computing it stays.
//! - [`sink_ptr`] additionally lets the template read memory, so prior
//!   stores through the pointer must have landed.
//! - [`modify`] routes a value through a register and back, detaching it
//!   from whatever the compiler knew about it.

use core::arch::asm;

mod sealed {
    pub trait Sealed {}
}

/// Integer types the opacity primitives accept: those that fit a general
/// purpose register on the targets we measure on.
pub trait Opaque: Copy + sealed::Sealed {
    #[doc(hidden)]
    fn sink_value(self);
    #[doc(hidden)]
    fn modify_in_place(&mut self);
}

// `asm!` requires every operand to appear in the template, so each
// template names its operand inside an assembler comment, which still
// assembles to nothing. Inside a comment the sub-register width of
// `u32`/`i32` does not matter, hence the `allow`s.
macro_rules! impl_opaque {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Opaque for $ty {
                #[inline(always)]
                #[allow(asm_sub_register)]
                fn sink_value(self) {
                    // SAFETY: comment-only template, register input only.
                    unsafe {
                        asm!(
                            "/* {0} */",
                            in(reg) self,
                            options(nomem, nostack, preserves_flags)
                        );
                    }
                }

                #[inline(always)]
                #[allow(asm_sub_register)]
                fn modify_in_place(&mut self) {
                    // SAFETY: comment-only template, register round trip only.
                    unsafe {
                        asm!(
                            "/* {0} */",
                            inout(reg) *self,
                            options(nomem, nostack, preserves_flags)
                        );
                    }
                }
            }
        )+
    };
}

impl_opaque!(u32, u64, usize, i32, i64);

/// Consumes `value` as if it were used, forcing its computation to happen.
///
/// The `asm` template is declared `nomem`, so surrounding memory traffic
/// stays unconstrained; only the register dependency is added.
#[inline(always)]
pub fn sink<T: Opaque>(value: T) {
    value.sink_value();
}

/// Consumes `ptr` as if the pointee (and anything reachable through it)
/// were read, forcing prior stores through it to be performed.
#[inline(always)]
pub fn sink_ptr<T>(ptr: *const T) {
    // No `nomem` here: the template is allowed to read any memory the
    // pointer reaches, which keeps stores to it alive and ordered.
    unsafe {
        asm!("/* {0} */", in(reg) ptr.cast::<u8>(), options(nostack, preserves_flags));
    }
}

/// Launders `value` through a register: same value out, but the compiler
/// can no longer connect it to its origin or assume anything about it.
#[inline(always)]
pub fn modify<T: Opaque>(value: &mut T) {
    value.modify_in_place();
}

/// A zero the compiler must treat as an arbitrary runtime value.
///
/// Mixing this into an operand (`x + (y & always_zero())`) creates a data
/// dependency on `y` without changing `x`, which is how the latency
/// variants of the division kernels serialize their iterations.
#[must_use]
#[inline(always)]
pub fn always_zero() -> u64 {
    let mut zero = 0_u64;
    modify(&mut zero);
    zero
}

#[cfg(test)]
mod tests {
    use super::{always_zero, modify, sink, sink_ptr};

    #[test]
    fn modify_preserves_the_value() {
        let mut a = 0x1234_5678_u32;
        modify(&mut a);
        assert_eq!(a, 0x1234_5678);

        let mut b = 0xdead_beef_u64;
        modify(&mut b);
        assert_eq!(b, 0xdead_beef);

        let mut c = usize::MAX - 1;
        modify(&mut c);
        assert_eq!(c, usize::MAX - 1);

        let mut d = -7_i32;
        modify(&mut d);
        assert_eq!(d, -7);

        let mut e = -1_i64 << 40;
        modify(&mut e);
        assert_eq!(e, -1_i64 << 40);
    }

    #[test]
    fn always_zero_is_zero() {
        assert_eq!(always_zero(), 0);
        assert_eq!(0x1234_u64 & always_zero(), 0);
    }

    #[test]
    fn sinks_accept_all_impls() {
        sink(1_u32);
        sink(2_u64);
        sink(3_usize);
        sink(-4_i32);
        sink(-5_i64);
        let mut buf = [1_u8, 2, 3];
        buf[1] = 9;
        sink_ptr(buf.as_ptr());
        sink_ptr(core::ptr::addr_of!(buf));
        assert_eq!(buf, [1, 9, 3]);
    }
}

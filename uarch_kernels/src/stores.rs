//! Strided store kernels.
//!
//! Each group of four iterations writes four zeros `stride` bytes apart,
//! with the group base offset wrapping inside a power-of-two window of
//! the region. Element widths of 1, 4 and 8 bytes expose store-buffer
//! and write-combining differences; depending on stride the wider stores
//! are unaligned, which is part of what gets measured.
//!
//! Only the group base is masked into the window. The three in-group
//! advances are not, so the caller must leave `3 * stride` plus one
//! element of slack past the window inside the region. That precondition
//! is debug-asserted at entry and is undefined behavior if violated in a
//! release build.

use core::mem::size_of;

use crate::{opaque, KernelArg};

macro_rules! strided_store_kernels {
    ($(($name:ident, $ty:ty)),+ $(,)?) => {
        $(
            #[doc = concat!(
                "Wraparound strided stores of zeroed `",
                stringify!($ty),
                "`, four per iteration group. Returns the region's first byte."
            )]
            pub fn $name(iters: u64, arg: KernelArg) -> i64 {
                let args = arg.strided();
                debug_assert!((args.mask + 1).is_power_of_two());
                debug_assert!(
                    args.mask + 1 + 3 * args.stride + size_of::<$ty>() <= args.region.len,
                    "region too small for the window plus in-group slack"
                );
                let base = args.region.start;
                let stride = args.stride;
                let mask = args.mask;
                let mut i: u64 = 0;
                while i < iters {
                    let offset = (i as usize).wrapping_mul(stride) & mask;
                    // SAFETY: `offset <= mask`, and the slack precondition
                    // keeps all four stores inside the region.
                    unsafe {
                        let mut p = base.add(offset);
                        p.cast::<$ty>().write_unaligned(0);
                        p = p.add(stride);
                        p.cast::<$ty>().write_unaligned(0);
                        p = p.add(stride);
                        p.cast::<$ty>().write_unaligned(0);
                        p = p.add(stride);
                        p.cast::<$ty>().write_unaligned(0);
                    }
                    i += 4;
                }
                opaque::sink_ptr(base);
                // SAFETY: the precondition implies the region is nonempty.
                unsafe { i64::from(*base) }
            }
        )+
    };
}

strided_store_kernels!(
    (strided_stores_u8, u8),
    (strided_stores_u32, u32),
    (strided_stores_u64, u64),
);

#[cfg(test)]
mod tests {
    use super::{strided_stores_u32, strided_stores_u64, strided_stores_u8};
    use crate::{Kernel, KernelArg, MemRegion, StrideArgs};

    #[test]
    fn byte_stores_land_on_the_masked_offsets() {
        let mut buf = vec![0xff_u8; 64];
        let args = StrideArgs::new(MemRegion::from_slice(&mut buf), 1, 16);

        // Group bases walk 0, 4, 8, 12 and wrap back to 0, so sixteen
        // iterations zero exactly the first sixteen bytes.
        assert_eq!(strided_stores_u8(16, KernelArg::Strided(&args)), 0);
        assert!(buf[..16].iter().all(|&b| b == 0));
        assert!(buf[16..].iter().all(|&b| b == 0xff));
    }

    #[test]
    fn wide_stores_cover_the_window() {
        let mut buf = vec![0xff_u8; 128];
        let args = StrideArgs::new(MemRegion::from_slice(&mut buf), 8, 32);

        assert_eq!(strided_stores_u64(8, KernelArg::Strided(&args)), 0);
        assert!(buf[..32].iter().all(|&b| b == 0));
        assert!(buf[32..].iter().all(|&b| b == 0xff));
    }

    #[test]
    fn zero_iterations_store_nothing() {
        let mut buf = vec![0xff_u8; 64];
        let args = StrideArgs::new(MemRegion::from_slice(&mut buf), 1, 16);

        // No store happens, so the returned first byte is untouched.
        assert_eq!(strided_stores_u8(0, KernelArg::Strided(&args)), 0xff);
        assert!(buf.iter().all(|&b| b == 0xff));
    }

    #[test]
    fn unaligned_wide_stores_are_fine() {
        let mut buf = vec![0xff_u8; 4096];
        let args = StrideArgs::new(MemRegion::from_slice(&mut buf), 3, 1024);

        assert_eq!(strided_stores_u64(256, KernelArg::Strided(&args)), 0);
    }

    #[test]
    fn sampled_shapes_never_write_past_the_slack_bound() {
        // Strides below, at and above the window. Nothing past
        // `window + 3 * stride` plus one element may change.
        let shapes: [(usize, usize); 7] =
            [(16, 1), (16, 8), (16, 24), (64, 16), (64, 64), (32, 40), (256, 96)];
        let widths: [(Kernel, usize); 3] = [
            (strided_stores_u8 as Kernel, 1),
            (strided_stores_u32 as Kernel, 4),
            (strided_stores_u64 as Kernel, 8),
        ];
        let mut buf = vec![0_u8; 4096];
        for &(window, stride) in &shapes {
            for &(kernel, width) in &widths {
                buf.fill(0xa5);
                let args = StrideArgs::new(MemRegion::from_slice(&mut buf), stride, window);

                // The first group always zeroes byte 0.
                assert_eq!(kernel(64, KernelArg::Strided(&args)), 0);
                let bound = window + 3 * stride + width;
                assert!(
                    buf[bound..].iter().all(|&b| b == 0xa5),
                    "store escaped: window {window}, stride {stride}, width {width}"
                );
            }
        }
    }
}

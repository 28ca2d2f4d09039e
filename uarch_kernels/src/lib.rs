#![doc = include_str!("../README.md")]
#![warn(clippy::cargo)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(
    clippy::unreadable_literal,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_lossless,
    clippy::cast_ptr_alignment,
    clippy::doc_markdown,
    clippy::inline_always,
    clippy::must_use_candidate,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::similar_names
)]
#![cfg_attr(not(test), warn(
    missing_debug_implementations,
    missing_docs,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications
))]

use std::sync::OnceLock;

pub mod chains;
pub mod chase;
#[cfg(unix)]
pub mod clock;
pub mod div;
pub mod indirect;
pub mod opaque;
pub mod shuffle;
pub mod stores;

/// Length, in elements, of the scratch buffers the self-contained kernels
/// allocate per call (multiply chains, table lookups, gathers).
pub const SCRATCH_LEN: usize = 4096;

/// We need fixed names for the parts of this library a harness selects from.
pub trait Named {
    /// Provide the name of this element.
    fn name(&self) -> &str;
}

/// The uniform kernel contract.
///
/// A harness picks a kernel, passes the iteration count and (where the
/// kernel needs one) a scratch-region descriptor, and times the call. The
/// returned value is a proof-of-work sentinel; apart from the properties
/// the per-family docs spell out, its numeric value carries no meaning.
pub type Kernel = fn(iters: u64, arg: KernelArg<'_>) -> i64;

/// A bounded scratch buffer, described but not owned.
///
/// The caller keeps the backing memory alive, pinned and exclusively
/// reserved for the kernel for the duration of one call.
#[derive(Debug, Clone, Copy)]
pub struct MemRegion {
    /// First byte of the region.
    pub start: *mut u8,
    /// Region length in bytes.
    pub len: usize,
}

impl MemRegion {
    /// Describes the region starting at `start` and spanning `len` bytes.
    #[must_use]
    pub fn new(start: *mut u8, len: usize) -> Self {
        Self { start, len }
    }

    /// Describes the memory behind a byte slice.
    #[must_use]
    pub fn from_slice(buf: &mut [u8]) -> Self {
        Self {
            start: buf.as_mut_ptr(),
            len: buf.len(),
        }
    }
}

/// Argument for the strided-store family: a region plus the access stride
/// and the size-minus-one mask bounding the power-of-two store window.
#[derive(Debug, Clone, Copy)]
pub struct StrideArgs {
    /// The scratch region the stores land in.
    pub region: MemRegion,
    /// Distance between consecutive stores, in bytes.
    pub stride: usize,
    /// `window - 1`, where `window` is the power-of-two span the per-group
    /// base offset wraps within.
    pub mask: usize,
}

impl StrideArgs {
    /// Builds the descriptor for a `window`-byte wraparound span inside
    /// `region`. `window` must be a power of two; store kernels further
    /// require `window + 3 * stride` plus one element of slack within the
    /// region (debug-asserted at kernel entry).
    #[must_use]
    pub fn new(region: MemRegion, stride: usize, window: usize) -> Self {
        debug_assert!(window.is_power_of_two());
        Self {
            region,
            stride,
            mask: window - 1,
        }
    }
}

/// What a kernel receives besides the iteration count.
///
/// The variant is resolved once at kernel entry, never inside the measured
/// loop. Passing the wrong variant is a caller bug and panics there.
#[derive(Debug, Clone, Copy)]
pub enum KernelArg<'a> {
    /// The kernel runs on its own (global or per-call) data.
    None,
    /// A plain scratch region.
    Region(&'a MemRegion),
    /// A region with stride and wraparound mask.
    Strided(&'a StrideArgs),
}

impl<'a> KernelArg<'a> {
    /// The region argument; panics if the caller supplied another variant.
    pub fn region(&self) -> &'a MemRegion {
        match *self {
            KernelArg::Region(region) => region,
            _ => panic!("kernel requires a region argument"),
        }
    }

    /// The strided-store argument; panics if the caller supplied another
    /// variant.
    pub fn strided(&self) -> &'a StrideArgs {
        match *self {
            KernelArg::Strided(args) => args,
            _ => panic!("kernel requires a strided-store argument"),
        }
    }
}

/// Argument shape a kernel expects, so a harness knows what to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Call with [`KernelArg::None`].
    None,
    /// Call with a [`KernelArg::Region`] holding a pre-built node cycle.
    Region,
    /// Call with a [`KernelArg::Strided`] descriptor.
    Strided,
}

/// One catalog entry: a kernel, its fixed name and its argument shape.
#[derive(Debug, Clone, Copy)]
pub struct KernelSpec {
    /// Name a harness selects the kernel by.
    pub name: &'static str,
    /// The kernel entry point.
    pub kernel: Kernel,
    /// Argument shape the kernel must be called with.
    pub arg: ArgKind,
}

impl Named for KernelSpec {
    fn name(&self) -> &str {
        self.name
    }
}

/// Every kernel in the library, in family order. Built once on first use.
pub fn kernels() -> &'static [KernelSpec] {
    static CATALOG: OnceLock<Vec<KernelSpec>> = OnceLock::new();
    CATALOG.get_or_init(|| {
        let mut all = Vec::with_capacity(32);
        all.extend_from_slice(div::DIV_KERNELS);
        all.extend_from_slice(&[
            KernelSpec {
                name: "linkedlist_counter",
                kernel: chase::linkedlist_counter,
                arg: ArgKind::None,
            },
            KernelSpec {
                name: "linkedlist_sentinel",
                kernel: chase::linkedlist_sentinel,
                arg: ArgKind::None,
            },
            KernelSpec {
                name: "shuffled_list_sum",
                kernel: chase::shuffled_list_sum,
                arg: ArgKind::Region,
            },
            KernelSpec {
                name: "strided_stores_u8",
                kernel: stores::strided_stores_u8,
                arg: ArgKind::Strided,
            },
            KernelSpec {
                name: "strided_stores_u32",
                kernel: stores::strided_stores_u32,
                arg: ArgKind::Strided,
            },
            KernelSpec {
                name: "strided_stores_u64",
                kernel: stores::strided_stores_u64,
                arg: ArgKind::Strided,
            },
            KernelSpec {
                name: "mul_by",
                kernel: chains::mul_by_bench,
                arg: ArgKind::None,
            },
            KernelSpec {
                name: "mul_chain",
                kernel: chains::mul_chain_bench,
                arg: ArgKind::None,
            },
            KernelSpec {
                name: "mul_chain4",
                kernel: chains::mul_chain4_bench,
                arg: ArgKind::None,
            },
            KernelSpec {
                name: "sum_halves",
                kernel: chains::sum_halves_bench,
                arg: ArgKind::None,
            },
            KernelSpec {
                name: "portable_add_chain",
                kernel: chains::portable_add_chain,
                arg: ArgKind::None,
            },
            KernelSpec {
                name: "crc8",
                kernel: indirect::crc8_bench,
                arg: ArgKind::None,
            },
            KernelSpec {
                name: "add_indirect",
                kernel: indirect::add_indirect,
                arg: ArgKind::None,
            },
            KernelSpec {
                name: "add_indirect_shift",
                kernel: indirect::add_indirect_shift,
                arg: ArgKind::None,
            },
        ]);
        #[cfg(unix)]
        all.push(KernelSpec {
            name: "gettimeofday",
            kernel: clock::gettimeofday_bench,
            arg: ArgKind::None,
        });
        all
    })
}

#[cfg(test)]
mod tests {
    use core::mem::size_of;
    use std::collections::HashSet;

    use crate::{
        chase::{build_shuffled_chain, ChaseNode},
        kernels, ArgKind, KernelArg, MemRegion, Named, StrideArgs,
    };

    #[test]
    fn catalog_names_are_unique() {
        let mut seen = HashSet::new();
        for spec in kernels() {
            assert!(seen.insert(spec.name()), "duplicate kernel {}", spec.name());
        }
    }

    #[test]
    fn every_kernel_runs_through_the_catalog() {
        let mut chain = vec![
            ChaseNode {
                value: 0,
                next: std::ptr::null(),
            };
            32
        ];
        build_shuffled_chain(&mut chain, 1);
        let chain_region = MemRegion::new(
            chain.as_mut_ptr().cast(),
            chain.len() * size_of::<ChaseNode>(),
        );

        let mut store_buf = vec![0u8; 8192];
        let stride_args = StrideArgs::new(MemRegion::from_slice(&mut store_buf), 64, 4096);

        // Eight iterations: small, and a multiple of four for the kernels
        // that consume four counts per pass.
        for spec in kernels() {
            let arg = match spec.arg {
                ArgKind::None => KernelArg::None,
                ArgKind::Region => KernelArg::Region(&chain_region),
                ArgKind::Strided => KernelArg::Strided(&stride_args),
            };
            let _ = (spec.kernel)(8, arg);
        }
    }

    #[test]
    #[should_panic(expected = "region argument")]
    fn wrong_argument_variant_panics() {
        let _ = KernelArg::None.region();
    }
}

//! Linked-list traversal kernels.
//!
//! Two strategies walk the same pre-built lists and differ only in how
//! the end is discovered: by counting down a stored element count, or by
//! testing each link against the end sentinel. The counter walk never
//! branches on the loaded link, the sentinel walk must. A third kernel
//! chases a shuffled node cycle laid out in caller memory, so neither
//! stride prefetch nor adjacent-line locality can hide the load latency.

use std::sync::OnceLock;

use static_assertions::const_assert_eq;

use crate::{shuffle::XorShift64, KernelArg};

/// How many lists one pass traverses. Enough to amortize the per-pass
/// overhead while the nodes all stay cache resident.
pub const LIST_COUNT: usize = 64;
/// Nodes per pre-built list. Short on purpose: the cost under test is
/// entering and leaving the walk, not steady-state link chasing.
pub const NODE_COUNT: usize = 5;

/// An owned list node. The link sits 8 bytes in, checked below, so the
/// walk kernels here stay layout-comparable with their companions in
/// other languages.
#[repr(C)]
#[derive(Debug)]
pub struct ListNode {
    value: i32,
    next: Option<Box<ListNode>>,
}

impl ListNode {
    /// Node payload.
    #[must_use]
    pub fn value(&self) -> i32 {
        self.value
    }

    /// The next node, if any.
    #[must_use]
    pub fn next(&self) -> Option<&ListNode> {
        self.next.as_deref()
    }
}

/// A list plus its element count.
///
/// Built only through [`ListHead::build`], so the stored count always
/// matches the chain length; the counter walk relies on that.
#[repr(C)]
#[derive(Debug)]
pub struct ListHead {
    size: i32,
    first: Option<Box<ListNode>>,
}

const_assert_eq!(core::mem::offset_of!(ListNode, next), 8);
const_assert_eq!(core::mem::offset_of!(ListHead, first), 8);

impl ListHead {
    /// Builds a list of `size` nodes: the first carries payload 1, the
    /// rest 0, so a full traversal sums to 1.
    #[must_use]
    pub fn build(size: usize) -> Self {
        let mut chain: Option<Box<ListNode>> = None;
        for _ in 1..size {
            chain = Some(Box::new(ListNode {
                value: 0,
                next: chain,
            }));
        }
        Self {
            size: size as i32,
            first: (size > 0).then(|| {
                Box::new(ListNode {
                    value: 1,
                    next: chain,
                })
            }),
        }
    }

    /// Stored element count.
    #[must_use]
    pub fn size(&self) -> i32 {
        self.size
    }

    /// First node, if any.
    #[must_use]
    pub fn first(&self) -> Option<&ListNode> {
        self.first.as_deref()
    }
}

/// The shared pool of pre-built lists, created on first use. Calling
/// this ahead of time keeps the build out of the first timed traversal.
pub fn lists() -> &'static [ListHead] {
    static LISTS: OnceLock<Vec<ListHead>> = OnceLock::new();
    LISTS.get_or_init(|| {
        log::debug!("building {LIST_COUNT} traversal lists of {NODE_COUNT} nodes");
        (0..LIST_COUNT).map(|_| ListHead::build(NODE_COUNT)).collect()
    })
}

/// Sums one list, walking as many links as the stored count says.
///
/// The loaded link is followed, never tested; construction guarantees it
/// is present for every counted step.
pub fn sum_list_counter(list: &ListHead) -> i64 {
    let mut sum: i32 = 0;
    let mut cur = list.first.as_deref();
    for _ in 0..list.size {
        // SAFETY: `build` links exactly `size` nodes.
        let node = unsafe { cur.unwrap_unchecked() };
        sum = sum.wrapping_add(node.value);
        cur = node.next.as_deref();
    }
    i64::from(sum)
}

/// Sums one list, walking until the end sentinel.
pub fn sum_list_sentinel(list: &ListHead) -> i64 {
    let mut sum: i32 = 0;
    let mut cur = list.first.as_deref();
    while let Some(node) = cur {
        sum = sum.wrapping_add(node.value);
        cur = node.next.as_deref();
    }
    i64::from(sum)
}

#[inline(always)]
fn list_pass<F>(iters: u64, sum_one: F) -> i64
where
    F: Fn(&ListHead) -> i64,
{
    let lists = lists();
    let mut sum: i32 = 0;
    for _ in 0..iters {
        for list in lists {
            sum = sum.wrapping_add(sum_one(list) as i32);
        }
    }
    i64::from(sum)
}

/// Count-bounded traversal over the shared list pool, one pass per
/// iteration. Returns the payload sum: `iters * LIST_COUNT`.
///
/// The pool is built lazily; harnesses should call [`lists`] once before
/// timing so the first measured pass does not pay for its construction.
pub fn linkedlist_counter(iters: u64, _arg: KernelArg) -> i64 {
    list_pass(iters, sum_list_counter)
}

/// Sentinel-bounded traversal over the shared list pool, one pass per
/// iteration. Returns the payload sum: `iters * LIST_COUNT`.
///
/// The pool is built lazily; harnesses should call [`lists`] once before
/// timing so the first measured pass does not pay for its construction.
pub fn linkedlist_sentinel(iters: u64, _arg: KernelArg) -> i64 {
    list_pass(iters, sum_list_sentinel)
}

/// A node of a caller-resident chase cycle.
///
/// Links are raw addresses into the caller's buffer, so the buffer must
/// stay pinned for as long as the cycle is walked.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ChaseNode {
    /// Payload summed by the walk.
    pub value: i32,
    /// Address of the next node in the cycle.
    pub next: *const ChaseNode,
}

const_assert_eq!(core::mem::offset_of!(ChaseNode, next), 8);

/// Links `nodes` into one cycle visited in a seeded shuffled order.
///
/// The entry stays at slice index 0 and is the only node with payload 1,
/// so one lap sums to 1. The node addresses are captured into the links;
/// the slice memory must not move afterwards.
///
/// # Panics
///
/// Panics if `nodes` is empty.
pub fn build_shuffled_chain(nodes: &mut [ChaseNode], seed: u64) {
    assert!(!nodes.is_empty(), "a chain needs at least one node");
    let n = nodes.len();
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = XorShift64::with_seed(seed);
    rng.shuffle(&mut order[1..]);
    let base = nodes.as_mut_ptr().cast_const();
    for pos in 0..n {
        let from = order[pos];
        let to = order[(pos + 1) % n];
        // SAFETY: `to < n`, in bounds of `nodes`.
        let next = unsafe { base.add(to) };
        nodes[from] = ChaseNode {
            value: i32::from(from == 0),
            next,
        };
    }
    log::trace!("chained {n} nodes in shuffled order, seed {seed:#x}");
}

/// Takes one lap around a node cycle, summing payloads. Visits every
/// node once: the entry is summed before the cycle test.
///
/// # Safety
///
/// `first` must point to a node whose links form a cycle returning to
/// `first`, all nodes alive for the whole lap.
pub unsafe fn sum_cycle(first: *const ChaseNode) -> i64 {
    let mut sum: i32 = 0;
    let mut cur = first;
    loop {
        // SAFETY: per the function contract.
        let node = unsafe { &*cur };
        sum = sum.wrapping_add(node.value);
        cur = node.next;
        if core::ptr::eq(cur, first) {
            break;
        }
    }
    i64::from(sum)
}

/// Chases the node cycle the caller laid out in the region, entering at
/// byte 0, one lap per iteration. Returns the payload sum: `iters` for a
/// [`build_shuffled_chain`] layout.
///
/// The region must hold a well-formed cycle entered at its first byte,
/// as produced by [`build_shuffled_chain`].
pub fn shuffled_list_sum(iters: u64, arg: KernelArg) -> i64 {
    let region = arg.region();
    let first: *const ChaseNode = region.start.cast::<ChaseNode>();
    let mut sum: i32 = 0;
    for _ in 0..iters {
        // SAFETY: the caller guarantees the cycle layout.
        sum = sum.wrapping_add(unsafe { sum_cycle(first) } as i32);
    }
    i64::from(sum)
}

#[cfg(test)]
mod tests {
    use core::mem::size_of;

    use super::{
        build_shuffled_chain, linkedlist_counter, linkedlist_sentinel, lists, shuffled_list_sum,
        sum_list_counter, sum_list_sentinel, ChaseNode, ListHead, LIST_COUNT, NODE_COUNT,
    };
    use crate::{KernelArg, MemRegion};

    #[test]
    fn pool_shape_matches_the_constants() {
        let pool = lists();
        assert_eq!(pool.len(), LIST_COUNT);
        for list in pool {
            assert_eq!(list.size(), NODE_COUNT as i32);
            let mut len = 0;
            let mut cur = list.first();
            while let Some(node) = cur {
                len += 1;
                cur = node.next();
            }
            assert_eq!(len, NODE_COUNT);
        }
    }

    #[test]
    fn both_strategies_sum_every_list_to_one() {
        for list in lists() {
            assert_eq!(sum_list_counter(list), 1);
            assert_eq!(sum_list_sentinel(list), 1);
        }
        let empty = ListHead::build(0);
        assert_eq!(sum_list_counter(&empty), 0);
        assert_eq!(sum_list_sentinel(&empty), 0);
    }

    #[test]
    fn kernels_return_one_per_list_per_pass() {
        assert_eq!(linkedlist_counter(1, KernelArg::None), LIST_COUNT as i64);
        assert_eq!(linkedlist_sentinel(1, KernelArg::None), LIST_COUNT as i64);
        assert_eq!(
            linkedlist_counter(3, KernelArg::None),
            linkedlist_sentinel(3, KernelArg::None)
        );
        assert_eq!(linkedlist_counter(0, KernelArg::None), 0);
    }

    #[test]
    fn pool_is_built_once_and_shared() {
        // A warm-up call and the kernels must see the same pool, or
        // pre-warming would not absorb the one-time build.
        let warmed = lists().as_ptr();
        linkedlist_counter(2, KernelArg::None);
        linkedlist_sentinel(2, KernelArg::None);
        assert!(core::ptr::eq(warmed, lists().as_ptr()));
    }

    #[test]
    fn shuffled_chain_is_a_single_cycle() {
        let mut nodes = vec![
            ChaseNode {
                value: 0,
                next: std::ptr::null(),
            };
            17
        ];
        build_shuffled_chain(&mut nodes, 0xfeed);
        let base = nodes.as_ptr();
        let mut seen = vec![false; nodes.len()];
        let mut cur: *const ChaseNode = &nodes[0];
        for _ in 0..nodes.len() {
            let idx = (cur as usize - base as usize) / size_of::<ChaseNode>();
            assert!(!seen[idx], "node {idx} visited twice");
            seen[idx] = true;
            cur = unsafe { (*cur).next };
        }
        assert!(core::ptr::eq(cur, &nodes[0]), "lap must close at the entry");
        assert!(seen.iter().all(|&v| v));
    }

    #[test]
    fn shuffled_kernel_sums_one_per_lap() {
        let mut nodes = vec![
            ChaseNode {
                value: 0,
                next: std::ptr::null(),
            };
            64
        ];
        build_shuffled_chain(&mut nodes, 7);
        let region = MemRegion::new(
            nodes.as_mut_ptr().cast(),
            nodes.len() * size_of::<ChaseNode>(),
        );
        assert_eq!(shuffled_list_sum(5, KernelArg::Region(&region)), 5);
        assert_eq!(shuffled_list_sum(0, KernelArg::Region(&region)), 0);
    }

    #[test]
    fn one_node_chain_self_loops() {
        let mut single = [ChaseNode {
            value: 0,
            next: std::ptr::null(),
        }];
        build_shuffled_chain(&mut single, 0);
        assert!(core::ptr::eq(single[0].next, &single[0]));
        let region = MemRegion::new(single.as_mut_ptr().cast(), size_of::<ChaseNode>());
        assert_eq!(shuffled_list_sum(3, KernelArg::Region(&region)), 3);
    }
}

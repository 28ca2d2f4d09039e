//! Deterministic shuffling for scattered memory layouts.
//!
//! Pointer-chase buffers want a visit order that defeats hardware
//! prefetching but is reproducible across runs, so the generator here is
//! seeded, not entropy-backed.

/// One splitmix64 step, used to spread a user seed over the whole state
/// space before it feeds the xorshift core.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e3779b97f4a7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

/// Xorshift64 generator with splitmix64 seeding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// Creates a generator from `seed`. Any seed is fine, including zero.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        let mut seed = seed;
        // Xorshift has a fixed point at zero, so force a bit on.
        Self {
            state: splitmix64(&mut seed) | 1,
        }
    }

    /// The next 64-bit value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// A value in `0..bound` via the widening-multiply reduction.
    #[inline]
    pub fn below(&mut self, bound: u64) -> u64 {
        debug_assert_ne!(bound, 0);
        ((u128::from(self.next_u64()) * u128::from(bound)) >> 64) as u64
    }

    /// Fisher-Yates shuffle of `items`.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.below(i as u64 + 1) as usize;
            items.swap(i, j);
        }
    }
}

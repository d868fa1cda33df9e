use rand::{Rng, SeedableRng, rng, rngs::StdRng};

/// A trait for random sources that return uniformly distributed integers.
///
/// This abstraction allows you to plug in a real random source or a mocked
/// random source in tests. Every random field of a record is derived from
/// [`RandSource::below`].
///
/// # Example
/// ```
/// use rowfeed::RandSource;
///
/// struct FixedRand;
/// impl RandSource for FixedRand {
///     fn below(&mut self, bound: u64) -> u64 {
///         1234 % bound
///     }
/// }
///
/// let mut rng = FixedRand;
/// assert_eq!(rng.below(100), 34);
/// ```
pub trait RandSource {
    /// Returns a uniformly random integer in `[0, bound)`.
    ///
    /// Callers never pass a `bound` of zero.
    fn below(&mut self, bound: u64) -> u64;
}

/// A `RandSource` that uses the thread-local RNG (`rand::rng()`).
///
/// This type does **not** store the RNG itself; it accesses the thread-local
/// generator on each call, so it is `Send` and can move with a Tokio task
/// between worker threads.
#[derive(Default, Clone, Debug)]
pub struct ThreadRandom;

impl RandSource for ThreadRandom {
    fn below(&mut self, bound: u64) -> u64 {
        rng().random_range(0..bound)
    }
}

/// A reproducible `RandSource` seeded from a `u64`.
///
/// Two instances created with the same seed yield the same sequence, which
/// makes whole batches reproducible across runs.
#[derive(Clone, Debug)]
pub struct SeededRandom {
    inner: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandSource for SeededRandom {
    fn below(&mut self, bound: u64) -> u64 {
        self.inner.random_range(0..bound)
    }
}

impl<R: RandSource + ?Sized> RandSource for Box<R> {
    fn below(&mut self, bound: u64) -> u64 {
        (**self).below(bound)
    }
}

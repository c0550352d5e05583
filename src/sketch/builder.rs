use std::cell::RefCell;
use std::rc::Rc;

use crate::adapter::ParamTuner;
use crate::decay::{DecayFn, ExpDecay};
use crate::hash::{SketchKey, DEFAULT_SEED};

use super::EvolvingSketch;

/// Builder for configuring and constructing an [`EvolvingSketch`].
///
/// # Example
/// ```
/// use embers::{Adapter, EpsilonGreedy, EvolvingSketch, SketchBuilder};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let adapter = Rc::new(RefCell::new(Adapter::new(EpsilonGreedy::new(0.01, 1000.0))));
/// let sketch: EvolvingSketch<u64> = SketchBuilder::new(1 << 16)
///     .initial_alpha(1.0)
///     .adapter(adapter.clone())
///     .adapt_interval(10_000)
///     .build();
/// ```
pub struct SketchBuilder<F = ExpDecay> {
    size: usize,
    initial_alpha: f64,
    decay: F,
    hash_seed: u64,
    adapter: Option<Rc<RefCell<dyn ParamTuner>>>,
    adapt_interval: u32,
    tuning_interval: u32,
    seed: Option<u64>,
}

impl SketchBuilder<ExpDecay> {
    /// Starts a builder for a sketch of roughly `size` counters
    /// (rounded up to 4 rows × a power-of-two width).
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "sketch size must be greater than 0");
        SketchBuilder {
            size,
            initial_alpha: 1.0,
            decay: ExpDecay,
            hash_seed: DEFAULT_SEED,
            adapter: None,
            adapt_interval: 0,
            tuning_interval: 0,
            seed: None,
        }
    }
}

impl<F: DecayFn> SketchBuilder<F> {
    /// Decay intensity the sketch starts with (default 1.0).
    pub fn initial_alpha(mut self, alpha: f64) -> Self {
        assert!(
            alpha.is_finite() && alpha > 0.0,
            "initial alpha must be positive and finite"
        );
        self.initial_alpha = alpha;
        self
    }

    /// Replaces the decay function (default [`ExpDecay`]).
    ///
    /// The replacement must share the contract: monotone non-decreasing
    /// in `t` for positive α, and exactly 1 at `t = 0`.
    pub fn decay<G: DecayFn>(self, decay: G) -> SketchBuilder<G> {
        SketchBuilder {
            size: self.size,
            initial_alpha: self.initial_alpha,
            decay,
            hash_seed: self.hash_seed,
            adapter: self.adapter,
            adapt_interval: self.adapt_interval,
            tuning_interval: self.tuning_interval,
            seed: self.seed,
        }
    }

    /// Seed for the key hash (default 42).
    pub fn hash_seed(mut self, seed: u64) -> Self {
        self.hash_seed = seed;
        self
    }

    /// Attaches an adapter.  It is only consulted when
    /// [`adapt_interval`](Self::adapt_interval) is non-zero.
    pub fn adapter(mut self, adapter: Rc<RefCell<dyn ParamTuner>>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Number of updates between adapter invocations; 0 (the default)
    /// disables adaptation.
    pub fn adapt_interval(mut self, interval: u32) -> Self {
        self.adapt_interval = interval;
        self
    }

    /// Legacy periodic rescale schedule, independent of overflow; 0 (the
    /// default) disables it.  The overflow-driven rescale is always
    /// active regardless.
    pub fn tuning_interval(mut self, interval: u32) -> Self {
        self.tuning_interval = interval;
        self
    }

    /// Pins the RNG the row seeds are drawn from, making the sketch's
    /// index layout reproducible.  By default the seeds come from system
    /// entropy.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build<K: SketchKey>(self) -> EvolvingSketch<K, F> {
        EvolvingSketch::from_parts(
            self.size,
            self.initial_alpha,
            self.decay,
            self.hash_seed,
            self.adapter,
            self.adapt_interval,
            self.tuning_interval,
            self.seed,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decay::DecayFn;

    #[test]
    #[should_panic(expected = "sketch size")]
    fn zero_size_is_rejected() {
        let _ = SketchBuilder::new(0);
    }

    #[test]
    #[should_panic(expected = "initial alpha")]
    fn non_positive_alpha_is_rejected() {
        let _ = SketchBuilder::new(32).initial_alpha(0.0);
    }

    #[test]
    fn seeded_builds_are_reproducible() {
        let mut a: EvolvingSketch<u64> = SketchBuilder::new(128).seed(11).build();
        let mut b: EvolvingSketch<u64> = SketchBuilder::new(128).seed(11).build();
        for i in 0..200u64 {
            a.update(&(i % 13));
            b.update(&(i % 13));
        }
        for key in 0..13u64 {
            assert_eq!(a.estimate(&key), b.estimate(&key), "key {key}");
        }
    }

    #[test]
    fn custom_decay_is_used() {
        /// Constant 1: no decay at all, plain Count-Min behavior.
        struct Flat;
        impl DecayFn for Flat {
            fn eval(&self, _t: u32, _alpha: f64) -> f32 {
                1.0
            }
        }

        let mut s: EvolvingSketch<u64, Flat> = SketchBuilder::new(64).decay(Flat).seed(2).build();
        for _ in 0..10 {
            s.update(&1);
        }
        assert_eq!(s.estimate(&1), 10.0);
    }
}

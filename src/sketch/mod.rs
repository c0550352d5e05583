//! The evolving sketch: a decayed Count-Min counter matrix with online
//! tuning of its decay intensity.

mod builder;

pub use builder::SketchBuilder;

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::adapter::ParamTuner;
use crate::decay::{DecayFn, ExpDecay};
use crate::hash::SketchKey;
use crate::metrics::stats::{OpStats, Telemetry};

/// Number of hashed rows.  Four is the Count-Min sweet spot this design is
/// tuned for; the row-index derivation below bakes it in.
pub const DEPTH: usize = 4;

/// Largest value a counter may reach: 2²⁴ − 1, the biggest integer a `f32`
/// holds exactly such that adding 1 is not lost to rounding.
pub const PRUNE_THRESHOLD: f32 = 16_777_215.0;

/// MurmurHash2 multiplier, reused to derive row indices from each other.
const ALT_INDEX_MULT: u64 = 0x5bd1_e995;

/// f32 lanes per cache line.
const LANES: usize = 16;

/// One cache line of counters.  Keeping the matrix in 64-byte blocks
/// aligns every row segment to a cache line; `pos >> 4` / `pos & 15`
/// replace pointer arithmetic.
#[repr(align(64))]
#[derive(Clone, Copy)]
struct CounterBlock([f32; LANES]);

/// A time-decaying frequency sketch.
///
/// `d = 4` rows of `w` single-precision counters, where `w` is the power
/// of two nearest above `size / 4` (floor 8).  Every update adds
/// `f(t, α)` to one counter per row; since `f` grows with `t`, newer
/// updates weigh exponentially more, and `estimate` divides by the
/// current `f(t, α)` to read a decayed frequency.
///
/// When a counter would pass [`PRUNE_THRESHOLD`] the whole matrix is
/// rescaled by `1 / f(t, α)` and `t` restarts at zero.  The exponential
/// form makes this a pure re-anchoring of time: every ratio between
/// counters, and hence every estimate ordering, is preserved.
///
/// With an adapter attached (see [`SketchBuilder::adapter`]) the sketch
/// additionally reports a reward — the [`sum`](Self::sum) accumulator
/// normalized by the interval — every `adapt_interval` updates and adopts
/// the α the adapter returns.  Without one it behaves as a pruning-only
/// decayed Count-Min.
///
/// Single-threaded by contract: updates are wait-free but the sketch is
/// not `Sync`, and `sum` has exactly one writer (the workload) and one
/// reader (the adapt tick).
pub struct EvolvingSketch<K, F = ExpDecay> {
    width: usize,
    blocks: Vec<CounterBlock>,
    /// Row-index derivation seeds; index 0 is unused (row 0 hashes the
    /// key directly).
    seeds: [u64; DEPTH],
    t: u32,
    alpha: f64,
    decay: F,
    hash_seed: u64,

    adapter: Option<Rc<RefCell<dyn ParamTuner>>>,
    adapt_interval: u32,
    adapt_counter: u32,
    tuning_interval: u32,
    tuning_counter: u32,

    /// Reward accumulator.  The workload adds a contribution per cache
    /// hit (or ranking reward) between adapt ticks; the sketch only
    /// normalizes and resets it.
    pub sum: f64,

    stats: OpStats,
    _key: PhantomData<K>,
}

impl<K: SketchKey> EvolvingSketch<K, ExpDecay> {
    /// A sketch with default options: α = 1.0, exponential decay, no
    /// adapter.  See [`SketchBuilder`] for the rest of the knobs.
    pub fn new(size: usize) -> Self {
        SketchBuilder::new(size).build()
    }
}

impl<K: SketchKey, F: DecayFn> EvolvingSketch<K, F> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        size: usize,
        initial_alpha: f64,
        decay: F,
        hash_seed: u64,
        adapter: Option<Rc<RefCell<dyn ParamTuner>>>,
        adapt_interval: u32,
        tuning_interval: u32,
        seed: Option<u64>,
    ) -> Self {
        let width = (size / DEPTH).max(8).next_power_of_two();

        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let mut seeds = [0u64; DEPTH];
        for s in &mut seeds {
            *s = rng.gen();
        }

        EvolvingSketch {
            width,
            blocks: vec![CounterBlock([0.0; LANES]); DEPTH * width / LANES],
            seeds,
            t: 0,
            alpha: initial_alpha,
            decay,
            hash_seed,
            adapter,
            adapt_interval,
            adapt_counter: 0,
            tuning_interval,
            tuning_counter: 0,
            sum: 0.0,
            stats: OpStats::new(),
            _key: PhantomData,
        }
    }

    // -----------------------------------------------------------------------
    // Hot path
    // -----------------------------------------------------------------------

    /// Records one occurrence of `key`.
    ///
    /// If committing the increment would push any of the key's counters
    /// past [`PRUNE_THRESHOLD`], no counter is touched: the matrix is
    /// pruned and the update retried.  Either all four counters absorb
    /// the increment or none do, and `t` advances exactly once per
    /// completed call.
    pub fn update(&mut self, key: &K) {
        let start = Instant::now();

        let slots = self.slots(key);
        loop {
            let inc = self.decay.eval(self.t + 1, self.alpha);
            if slots.iter().any(|&pos| self.cell(pos) > PRUNE_THRESHOLD - inc) {
                self.prune();
                continue;
            }
            for &pos in &slots {
                *self.cell_mut(pos) += inc;
            }
            self.t += 1;
            break;
        }

        let mut adapted = false;
        if self.adapt_interval != 0 {
            self.adapt_counter += 1;
            if self.adapt_counter >= self.adapt_interval {
                self.adapt();
                adapted = true;
            }
        }
        if !adapted && self.tuning_interval != 0 {
            self.tuning_counter += 1;
            if self.tuning_counter >= self.tuning_interval {
                self.prune();
                self.tuning_counter = 0;
            }
        }

        self.stats.record_update(start);
    }

    /// The decayed frequency estimate for `key`: the minimum over rows of
    /// `counter / f(t, α)`.
    ///
    /// Never underestimates the true decayed count; equals it when none
    /// of the key's four counters is shared with another key.
    pub fn estimate(&self, key: &K) -> f32 {
        let start = Instant::now();

        let norm = self.decay.eval(self.t, self.alpha);
        let mut res = f32::MAX;
        for &pos in &self.slots(key) {
            res = res.min(self.cell(pos) / norm);
        }

        self.stats.record_estimate(start);
        res
    }

    // -----------------------------------------------------------------------
    // Rescaling and adaptation
    // -----------------------------------------------------------------------

    /// Rescales every counter by `1 / f(t, α)` and restarts `t`.
    ///
    /// Equivalent to re-anchoring time at zero: counter ratios, and with
    /// them all estimate orderings, are unchanged.
    fn prune(&mut self) {
        let d_scale = self.decay.eval(self.t, self.alpha);
        for block in &mut self.blocks {
            for cell in &mut block.0 {
                *cell /= d_scale;
            }
        }
        self.t = 0;
        self.stats.record_prune();
        trace!(scale = d_scale, "rescaled counter matrix");
    }

    /// One adapt tick: re-anchor, normalize the accumulated reward, and
    /// let the adapter pick the next α.
    fn adapt(&mut self) {
        // Prune first — bounds counter magnitude and resets `t` so the
        // upcoming interval is evaluated from a clean anchor.
        self.prune();
        self.tuning_counter = 0;

        if let Some(adapter) = &self.adapter {
            let reward = self.sum / self.adapt_interval as f64;
            self.sum = 0.0;
            self.alpha = adapter.borrow_mut().tune(reward, self.alpha);
        }

        self.adapt_counter = 0;
    }

    // -----------------------------------------------------------------------
    // Indexing
    // -----------------------------------------------------------------------

    /// Positions of `key`'s counters, one per row.
    ///
    /// Row 0 indexes by the key hash; each later row xors the previous
    /// index with a seed mixed by the MurmurHash2 constant.  `width` is a
    /// power of two, so the wrap is a single AND.
    #[inline]
    fn slots(&self, key: &K) -> [usize; DEPTH] {
        let mask = self.width - 1;
        let mut index = key.hash_with(self.hash_seed) as usize & mask;

        let mut slots = [0usize; DEPTH];
        slots[0] = index;
        for i in 1..DEPTH {
            index = (index ^ self.seeds[i].wrapping_mul(ALT_INDEX_MULT) as usize) & mask;
            slots[i] = i * self.width + index;
        }
        slots
    }

    #[inline]
    fn cell(&self, pos: usize) -> f32 {
        self.blocks[pos >> 4].0[pos & (LANES - 1)]
    }

    #[inline]
    fn cell_mut(&mut self, pos: usize) -> &mut f32 {
        &mut self.blocks[pos >> 4].0[pos & (LANES - 1)]
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    /// Current decay intensity.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Updates since the last rescale.
    pub fn ticks(&self) -> u32 {
        self.t
    }

    /// Columns per row; always a power of two ≥ 8.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Running operation counts and timing averages.
    pub fn telemetry(&self) -> Telemetry {
        self.stats.snapshot()
    }
}

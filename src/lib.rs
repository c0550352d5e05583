//! Embers — a time-decaying frequency sketch that tunes its own decay rate.
//!
//! The centerpiece is [`EvolvingSketch`], a Count-Min-style counter matrix
//! whose per-update increment grows as `exp(α·t/10000)`.  Recent activity
//! therefore dominates old activity, and dividing an estimate by the current
//! growth factor yields an exponentially time-weighted frequency.  When any
//! counter approaches the largest integer a `f32` can represent exactly, the
//! whole matrix is rescaled in place ("pruned"), which re-anchors time
//! without disturbing the relative order of any two keys.
//!
//! The decay intensity `α` can be adjusted online: attach an [`Adapter`]
//! (ε-greedy or sliding-window Thompson sampling over a log-spaced grid of
//! candidate values, or plain gradient descent) and the sketch will feed it
//! a normalized reward every `adapt_interval` updates.
//!
//! [`WTinyLfuPolicy`] consumes the sketch's estimates to arbitrate cache
//! admissions the W-TinyLFU way: a small Window segment in front of
//! Probation and Protected segments, with the sketch deciding which of two
//! eviction candidates is the more valuable.
//!
//! Everything in this crate is single-threaded by contract: one sketch, one
//! adapter, one policy, driven by one workload loop.

mod decay;
mod hash;
mod metrics;

pub mod adapter;
pub mod policy;
pub mod sketch;

pub use adapter::{
    Adapter, AdaptStrategy, EpsilonGreedy, GradientDescent, ParamTuner, SlidingWindowThompson,
    StepSize,
};
pub use decay::{DecayFn, ExpDecay};
pub use hash::SketchKey;
pub use metrics::stats::Telemetry;
pub use policy::tinylfu::WTinyLfuPolicy;
pub use policy::{Cache, Segment};
pub use sketch::{EvolvingSketch, SketchBuilder};

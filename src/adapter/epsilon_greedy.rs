use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{log_spaced_arms, AdaptStrategy};

/// Default exploration rate.
pub const DEFAULT_EPSILON: f64 = 0.1;
/// Default number of candidate parameter values.
pub const DEFAULT_ARM_COUNT: usize = 100;

/// How the per-arm estimate moves toward a new reward.
pub enum StepSize {
    /// `1/n` after the n-th pull — the estimate is the sample mean of all
    /// rewards the arm has seen.
    SampleMean,
    /// A fixed step, weighting recent rewards geometrically more.
    Constant(f64),
    /// Arbitrary schedule as a function of the arm's pull count.
    Custom(Box<dyn Fn(u64) -> f64>),
}

/// ε-greedy bandit over a log-spaced grid of parameter values.
///
/// Each arm keeps an estimate `Q` of its expected reward and a pull count.
/// On every call the current arm's estimate absorbs the observed reward
/// (`Q ← Q + step·(r − Q)`), then with probability ε a uniformly random
/// arm is chosen, otherwise the arm with the largest estimate.  Ties in
/// the argmax go to the smallest index, so runs with a fixed RNG seed are
/// fully reproducible.
pub struct EpsilonGreedy {
    arms: Vec<f64>,
    estimates: Vec<f64>,
    pulls: Vec<u64>,
    current_arm: usize,
    epsilon: f64,
    step: StepSize,
    rng: StdRng,
}

impl EpsilonGreedy {
    /// Grid of [`DEFAULT_ARM_COUNT`] arms over `[min_param, max_param]`,
    /// ε = [`DEFAULT_EPSILON`], sample-mean steps, entropy-seeded RNG.
    pub fn new(min_param: f64, max_param: f64) -> Self {
        Self::with_options(
            min_param,
            max_param,
            DEFAULT_ARM_COUNT,
            DEFAULT_EPSILON,
            StepSize::SampleMean,
        )
    }

    pub fn with_options(
        min_param: f64,
        max_param: f64,
        num_arms: usize,
        epsilon: f64,
        step: StepSize,
    ) -> Self {
        Self::build(min_param, max_param, num_arms, epsilon, step, StdRng::from_entropy())
    }

    /// Like [`with_options`](Self::with_options) but with a fixed RNG
    /// seed, making the full arm sequence reproducible.
    pub fn seeded(
        min_param: f64,
        max_param: f64,
        num_arms: usize,
        epsilon: f64,
        step: StepSize,
        seed: u64,
    ) -> Self {
        Self::build(
            min_param,
            max_param,
            num_arms,
            epsilon,
            step,
            StdRng::seed_from_u64(seed),
        )
    }

    fn build(
        min_param: f64,
        max_param: f64,
        num_arms: usize,
        epsilon: f64,
        step: StepSize,
        rng: StdRng,
    ) -> Self {
        assert!((0.0..=1.0).contains(&epsilon), "epsilon must be in [0, 1]");
        EpsilonGreedy {
            arms: log_spaced_arms(min_param, max_param, num_arms),
            estimates: vec![0.0; num_arms],
            pulls: vec![0; num_arms],
            current_arm: 0,
            epsilon,
            step,
            rng,
        }
    }

    /// The candidate parameter values, strictly increasing.
    pub fn arms(&self) -> &[f64] {
        &self.arms
    }

    /// Index of the arm whose value the last call returned.
    pub fn current_arm(&self) -> usize {
        self.current_arm
    }

    /// Per-arm reward estimates.
    pub fn estimates(&self) -> &[f64] {
        &self.estimates
    }

    /// First occurrence wins, so equal estimates resolve deterministically.
    fn best_arm(&self) -> usize {
        let mut best = 0;
        for (i, &q) in self.estimates.iter().enumerate().skip(1) {
            if q > self.estimates[best] {
                best = i;
            }
        }
        best
    }
}

impl AdaptStrategy for EpsilonGreedy {
    fn disturb_param(&mut self, _param: f64) -> f64 {
        self.current_arm = self.rng.gen_range(0..self.arms.len());
        self.arms[self.current_arm]
    }

    fn adapt(&mut self, obj: f64, _last_obj: f64, _param: f64, _last_param: f64) -> f64 {
        let cur = self.current_arm;

        let step = match &self.step {
            StepSize::Constant(c) => *c,
            StepSize::SampleMean => {
                self.pulls[cur] += 1;
                1.0 / self.pulls[cur] as f64
            }
            StepSize::Custom(f) => {
                self.pulls[cur] += 1;
                f(self.pulls[cur])
            }
        };
        self.estimates[cur] += step * (obj - self.estimates[cur]);

        self.current_arm = if self.rng.gen::<f64>() < self.epsilon {
            self.rng.gen_range(0..self.arms.len())
        } else {
            self.best_arm()
        };

        self.arms[self.current_arm]
    }
}

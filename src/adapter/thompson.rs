use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Gamma};

use super::{log_spaced_arms, AdaptStrategy, DEFAULT_ARM_COUNT};

/// Rewards kept per arm.
pub const DEFAULT_WINDOW: usize = 500;
/// Rewards are stretched as `r^(1/scale)` before entering the posterior.
pub const DEFAULT_REWARD_SCALING: f64 = 5.0;

/// Recent rewards of one arm, oldest discarded once the window is full.
struct ArmHistory {
    rewards: VecDeque<f64>,
    window: usize,
}

impl ArmHistory {
    fn new(window: usize) -> Self {
        ArmHistory {
            rewards: VecDeque::with_capacity(window),
            window,
        }
    }

    fn add_reward(&mut self, reward: f64) {
        self.rewards.push_back(reward);
        if self.rewards.len() > self.window {
            self.rewards.pop_front();
        }
    }

    /// `1 + Σr` — successes under a Beta(1, 1) prior.
    fn beta_alpha(&self) -> f64 {
        1.0 + self.rewards.iter().sum::<f64>()
    }

    /// `1 + Σ(1 − r)` — failures under a Beta(1, 1) prior.
    fn beta_beta(&self) -> f64 {
        1.0 + self.rewards.iter().map(|r| 1.0 - r).sum::<f64>()
    }

    fn len(&self) -> usize {
        self.rewards.len()
    }
}

/// Thompson sampling over a log-spaced arm grid, with per-arm sliding
/// reward windows.
///
/// Each arm's recent rewards induce a Beta posterior; every call samples
/// one value from each posterior and plays the arm with the largest draw.
/// The sliding window keeps the posterior responsive when the workload's
/// reward landscape shifts.
///
/// Rewards are expected in `[0, 1]` (they are the Beta "success"
/// fraction); the stretch exponent is applied verbatim either way.
pub struct SlidingWindowThompson {
    arms: Vec<f64>,
    histories: Vec<ArmHistory>,
    reward_scaling: f64,
    current_arm: usize,
    rng: StdRng,
}

impl SlidingWindowThompson {
    /// Grid of [`DEFAULT_ARM_COUNT`] arms over `[min_param, max_param]`
    /// with default window and scaling, entropy-seeded RNG.
    pub fn new(min_param: f64, max_param: f64) -> Self {
        Self::with_options(
            min_param,
            max_param,
            DEFAULT_ARM_COUNT,
            DEFAULT_REWARD_SCALING,
            DEFAULT_WINDOW,
        )
    }

    pub fn with_options(
        min_param: f64,
        max_param: f64,
        num_arms: usize,
        reward_scaling: f64,
        window: usize,
    ) -> Self {
        Self::build(
            min_param,
            max_param,
            num_arms,
            reward_scaling,
            window,
            StdRng::from_entropy(),
        )
    }

    /// Like [`with_options`](Self::with_options) but with a fixed RNG
    /// seed.
    pub fn seeded(
        min_param: f64,
        max_param: f64,
        num_arms: usize,
        reward_scaling: f64,
        window: usize,
        seed: u64,
    ) -> Self {
        Self::build(
            min_param,
            max_param,
            num_arms,
            reward_scaling,
            window,
            StdRng::seed_from_u64(seed),
        )
    }

    fn build(
        min_param: f64,
        max_param: f64,
        num_arms: usize,
        reward_scaling: f64,
        window: usize,
        rng: StdRng,
    ) -> Self {
        assert!(window > 0, "window must hold at least one reward");
        assert!(reward_scaling > 0.0, "reward scaling must be positive");
        SlidingWindowThompson {
            arms: log_spaced_arms(min_param, max_param, num_arms),
            histories: (0..num_arms).map(|_| ArmHistory::new(window)).collect(),
            reward_scaling,
            current_arm: 0,
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

    /// Number of rewards currently recorded for `arm`.
    pub fn recorded_rewards(&self, arm: usize) -> usize {
        self.histories[arm].len()
    }

    /// One draw per arm; largest wins (first occurrence on the off chance
    /// of an exact tie).
    fn sample_thompson_arm(&mut self) -> usize {
        let mut best_arm = 0;
        let mut best_sample = -1.0;
        for i in 0..self.arms.len() {
            let alpha = self.histories[i].beta_alpha();
            let beta = self.histories[i].beta_beta();
            let sample = self.sample_beta(alpha, beta);
            if sample > best_sample {
                best_sample = sample;
                best_arm = i;
            }
        }
        best_arm
    }

    /// Beta(α, β) via two Gamma(·, 1) draws: `X / (X + Y)`.
    ///
    /// Returns 0.5 when the draw degenerates (`X + Y == 0`) or when the
    /// parameters are outside Gamma's domain (possible only with rewards
    /// outside `[0, 1]`).
    fn sample_beta(&mut self, alpha: f64, beta: f64) -> f64 {
        let (Ok(ga), Ok(gb)) = (Gamma::new(alpha, 1.0), Gamma::new(beta, 1.0)) else {
            return 0.5;
        };
        let x = ga.sample(&mut self.rng);
        let y = gb.sample(&mut self.rng);
        if x + y == 0.0 {
            return 0.5;
        }
        x / (x + y)
    }
}

impl AdaptStrategy for SlidingWindowThompson {
    fn disturb_param(&mut self, _param: f64) -> f64 {
        self.current_arm = self.rng.gen_range(0..self.arms.len());
        self.arms[self.current_arm]
    }

    fn adapt(&mut self, obj: f64, _last_obj: f64, _param: f64, _last_param: f64) -> f64 {
        // Stretch [0, 1] rewards toward 1 so small hit-rate differences
        // separate the posteriors.
        let reward = obj.powf(1.0 / self.reward_scaling);
        self.histories[self.current_arm].add_reward(reward);
        self.current_arm = self.sample_thompson_arm();
        self.arms[self.current_arm]
    }
}

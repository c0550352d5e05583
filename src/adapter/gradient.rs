use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::AdaptStrategy;

const DEFAULT_LEARNING_RATE: f64 = 0.01;
const DEFAULT_MAX_GRAD: f64 = 10.0;
/// Decay rate of the squared-gradient moving average.
const DEFAULT_RHO: f64 = 0.5;
const DEFAULT_EPSILON: f64 = 1e-8;
const DEFAULT_MIN_PARAM: f64 = 0.0;

/// Finite-difference gradient descent with an RMSprop-style adaptive
/// learning rate.
///
/// Unlike the bandit strategies this one moves the parameter continuously
/// instead of snapping to a grid: the gradient is estimated from the last
/// two `(objective, parameter)` pairs, clipped, and applied with a rate
/// damped by the running average of squared gradients.
pub struct GradientDescent {
    lr: f64,
    max_grad: f64,
    rho: f64,
    epsilon: f64,
    min_param: f64,
    /// Moving average of squared gradients.
    v: f64,
    rng: StdRng,
}

impl GradientDescent {
    pub fn new() -> Self {
        Self::with_options(
            DEFAULT_LEARNING_RATE,
            DEFAULT_MAX_GRAD,
            DEFAULT_RHO,
            DEFAULT_EPSILON,
            DEFAULT_MIN_PARAM,
        )
    }

    pub fn with_options(lr: f64, max_grad: f64, rho: f64, epsilon: f64, min_param: f64) -> Self {
        Self::build(lr, max_grad, rho, epsilon, min_param, StdRng::from_entropy())
    }

    /// Like [`with_options`](Self::with_options) but with a fixed RNG
    /// seed (the RNG only picks the sign of the initial perturbation).
    pub fn seeded(
        lr: f64,
        max_grad: f64,
        rho: f64,
        epsilon: f64,
        min_param: f64,
        seed: u64,
    ) -> Self {
        Self::build(lr, max_grad, rho, epsilon, min_param, StdRng::seed_from_u64(seed))
    }

    fn build(lr: f64, max_grad: f64, rho: f64, epsilon: f64, min_param: f64, rng: StdRng) -> Self {
        assert!(lr > 0.0, "learning rate must be positive");
        assert!((0.0..=1.0).contains(&rho), "rho must be in [0, 1]");
        GradientDescent {
            lr,
            max_grad,
            rho,
            epsilon,
            min_param,
            v: 0.0,
            rng,
        }
    }
}

impl Default for GradientDescent {
    fn default() -> Self {
        Self::new()
    }
}

impl AdaptStrategy for GradientDescent {
    fn disturb_param(&mut self, param: f64) -> f64 {
        // A tiny relative nudge in a random direction, so the next call
        // has a finite difference to work with.
        let sign = if self.rng.gen::<bool>() { 1.0 } else { -1.0 };
        param * (1.0 + sign * 1e-6)
    }

    fn adapt(&mut self, obj: f64, last_obj: f64, param: f64, last_param: f64) -> f64 {
        const EPS: f64 = 1e-6;

        let grad = ((obj - last_obj) / ((param - last_param) + EPS))
            .clamp(-self.max_grad, self.max_grad);

        self.v = self.rho * self.v + (1.0 - self.rho) * grad * grad;

        let adaptive_lr = self.lr / (self.v.sqrt() + self.epsilon);
        (param - adaptive_lr * grad).max(self.min_param)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::Adapter;

    #[test]
    fn first_call_barely_perturbs() {
        let mut a = Adapter::new(GradientDescent::seeded(0.01, 10.0, 0.5, 1e-8, 0.0, 1));
        let p = a.tune(0.0, 100.0);
        assert!((p - 100.0).abs() <= 100.0 * 1e-6 + f64::EPSILON);
        assert_ne!(p, 100.0);
    }

    #[test]
    fn steps_along_the_negative_gradient() {
        let mut a = Adapter::new(GradientDescent::seeded(0.01, 10.0, 0.5, 1e-8, 0.0, 1));
        a.tune(0.5, 1.0);
        // Objective rose with the parameter → positive gradient → descent
        // moves the parameter down.
        let p = a.tune(0.9, 2.0);
        assert!(p < 2.0, "expected a downhill step, got {p}");

        let mut b = Adapter::new(GradientDescent::seeded(0.01, 10.0, 0.5, 1e-8, 0.0, 1));
        b.tune(0.9, 1.0);
        // Objective fell as the parameter rose → negative gradient → up.
        let q = b.tune(0.5, 2.0);
        assert!(q > 2.0, "expected an uphill step, got {q}");
    }

    #[test]
    fn result_never_drops_below_min_param() {
        let mut a = Adapter::new(GradientDescent::seeded(10.0, 10.0, 0.5, 1e-8, 0.5, 1));
        a.tune(0.0, 1.0);
        let mut p = 1.0;
        for i in 0..50 {
            // Strongly falling objective drives the parameter hard downhill.
            p = a.tune(1.0 / (i + 2) as f64, p);
            assert!(p >= 0.5, "parameter {p} fell below the floor");
        }
    }

    #[test]
    fn gradient_is_clipped() {
        // A huge objective jump over a tiny parameter change would explode
        // without clipping; the step must stay bounded by lr·√(1/(1−ρ))·…
        let mut a = Adapter::new(GradientDescent::seeded(0.01, 10.0, 0.5, 1e-8, 0.0, 1));
        a.tune(0.0, 1.0);
        let p = a.tune(1e9, 1.0 + 1e-9);
        assert!(p.is_finite());
        assert!((p - 1.0).abs() < 1.0, "step too large: {p}");
    }
}

/// Divisor applied to `α·t` inside the exponential.
///
/// Keeps the growth factor in a numerically comfortable range: with
/// `α = 1` the increment doubles roughly every 6 900 updates.
pub const DECAY_SCALE: f64 = 10_000.0;

/// The growth curve a sketch weights its increments with.
///
/// `eval` must be monotone non-decreasing in `t` for positive `alpha` and
/// equal `1.0` at `t = 0` (no decay at the very start).  The sketch treats
/// the function opaquely — it uses the same curve for the per-update
/// increment, the estimate normalizer, and the prune rescale factor, so
/// any implementation satisfying the monotonicity contract preserves
/// relative counter order.
///
/// This is a generic bound rather than a boxed closure: `eval` sits in the
/// update hot loop and must inline.
pub trait DecayFn {
    fn eval(&self, t: u32, alpha: f64) -> f32;
}

/// The standard curve: `exp(α · t / 10000)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExpDecay;

impl DecayFn for ExpDecay {
    #[inline]
    fn eval(&self, t: u32, alpha: f64) -> f32 {
        (alpha * t as f64 / DECAY_SCALE).exp() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_at_time_zero() {
        assert_eq!(ExpDecay.eval(0, 1.0), 1.0);
        assert_eq!(ExpDecay.eval(0, 123.4), 1.0);
    }

    #[test]
    fn monotone_in_t() {
        let mut prev = 0.0f32;
        for t in 0..1_000 {
            let v = ExpDecay.eval(t, 1.0);
            assert!(v >= prev, "f({t}) = {v} < f({}) = {prev}", t - 1);
            prev = v;
        }
    }

    #[test]
    fn alpha_scales_growth() {
        // Larger α grows strictly faster at the same t.
        assert!(ExpDecay.eval(5_000, 2.0) > ExpDecay.eval(5_000, 1.0));
    }

    #[test]
    fn matches_closed_form() {
        let v = ExpDecay.eval(10_000, 1.0);
        assert!((v as f64 - std::f64::consts::E).abs() < 1e-3, "got {v}");
    }
}

use std::cell::Cell;
use std::time::Instant;

/// Counters updated on every sketch operation.
///
/// `Cell`-based rather than atomic: the sketch is single-threaded by
/// contract, but `estimate` takes `&self` and still has to record its own
/// timing.
#[derive(Default)]
pub struct OpStats {
    update_count: Cell<u64>,
    update_secs: Cell<f64>,
    estimate_count: Cell<u64>,
    estimate_secs: Cell<f64>,
    prunes: Cell<u64>,
}

impl OpStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_update(&self, start: Instant) {
        self.update_count.set(self.update_count.get() + 1);
        self.update_secs
            .set(self.update_secs.get() + start.elapsed().as_secs_f64());
    }

    #[inline]
    pub fn record_estimate(&self, start: Instant) {
        self.estimate_count.set(self.estimate_count.get() + 1);
        self.estimate_secs
            .set(self.estimate_secs.get() + start.elapsed().as_secs_f64());
    }

    #[inline]
    pub fn record_prune(&self) {
        self.prunes.set(self.prunes.get() + 1);
    }

    /// Returns a point-in-time snapshot of the statistics.
    pub fn snapshot(&self) -> Telemetry {
        let update_count = self.update_count.get();
        let estimate_count = self.estimate_count.get();
        let avg = |total: f64, n: u64| if n == 0 { 0.0 } else { total / n as f64 };
        Telemetry {
            update_count,
            estimate_count,
            update_time_avg_secs: avg(self.update_secs.get(), update_count),
            estimate_time_avg_secs: avg(self.estimate_secs.get(), estimate_count),
            prunes: self.prunes.get(),
        }
    }
}

/// A point-in-time snapshot of sketch telemetry.
#[derive(Debug, Clone, PartialEq)]
pub struct Telemetry {
    /// Number of completed `update` calls.
    pub update_count: u64,
    /// Number of `estimate` calls.
    pub estimate_count: u64,
    /// Mean wall time of an `update` call, in seconds.
    pub update_time_avg_secs: f64,
    /// Mean wall time of an `estimate` call, in seconds.
    pub estimate_time_avg_secs: f64,
    /// Number of prunes (overflow-triggered, interval-triggered, and the
    /// one performed at the start of every adapt tick).
    pub prunes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_are_zero_before_any_op() {
        let t = OpStats::new().snapshot();
        assert_eq!(t.update_count, 0);
        assert_eq!(t.update_time_avg_secs, 0.0);
        assert_eq!(t.estimate_time_avg_secs, 0.0);
    }

    #[test]
    fn counts_accumulate() {
        let stats = OpStats::new();
        for _ in 0..3 {
            stats.record_update(Instant::now());
        }
        stats.record_estimate(Instant::now());
        stats.record_prune();
        let t = stats.snapshot();
        assert_eq!(t.update_count, 3);
        assert_eq!(t.estimate_count, 1);
        assert_eq!(t.prunes, 1);
        assert!(t.update_time_avg_secs >= 0.0);
    }
}

//! Online parameter adapters.
//!
//! An adapter is asked, once every adapt interval, "given this reward and
//! the current decay parameter, what should the parameter be next?".
//! [`Adapter`] is the generic skeleton that owns the first-call dispatch,
//! the previous `(objective, parameter)` pair, and history recording,
//! while an [`AdaptStrategy`] supplies the actual decision rule.

mod epsilon_greedy;
mod gradient;
mod thompson;

pub use epsilon_greedy::{EpsilonGreedy, StepSize, DEFAULT_ARM_COUNT, DEFAULT_EPSILON};
pub use gradient::GradientDescent;
pub use thompson::{SlidingWindowThompson, DEFAULT_REWARD_SCALING, DEFAULT_WINDOW};

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// The decision rule an [`Adapter`] drives.
///
/// `disturb_param` handles the very first call, when no previous objective
/// exists yet: the strategy emits an initial exploratory value.  Every
/// later call goes through `adapt`, which sees both the current and the
/// previous `(objective, parameter)` pair.
pub trait AdaptStrategy {
    fn disturb_param(&mut self, param: f64) -> f64;

    fn adapt(&mut self, obj: f64, last_obj: f64, param: f64, last_param: f64) -> f64;
}

/// Object-safe facade the sketch holds.
///
/// Erasure lives only here, on the cold path — one call per adapt
/// interval.  The strategy itself stays a concrete type inside
/// [`Adapter`].
pub trait ParamTuner {
    /// Returns the parameter to use for the next interval.
    fn tune(&mut self, objective: f64, param: f64) -> f64;
}

/// Generic adapter skeleton: first-call dispatch, previous-call memory,
/// and optional history recording around an [`AdaptStrategy`].
pub struct Adapter<S> {
    strategy: S,
    last_obj: f64,
    last_param: f64,
    first_update: bool,
    recording: bool,
    history: Vec<(f64, f64)>,
}

/// ε-greedy bandit adapter.
pub type EpsilonGreedyAdapter = Adapter<EpsilonGreedy>;
/// Sliding-window Thompson-sampling bandit adapter.
pub type ThompsonAdapter = Adapter<SlidingWindowThompson>;
/// RMSprop gradient-descent adapter.
pub type GradientAdapter = Adapter<GradientDescent>;

impl<S: AdaptStrategy> Adapter<S> {
    pub fn new(strategy: S) -> Self {
        Adapter {
            strategy,
            last_obj: 0.0,
            last_param: 0.0,
            first_update: true,
            recording: false,
            history: Vec::new(),
        }
    }

    /// Feeds one `(objective, parameter)` observation to the strategy and
    /// returns the parameter for the next interval.
    pub fn tune(&mut self, objective: f64, param: f64) -> f64 {
        let new_param = if self.first_update {
            self.first_update = false;
            self.strategy.disturb_param(param)
        } else {
            self.strategy
                .adapt(objective, self.last_obj, param, self.last_param)
        };

        if self.recording {
            self.history.push((objective, new_param));
        }

        self.last_obj = objective;
        self.last_param = param;

        new_param
    }

    /// The wrapped decision rule (for introspection: arm grids, pull
    /// counts, ...).
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    // -----------------------------------------------------------------------
    // History recording
    // -----------------------------------------------------------------------

    /// Recorded `(objective, returned_parameter)` pairs, oldest first.
    pub fn history(&self) -> &[(f64, f64)] {
        &self.history
    }

    /// Starts recording.  Any previously recorded history is discarded.
    pub fn start_recording_history(&mut self) {
        self.recording = true;
        self.history.clear();
    }

    pub fn stop_recording_history(&mut self) {
        self.recording = false;
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Serializes the history as CSV (`objective,parameter` header, one
    /// numeric row per recorded call), creating parent directories as
    /// needed.
    pub fn save_history(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = BufWriter::new(File::create(path)?);
        writeln!(file, "objective,parameter")?;
        for (obj, param) in &self.history {
            writeln!(file, "{obj},{param}")?;
        }
        file.flush()
    }
}

impl<S: AdaptStrategy> ParamTuner for Adapter<S> {
    fn tune(&mut self, objective: f64, param: f64) -> f64 {
        Adapter::tune(self, objective, param)
    }
}

/// `n` candidate parameter values spaced log-uniformly over `[min, max]`.
///
/// Log spacing, not linear: the decay parameter acts multiplicatively, so
/// equal *ratios* between neighboring arms matter, not equal differences.
/// The result is strictly increasing.
pub fn log_spaced_arms(min: f64, max: f64, n: usize) -> Vec<f64> {
    assert!(n >= 2, "arm grid needs at least two arms");
    assert!(
        min > 0.0 && max > min,
        "arm range must satisfy 0 < min < max"
    );

    let log_min = min.ln();
    let log_max = max.ln();
    (0..n)
        .map(|i| (log_min + (log_max - log_min) * i as f64 / (n - 1) as f64).exp())
        .collect()
}

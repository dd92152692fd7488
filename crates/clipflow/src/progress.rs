//! Aggregate progress and ETA for a job.
//!
//! Pure arithmetic over simulated time units; the scheduler calls [`compute`]
//! after every tick.

/// Overall percentage and remaining-time estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Integer percentage in `[0, 100]`.
    pub percent: u8,
    /// Rounded remaining time units, never negative.
    pub eta_seconds: u64,
}

impl Progress {
    pub const DONE: Progress = Progress {
        percent: 100,
        eta_seconds: 0,
    };
}

/// Maps elapsed time against the total budget.
///
/// `percent = clamp(round(elapsed / total * 100), 0, 100)` and
/// `eta = max(round(total - elapsed), 0)`. A non-positive or non-finite total
/// is treated as already finished.
pub fn compute(elapsed: f64, total_duration: f64) -> Progress {
    if !total_duration.is_finite() || total_duration <= 0.0 {
        return Progress::DONE;
    }

    let elapsed = if elapsed.is_finite() { elapsed } else { 0.0 };
    let percent = (elapsed / total_duration * 100.0).round().clamp(0.0, 100.0) as u8;
    let eta_seconds = (total_duration - elapsed).round().max(0.0) as u64;

    Progress {
        percent,
        eta_seconds,
    }
}

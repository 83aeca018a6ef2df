use std::sync::atomic::{AtomicU64, Ordering};

/// Knobs the worker reads on every cycle.
///
/// Both values are `f64`s stored as bit patterns, so they can be changed from
/// any task while the worker runs. The two fields are independent; no update
/// ever needs to see both at once.
#[derive(Debug)]
pub struct WorkerSettings {
    events_per_minute: AtomicU64,
    fail_probability: AtomicU64,
}

impl WorkerSettings {
    pub fn new(events_per_minute: f64, fail_probability: f64) -> Self {
        Self {
            events_per_minute: AtomicU64::new(clamp_rate(events_per_minute).to_bits()),
            fail_probability: AtomicU64::new(clamp_probability(fail_probability).to_bits()),
        }
    }

    /// Mean number of transitions per minute. Zero pauses the worker.
    pub fn events_per_minute(&self) -> f64 {
        f64::from_bits(self.events_per_minute.load(Ordering::Relaxed))
    }

    /// Negative, NaN and infinite rates are stored as zero.
    pub fn set_events_per_minute(&self, rate: f64) {
        self.events_per_minute
            .store(clamp_rate(rate).to_bits(), Ordering::Relaxed);
    }

    /// Probability that an in-transit delivery fails instead of arriving.
    pub fn fail_probability(&self) -> f64 {
        f64::from_bits(self.fail_probability.load(Ordering::Relaxed))
    }

    /// Clamped into `[0, 1]`; NaN is stored as zero.
    pub fn set_fail_probability(&self, probability: f64) {
        self.fail_probability
            .store(clamp_probability(probability).to_bits(), Ordering::Relaxed);
    }
}

fn clamp_rate(rate: f64) -> f64 {
    if !rate.is_finite() || rate < 0.0 {
        0.0
    } else {
        rate
    }
}

fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

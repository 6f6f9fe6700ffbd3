//! Sensor drift: bounded pseudorandom walk of a temperature reading.
//!
//! Each read of a sensor perturbs its stored value by a delta drawn from
//! `[-DRIFT_STEP, DRIFT_STEP]` tenths and clamps the result to
//! `[MIN_READING, MAX_READING]`. The delta comes from the caller so the walk
//! is reproducible in tests.

use crate::state::{SensorValue, Tenths};

/// Largest change, in tenths, a single read may apply.
pub const DRIFT_STEP: i32 = 2;

/// Lower bound of the simulated domain (10.0°).
pub const MIN_READING: Tenths = Tenths::new(100);

/// Upper bound of the simulated domain (35.0°).
pub const MAX_READING: Tenths = Tenths::new(350);

/// Value assumed when the stored text cannot be parsed (20.0°).
pub const FALLBACK_READING: Tenths = Tenths::new(200);

/// Result of one drift step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drift {
    /// Parsed stored value, `None` when the fallback was used.
    pub previous: Option<Tenths>,
    /// New clamped value.
    pub next: Tenths,
}

impl Drift {
    /// Whether the stored text was unparsable and reset to [`FALLBACK_READING`].
    #[must_use]
    pub fn recovered(&self) -> bool {
        self.previous.is_none()
    }

    /// The new value in its stored form.
    #[must_use]
    pub fn value(&self) -> SensorValue {
        SensorValue::from_tenths(self.next)
    }
}

/// Apply one drift step to a stored reading.
///
/// A `delta` outside `[-DRIFT_STEP, DRIFT_STEP]` is clamped to it.
#[must_use]
pub fn drift(current: &SensorValue, delta: i32) -> Drift {
    let previous = current.tenths();
    let base = previous.unwrap_or(FALLBACK_READING).get();
    let delta = delta.clamp(-DRIFT_STEP, DRIFT_STEP);
    let next = base
        .saturating_add(delta)
        .clamp(MIN_READING.get(), MAX_READING.get());
    Drift {
        previous,
        next: Tenths::new(next),
    }
}

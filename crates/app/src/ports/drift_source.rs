//! Drift source port: entropy for the sensor drift simulator.

use std::sync::Arc;

/// Supplies the per-read delta applied to sensor readings.
///
/// Implementations should draw uniformly from
/// `[-DRIFT_STEP, DRIFT_STEP]` (see [`smarthome_domain::drift`]). No seed
/// reproducibility is required of production sources; tests inject scripted
/// ones.
pub trait DriftSource: Send + Sync {
    /// Draw the next delta, in tenths of a degree.
    fn next_delta(&self) -> i32;
}

impl<T: DriftSource + ?Sized> DriftSource for Arc<T> {
    fn next_delta(&self) -> i32 {
        (**self).next_delta()
    }
}

//! # smarthome-adapter-rand
//!
//! Production [`DriftSource`] drawing sensor drift from the thread-local RNG.
//!
//! ## Dependency rule
//!
//! Depends on `smarthome-app` (port traits) and `smarthome-domain` only.

use rand::Rng;

use smarthome_app::ports::DriftSource;
use smarthome_domain::drift::DRIFT_STEP;

/// Uniform drift over `[-DRIFT_STEP, DRIFT_STEP]` from opaque entropy.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandDrift;

impl DriftSource for RandDrift {
    fn next_delta(&self) -> i32 {
        rand::rng().random_range(-DRIFT_STEP..=DRIFT_STEP)
    }
}

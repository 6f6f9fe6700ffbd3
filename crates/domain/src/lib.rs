//! # smarthome-domain
//!
//! Pure domain model for the smarthome device simulator.
//!
//! ## Responsibilities
//! - Define **device kinds** (light, socket, temperature sensor) and their capabilities
//! - Define **device state** as a tagged value (switch or sensor reading)
//! - Encode state to its short text form and decode write commands
//! - Simulate sensor drift with exact clamping rules
//! - Declare the static device **catalog**
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! Randomness and locking are provided by the `app` crate.

pub mod error;

pub mod catalog;
pub mod codec;
pub mod drift;
pub mod kind;
pub mod state;

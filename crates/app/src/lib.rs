//! # smarthome-app
//!
//! Application layer: the device registry, the dispatch layer and the
//! **port definitions** (traits) adapters implement.
//!
//! ## Responsibilities
//! - Build the fixed [`registry::Registry`] from the domain catalog
//! - Serialize every state access behind one lock per device
//! - Implement `open` / `read` / `write` / `close` in [`dispatch::Dispatcher`]
//! - Make lock waits cancellable through [`interrupt::Interrupt`]
//! - Define the [`ports::DriftSource`] port for sensor randomness
//!
//! ## Dependency rule
//! Depends on `smarthome-domain` only (plus `tokio::sync` for locks).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod dispatch;
pub mod error;
pub mod interrupt;
pub mod ports;
pub mod registry;

//! # Control library.
//!
//! This library allows other crates in the workspace (and the benchmarks) to access items defined
//! inside the control crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Global data store for the executable
pub mod data_store;

/// MPC preprocessing - builds the reference horizon and obstacle list for the optimiser
pub mod mpc_prep;

/// Executable parameters
pub mod params;

/// Scenario replay - recorded inputs for the control loop
pub mod scenario;

/// Marker server - publishes visualisation markers over the network
#[cfg(feature = "viz")]
pub mod viz_server;

//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the software.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Message definitions for perception and localisation equipment (poses, paths, obstacle tracks
/// and point clouds)
pub mod eqpt;

/// Network module
pub mod net;

/// Visualisation marker messages
pub mod viz;

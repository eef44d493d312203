//! # Equipment Interface
//!
//! This module defines the interface structures which are exchanged with the perception and
//! localisation equipment.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod perloc;

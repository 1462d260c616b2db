//! Command implementations.

pub mod spoof;

//! Testing utilities and mock implementations
//!
//! Mocks for the broker transport and GPIO writer so the daemon runs without
//! a broker or hardware.

pub mod mocks;

pub use mocks::*;

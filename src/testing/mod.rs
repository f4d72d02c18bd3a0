//! Testing utilities and mock implementations
//!
//! This module provides the mock channel adapter and manual clock used to
//! exercise subscription management without a realtime backend or wall-clock
//! sleeps.

pub mod mocks;

pub use mocks::*;

//! Test support utilities for channel chains
//!
//! Builds sessions whose named delegates resolve through an in-memory
//! directory, and listeners that record what they observe.

// Each test binary uses a different subset.
#![allow(dead_code, unused_imports)]

pub mod harness;
pub mod listener;

pub use harness::DispatchHarness;
pub use listener::RecordingListener;

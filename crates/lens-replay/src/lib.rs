//! Lens Replay
//!
//! Replays scripted focus, keyboard, and DOM mutation scenarios through the
//! synchronization engine against the local inspection provider, recording
//! every presenter call. Lets the engine be exercised end to end without a
//! browser.

pub mod runner;
pub mod scenario;

pub use runner::{run, Replay, ReplayEvent};
pub use scenario::{Scenario, Step};

//! Core timeline primitives

pub mod time;

pub use time::{ClockAdvance, ClockError, ClockState, PlaybackMode, SimClock, TimerLease};

//! Deterministic random numbers for sample data
//!
//! Only seeded population generation draws random numbers. The playback
//! itself is fully deterministic and never touches this module.

mod xorshift;

pub use xorshift::SampleRng;

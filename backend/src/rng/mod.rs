//! Deterministic random number generation
//!
//! Uses xorshift64* algorithm for fast, deterministic random number generation.
//! CRITICAL: All applicant sampling MUST draw from this module so that a logged
//! seed replays the identical applicant stream.

mod xorshift;

pub use xorshift::RngManager;

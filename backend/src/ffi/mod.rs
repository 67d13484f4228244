//! FFI (Foreign Function Interface) module
//!
//! PyO3 bindings exposing the lending environment to a Python episode loop.
//!
//! # Design Principles
//!
//! 1. **Minimal boundary**: reset, step, and read-only state queries
//! 2. **Simple types**: primitives, lists and dicts at the boundary
//! 3. **Safe errors**: every Rust error becomes a Python exception
//! 4. **No references**: Python gets copies, never references to Rust state

pub mod env;
pub mod types;

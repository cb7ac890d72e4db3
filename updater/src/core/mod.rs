//! Deterministic, pure logic shared by the updater.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests.

pub mod branch;
pub mod outcome;
pub mod types;

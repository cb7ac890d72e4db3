//! Fetch, merge and rebuild a working copy from a chosen remote branch.
//!
//! The crate keeps a strict separation:
//!
//! - **[`core`]**: Pure logic (branch rules, outcome reporting, shared types).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting adapters (child processes, git, the build
//!   toolchain, config, run-lock). Each sits behind a trait so tests can swap
//!   in scripted runners.
//!
//! [`orchestrator`] holds the fetch → pull → abort/build state machine and
//! [`update`] wires it to real adapters for the CLI.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod orchestrator;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod update;

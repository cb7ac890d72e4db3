//! I/O adapters for updater commands.

pub mod branches;
pub mod build;
pub mod config;
pub mod console;
pub mod git;
pub mod lock;
pub mod process;

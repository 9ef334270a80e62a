//! CLI command implementations
//!
//! Each submodule implements a specific CLI command.

pub mod aggregate;
pub mod check;

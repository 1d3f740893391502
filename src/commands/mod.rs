//! CLI command implementations.

pub mod filter;
pub mod run;

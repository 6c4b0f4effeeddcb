//! kg - Monorepo developer-tool runner
//!
//! Discovers plugin commands declared by installed packages and runs them
//! against the member packages of a workspace.

pub mod cli;
pub mod commands;

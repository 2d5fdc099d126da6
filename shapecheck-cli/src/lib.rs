// Re-export the report module for use in integration tests
pub mod report;

// Re-export CLI types and functions for testing
pub mod cli;
pub use cli::{Cli, Commands, run_with_cli};

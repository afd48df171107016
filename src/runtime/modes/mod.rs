//! Execution modes
//!
//! - `server`: HTTP server (default)
//! - `cli`: one-shot operator commands

pub mod cli;
pub mod server;

pub use cli::run_cli;
pub use server::run_server;

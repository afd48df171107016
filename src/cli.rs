//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

/// studiopass - class booking backend for yoga studios
#[derive(Parser, Debug)]
#[command(name = "studiopass")]
#[command(version)]
#[command(about = "Credit-based class booking backend for yoga studios", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(long, short = 'c', global = true, default_value = "config.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Import a weekly schedule from a CSV file
    ImportSchedule {
        /// CSV file path
        csv: String,

        /// Recorded as the uploader of this import
        #[arg(long, default_value = "cli")]
        uploaded_by: String,
    },

    /// Generate example configuration file
    GenerateConfig {
        /// Output path (default: config.example.toml)
        path: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Sign a user token for local testing
    IssueToken {
        /// User id (UUID)
        #[arg(long)]
        user: String,

        #[arg(long)]
        email: Option<String>,
    },
}

impl Cli {
    /// 未指定子命令时启动服务器
    pub fn command_or_default(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve)
    }
}

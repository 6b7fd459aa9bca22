//! Command-line interface

pub mod config;
pub mod launch;
pub mod query;
pub mod token;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use streamexec::Config;

/// Process exit codes
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const UNEXPECTED_FAILURE: i32 = 1;
    pub const AUTH_REQUIRED: i32 = 2;
    pub const PARSE_ERROR: i32 = 3;
    pub const TRANSPORT_FAILURE: i32 = 4;
    pub const SERVER_REJECTED: i32 = 5;
    pub const NOT_FOUND: i32 = 6;
}

#[derive(Debug, Parser)]
#[command(name = "streamexec", version, about = "Run commands on remote hosts and follow their output")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "STREAMEXEC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Server base URL, overrides the config file
    #[arg(long, global = true, env = "STREAMEXEC_BASE_URL")]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Config file with command-line overrides applied
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let path = match &self.config {
            Some(path) => path.clone(),
            None => Config::default_path()?,
        };
        let mut config = Config::load(&path)?;

        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        config.validate()?;

        Ok(config)
    }

    /// Secret passed on the command line, if any
    pub fn secret(&self) -> Option<&str> {
        match &self.command {
            Commands::Token(token::TokenArgs {
                action: token::TokenAction::Set { token: Some(token) },
            }) => Some(token.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Launch a command on a target host
    Launch(launch::LaunchArgs),

    /// Launch the predefined long-running task on a target host
    LongTask(launch::LongTaskArgs),

    /// Show the status of an execution
    Status(query::StatusArgs),

    /// Print the final output of an execution
    Output(query::OutputArgs),

    /// Manage the stored bearer token
    Token(token::TokenArgs),

    /// Inspect configuration
    Config(config::ConfigArgs),
}

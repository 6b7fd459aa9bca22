//! streamexec - run commands on remote hosts and follow their output
//!
//! - `streamexec launch <command> <host> [params]...` triggers an execution
//!   and prints the page to follow (streaming view or `/output/<id>`)
//! - `streamexec long-task <host>` does the same for the predefined task
//! - `streamexec status|output <id>` query a submitted execution

mod cli;
mod logging;

use clap::Parser;
use cli::{exit_codes, Cli, Commands};
use streamexec::{Config, ConfigError, LaunchError};

/// Redact the parsed secret wherever it appears in the raw arguments
fn redact_sensitive_args(args: &[String], secret: Option<&str>) -> Vec<String> {
    args.iter()
        .map(|arg| match secret {
            Some(secret) if !secret.is_empty() && arg.contains(secret) => {
                arg.replace(secret, "[REDACTED]")
            }
            _ => arg.clone(),
        })
        .collect()
}

fn main() {
    let exit_code = run();
    std::process::exit(exit_code);
}

fn run() -> i32 {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose, cli.json_output) {
        eprintln!("Failed to initialize logging: {}", e);
        return exit_codes::UNEXPECTED_FAILURE;
    }

    let args: Vec<String> = std::env::args().collect();
    tracing::debug!("Args: {:?}", redact_sensitive_args(&args, cli.secret()));

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return categorize_error(&e);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create runtime: {}", e);
            return exit_codes::UNEXPECTED_FAILURE;
        }
    };

    match rt.block_on(dispatch(cli.command, &config)) {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            categorize_error(&e)
        }
    }
}

async fn dispatch(command: Commands, config: &Config) -> anyhow::Result<()> {
    match command {
        Commands::Launch(args) => cli::launch::run(args, config).await,
        Commands::LongTask(args) => cli::launch::run_long_task(args, config).await,
        Commands::Status(args) => cli::query::run_status(args, config).await,
        Commands::Output(args) => cli::query::run_output(args, config).await,
        Commands::Token(args) => cli::token::run(args, config).await,
        Commands::Config(args) => cli::config::run(args, config).await,
    }
}

/// Categorize an error into the appropriate exit code
fn categorize_error(e: &anyhow::Error) -> i32 {
    if let Some(launch) = e.downcast_ref::<LaunchError>() {
        return match launch {
            LaunchError::MissingToken => exit_codes::AUTH_REQUIRED,
            LaunchError::Status { status: 401 | 403, .. } => exit_codes::AUTH_REQUIRED,
            LaunchError::Status { .. } => exit_codes::SERVER_REJECTED,
            LaunchError::Transport(_) => exit_codes::TRANSPORT_FAILURE,
            LaunchError::Parse(_) => exit_codes::PARSE_ERROR,
            LaunchError::NotFound(_) => exit_codes::NOT_FOUND,
            LaunchError::TokenStore(_) => exit_codes::UNEXPECTED_FAILURE,
        };
    }

    if let Some(ConfigError::Parse { .. }) = e.downcast_ref::<ConfigError>() {
        return exit_codes::PARSE_ERROR;
    }

    exit_codes::UNEXPECTED_FAILURE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn redacted(list: &[&str]) -> Vec<String> {
        let cli = Cli::try_parse_from(list).unwrap();
        redact_sensitive_args(&args(list), cli.secret())
    }

    #[test]
    fn test_redact_token_set() {
        assert_eq!(
            redacted(&["streamexec", "token", "set", "abc123"]),
            args(&["streamexec", "token", "set", "[REDACTED]"])
        );
    }

    #[test]
    fn test_redact_token_set_with_interleaved_flags() {
        assert_eq!(
            redacted(&["streamexec", "token", "--verbose", "set", "s3cret"]),
            args(&["streamexec", "token", "--verbose", "set", "[REDACTED]"])
        );
        assert_eq!(
            redacted(&["streamexec", "--json-output", "token", "set", "-v", "--", "s3cret"]),
            args(&["streamexec", "--json-output", "token", "set", "-v", "--", "[REDACTED]"])
        );
    }

    #[test]
    fn test_launch_args_untouched() {
        let list = ["streamexec", "launch", "set", "host", "token"];
        assert_eq!(redacted(&list), args(&list));
    }

    #[test]
    fn test_categorize_launch_errors() {
        let missing = anyhow::Error::new(LaunchError::MissingToken);
        assert_eq!(categorize_error(&missing), exit_codes::AUTH_REQUIRED);

        let rejected = anyhow::Error::new(LaunchError::status(500, "Internal Server Error", None));
        assert_eq!(categorize_error(&rejected), exit_codes::SERVER_REJECTED);

        let unauthorized = anyhow::Error::new(LaunchError::status(401, "Unauthorized", None));
        assert_eq!(categorize_error(&unauthorized), exit_codes::AUTH_REQUIRED);

        let offline = anyhow::Error::new(LaunchError::Transport("offline".to_string()));
        assert_eq!(categorize_error(&offline), exit_codes::TRANSPORT_FAILURE);

        let other = anyhow::anyhow!("something else");
        assert_eq!(categorize_error(&other), exit_codes::UNEXPECTED_FAILURE);
    }
}

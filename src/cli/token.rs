//! `token` command
//!
//! Stands in for the login/logout flow that normally owns the token.

use std::io::BufRead;

use clap::{Args, Subcommand};
use streamexec::Config;

#[derive(Debug, Args)]
pub struct TokenArgs {
    #[command(subcommand)]
    pub action: TokenAction,
}

#[derive(Debug, Subcommand)]
pub enum TokenAction {
    /// Store a token; read from stdin when omitted
    Set {
        token: Option<String>,
    },
    /// Remove the stored token
    Clear,
    /// Report whether a token is present
    Status,
}

pub async fn run(args: TokenArgs, config: &Config) -> anyhow::Result<()> {
    let store = config.token_store()?;

    match args.action {
        TokenAction::Set { token } => {
            let token = match token {
                Some(token) => token,
                None => read_stdin_line()?,
            };
            let token = token.trim();
            if token.is_empty() {
                anyhow::bail!("Refusing to store an empty token");
            }
            store.set(token)?;
            tracing::info!("Token stored in {}", store.backend_name());
        }
        TokenAction::Clear => {
            store.clear()?;
            tracing::info!("Token cleared from {}", store.backend_name());
        }
        TokenAction::Status => {
            let state = if store.get()?.is_some() { "present" } else { "absent" };
            println!("Token: {} ({})", state, store.backend_name());
        }
    }

    Ok(())
}

fn read_stdin_line() -> anyhow::Result<String> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}

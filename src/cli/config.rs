//! `config` command

use clap::{Args, Subcommand};
use streamexec::Config;

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the default config file location
    Path,
}

pub async fn run(args: ConfigArgs, config: &Config) -> anyhow::Result<()> {
    match args.action {
        ConfigAction::Show => print!("{}", config.to_toml()?),
        ConfigAction::Path => println!("{}", Config::default_path()?.display()),
    }
    Ok(())
}

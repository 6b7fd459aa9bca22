//! `launch` and `long-task` commands

use anyhow::Context;
use clap::Args;
use streamexec::{Config, LaunchTarget};

#[derive(Debug, Args)]
pub struct LaunchArgs {
    /// Open the resulting page in the browser
    #[arg(long)]
    pub open: bool,

    /// Predefined command name, e.g. `backup.sh`
    pub command: String,

    /// Target host name
    pub host: String,

    /// Command parameters, passed through in order
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub params: Vec<String>,
}

#[derive(Debug, Args)]
pub struct LongTaskArgs {
    /// Open the resulting page in the browser
    #[arg(long)]
    pub open: bool,

    /// Target host name
    pub host: String,
}

pub async fn run(args: LaunchArgs, config: &Config) -> anyhow::Result<()> {
    let launcher = config.launcher()?;
    let target = launcher.launch(&args.command, &args.host, args.params).await?;
    follow(&target, config, args.open)
}

pub async fn run_long_task(args: LongTaskArgs, config: &Config) -> anyhow::Result<()> {
    let launcher = config.launcher()?;
    let target = launcher.launch_predefined_task(&args.host).await?;
    follow(&target, config, args.open)
}

/// Print the target URL and optionally hand it to the system browser
fn follow(target: &LaunchTarget, config: &Config, open: bool) -> anyhow::Result<()> {
    let url = target
        .resolve(&config.base_url()?)
        .with_context(|| format!("Invalid target path {}", target.path()))?;

    if open {
        open::that(url.as_str()).with_context(|| format!("Failed to open {}", url))?;
        tracing::info!("Opened {}", url);
    }

    println!("{}", url);
    Ok(())
}

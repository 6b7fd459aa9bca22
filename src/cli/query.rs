//! `status` and `output` commands

use clap::Args;
use streamexec::{Config, ExecutionStatus};

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Execution id returned by `launch`
    pub execution_id: String,
}

#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Execution id returned by `launch`
    pub execution_id: String,
}

pub async fn run_status(args: StatusArgs, config: &Config) -> anyhow::Result<()> {
    let launcher = config.launcher()?;
    let status = launcher.fetch_status(&args.execution_id).await?;
    print!("{}", format_status(&status));
    Ok(())
}

pub async fn run_output(args: OutputArgs, config: &Config) -> anyhow::Result<()> {
    let launcher = config.launcher()?;
    let output = launcher.fetch_output(&args.execution_id).await?;
    if output.is_empty() {
        tracing::info!("No output recorded for execution {}", args.execution_id);
    }
    print!("{}", output);
    Ok(())
}

fn format_status(status: &ExecutionStatus) -> String {
    let mut out = format!(
        "Execution {}\n  Command: {}\n  Host:    {}\n  Status:  {}\n",
        status.id(),
        status.command_name,
        status.target_host,
        status.status.as_str()
    );
    if let Some(started) = status.started_at() {
        out.push_str(&format!("  Started: {}\n", started.to_rfc3339()));
    }
    if let Some(ended) = status.ended_at() {
        out.push_str(&format!("  Ended:   {}\n", ended.to_rfc3339()));
    }
    if let Some(code) = status.exit_code {
        out.push_str(&format!("  Exit:    {}\n", code));
    }
    if let Some(user) = &status.user {
        out.push_str(&format!("  User:    {}\n", user));
    }
    out
}

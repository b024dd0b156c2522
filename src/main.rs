use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "cairn")]
#[command(version, about = "Progress tracking for markdown development plans")]
pub struct Cli {
    /// Directory containing plan directories. Defaults to the current directory.
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List every plan with its progress and status
    Plans,
    /// Show one plan's full state, achievement by achievement
    Show {
        /// Plan directory name under the root
        plan: String,
    },
    /// Show parallel-execution groups and time estimates for a plan
    Parallel {
        /// Plan directory name under the root
        plan: String,
    },
    /// Watch a plan and reprint its state when execution files change
    Watch {
        /// Plan directory name under the root
        plan: String,

        /// Seconds between filesystem scans
        #[arg(long, default_value = "2.0")]
        interval: f64,

        /// Quiet seconds required before a change is reported
        #[arg(long, default_value = "0.5")]
        debounce: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let root = match cli.root.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::Plans => cmd::cmd_plans(&root)?,
        Commands::Show { plan } => cmd::cmd_show(&root, plan)?,
        Commands::Parallel { plan } => cmd::cmd_parallel(&root, plan)?,
        Commands::Watch {
            plan,
            interval,
            debounce,
        } => cmd::cmd_watch(&root, plan, *interval, *debounce).await?,
    }

    Ok(())
}

// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "swapdock")]
#[command(about = "Zero-downtime compose deployments onto a single Docker host")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy a compose manifest as an application
    Deploy(DeployArgs),

    /// Validate a compose manifest without touching the engine
    Check {
        /// Compose file to validate
        #[arg(short, long)]
        file: PathBuf,

        /// Application name used to derive container names
        #[arg(long, default_value = "app")]
        app: String,
    },
}

#[derive(Args)]
pub struct DeployArgs {
    /// Application name; prefixes every container name
    pub app: String,

    /// Compose file to deploy
    #[arg(short, long)]
    pub file: PathBuf,

    /// Identity recorded as owner (defaults to $USER)
    #[arg(long)]
    pub user: Option<String>,

    /// Deploy even if containers are owned by someone else
    #[arg(long)]
    pub admin: bool,

    /// Extra key=value parameters forwarded to notifications
    #[arg(long = "param", value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    /// Print JSON lines
    #[arg(long, conflicts_with = "quiet")]
    pub json: bool,

    /// Print only the final result
    #[arg(short, long)]
    pub quiet: bool,
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", s))
}

// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cutover")]
#[command(about = "Blue/green deployments with health-gated traffic cutover")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file (default: discover in the current directory)
    #[arg(long, global = true, env = "CUTOVER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print warnings, errors, and the final summary
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a template cutover.yml in the current directory
    Init {
        /// Project name (default: my-app)
        #[arg(long)]
        project: Option<String>,

        /// Overwrite an existing cutover.yml
        #[arg(long)]
        force: bool,
    },

    /// Deploy a version to the inactive environment and switch traffic to it
    Deploy {
        /// Destination to deploy to (defined in config)
        #[arg(env = "CUTOVER_ENVIRONMENT")]
        environment: String,

        /// Version to deploy
        #[arg(env = "CUTOVER_VERSION", default_value = "latest")]
        version: String,

        /// Run preflight, detection and gates against the live environment without changing anything
        #[arg(long, env = "CUTOVER_DRY_RUN")]
        dry_run: bool,

        /// Skip the smoke gate
        #[arg(long, env = "CUTOVER_SKIP_TESTS")]
        skip_tests: bool,

        /// Continue past a failed health or smoke gate
        #[arg(long, env = "CUTOVER_FORCE")]
        force: bool,

        /// Deploy a single service instead of all of them
        #[arg(long, env = "CUTOVER_SERVICE")]
        service: Option<String>,

        /// Break a deploy lock held by another run
        #[arg(long)]
        break_lock: bool,

        /// Run the cleanup step on the previous environment after success
        #[arg(long)]
        cleanup: bool,
    },

    /// Switch traffic back to the inactive environment and confirm recovery
    Rollback {
        /// Destination to roll back (defined in config)
        #[arg(env = "CUTOVER_ENVIRONMENT")]
        environment: String,

        /// Break a deploy lock held by another run
        #[arg(long)]
        break_lock: bool,
    },

    /// Show the active environment and probe both environments once
    Status {
        /// Destination to inspect (defined in config)
        #[arg(env = "CUTOVER_ENVIRONMENT")]
        environment: String,
    },
}

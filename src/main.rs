// ABOUTME: Entry point for the cutover CLI application.
// ABOUTME: Parses arguments, installs logging and Ctrl-C cancellation, and dispatches commands.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use cutover::cancel::Cancellation;
use cutover::config::{self, Config};
use cutover::error::Result;
use cutover::output::{Output, OutputMode};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise the verbose flag picks the level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let output = Output::new(mode);

    let (handle, cancel) = Cancellation::pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; cancelling");
            handle.cancel();
        }
    });

    let code = match run(cli, output.clone(), &cancel).await {
        Ok(code) => code,
        Err(e) => {
            output.error(&e.to_string());
            e.exit_code()
        }
    };

    std::process::exit(code);
}

async fn run(cli: Cli, output: Output, cancel: &Cancellation) -> Result<i32> {
    match cli.command {
        Commands::Init { project, force } => {
            let cwd = env::current_dir()?;
            config::init_config(&cwd, project.as_deref(), force)?;
            output.success("Created cutover.yml");
            Ok(0)
        }
        Commands::Deploy {
            environment,
            version,
            dry_run,
            skip_tests,
            force,
            service,
            break_lock,
            cleanup,
        } => {
            let config = load_config(cli.config.as_deref())?.for_destination(&environment)?;
            let args = commands::DeployArgs {
                environment,
                version,
                dry_run,
                skip_tests,
                force,
                service,
                break_lock,
                cleanup,
            };
            commands::deploy(config, args, output, cancel).await
        }
        Commands::Rollback {
            environment,
            break_lock,
        } => {
            let config = load_config(cli.config.as_deref())?.for_destination(&environment)?;
            commands::rollback(config, &environment, break_lock, output).await
        }
        Commands::Status { environment } => {
            let config = load_config(cli.config.as_deref())?.for_destination(&environment)?;
            commands::status(config, output, cancel).await
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::discover(&env::current_dir()?),
    }
}

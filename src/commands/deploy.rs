// ABOUTME: Deploy command implementation.
// ABOUTME: Builds the request from CLI arguments and runs the orchestrator.

use cutover::cancel::Cancellation;
use cutover::config::Config;
use cutover::deploy::{DeployFlags, DeploymentRequest, Orchestrator, Ports};
use cutover::error::Result;
use cutover::output::Output;
use cutover::types::{ServiceTarget, Version};

/// Arguments of `cutover deploy`.
pub struct DeployArgs {
    pub environment: String,
    pub version: String,
    pub dry_run: bool,
    pub skip_tests: bool,
    pub force: bool,
    pub service: Option<String>,
    pub break_lock: bool,
    pub cleanup: bool,
}

/// Run one deployment. Returns the process exit code.
pub async fn deploy(
    config: Config,
    args: DeployArgs,
    mut output: Output,
    cancel: &Cancellation,
) -> Result<i32> {
    let version = Version::new(&args.version)?;
    let target = ServiceTarget::from_option(args.service.as_deref())?;
    config.select_services(&target)?;

    let request = DeploymentRequest {
        destination: args.environment.clone(),
        version,
        target,
        flags: DeployFlags {
            skip_tests: args.skip_tests,
            force: args.force,
            dry_run: args.dry_run,
        },
        break_lock: args.break_lock,
        cleanup: args.cleanup,
    };

    let ports = Ports::production(&config, &args.environment)?;

    output.start_timer();
    output.progress(&format!(
        "{} {} {} ({}) to {}",
        if args.dry_run { "Dry run:" } else { "Deploying" },
        config.project,
        request.version,
        request.target,
        request.destination
    ));

    let progress = output.clone();
    let orchestrator = Orchestrator::new(config, ports)
        .with_progress(move |stage| progress.step(stage));

    let outcome = orchestrator.run(request, cancel).await;
    output.outcome(&outcome);

    Ok(outcome.exit_code())
}

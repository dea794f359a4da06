// ABOUTME: Rollback command implementation.
// ABOUTME: Flips traffic back to the inactive environment and confirms recovery.

use cutover::config::Config;
use cutover::deploy::{DeployLock, EXIT_ROLLBACK_FAILED, Ports};
use cutover::diagnostics::{Diagnostics, Warning};
use cutover::error::Result;
use cutover::output::Output;

/// Send traffic back to the environment that is not live. Returns the process exit code.
pub async fn rollback(
    config: Config,
    destination: &str,
    break_lock: bool,
    mut output: Output,
) -> Result<i32> {
    output.start_timer();
    let ports = Ports::production(&config, destination)?;
    let mut diag = Diagnostics::default();

    output.step("Acquiring deploy lock");
    let lock = DeployLock::acquire(
        &config.lock_dir(),
        &config.project,
        "rollback",
        break_lock,
        &mut diag,
    )?;

    if let Some(recovery) = ports.switcher.recover(false).await? {
        diag.warn(Warning::recovery(format!(
            "Interrupted switch found before rollback: {:?}",
            recovery
        )));
    }

    let detection = ports.switcher.detect().await?;
    let previous = detection.state.target;
    output.progress(&format!(
        "Rolling back {}: {} -> {}",
        config.project, detection.state.active, previous
    ));

    let report = ports.rollback.rollback(previous).await;

    let lock_path = lock.path().to_path_buf();
    if let Err(e) = lock.release() {
        diag.warn(Warning::lock_release(format!(
            "Failed to remove deploy lock {}: {}",
            lock_path.display(),
            e
        )));
    }

    // Emit collected warnings
    for warning in diag.warnings() {
        output.warning(&warning.message);
    }

    if let Some(ref error) = report.error {
        output.error(error);
    }

    if report.succeeded() {
        output.success(&format!("Traffic restored to {}; recovery confirmed", previous));
        Ok(0)
    } else {
        output.error(&format!(
            "MANUAL INTERVENTION REQUIRED: recovery of {} not confirmed",
            previous
        ));
        Ok(EXIT_ROLLBACK_FAILED)
    }
}

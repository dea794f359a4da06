// ABOUTME: Compile-fail test verifying a gate cannot be forced once traffic has moved.
// ABOUTME: This test should fail to compile, validating state machine safety.

use cutover::deploy::{DeployError, Deployment, Switched};

fn try_late_force(deployment: Deployment<Switched>, error: DeployError) {
    // ERROR: force_health() only exists on Deployment<TargetDeployed>
    let _ = deployment.force_health(error);
}

fn main() {}

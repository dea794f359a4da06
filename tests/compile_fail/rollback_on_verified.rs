// ABOUTME: Compile-fail test verifying rollback cannot be called on Verified.
// ABOUTME: This test should fail to compile, validating state machine safety.

use cutover::deploy::{Deployment, RollbackControl, Verified};

async fn try_invalid_rollback(deployment: Deployment<Verified>, controller: &dyn RollbackControl) {
    // ERROR: rollback() doesn't exist on Deployment<Verified>
    let _ = deployment.rollback(controller).await;
}

fn main() {}

// ABOUTME: Compile-fail test verifying traffic cannot be switched before the gates run.
// ABOUTME: This test should fail to compile, validating state machine safety.

use cutover::config::Config;
use cutover::deploy::{Deployment, DeploymentRequest};
use cutover::proxy::TrafficSwitch;
use cutover::types::Version;

async fn try_early_switch(switcher: &dyn TrafficSwitch) {
    let deployment = Deployment::new(
        Config::template(),
        DeploymentRequest::new("production", Version::new("v1").unwrap()),
    );
    // ERROR: switch_traffic() doesn't exist on Deployment<Initialized>
    let _ = deployment.switch_traffic(switcher).await;
}

fn main() {}

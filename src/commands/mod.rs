// ABOUTME: Command module aggregator for the cutover CLI.
// ABOUTME: Re-exports deploy, rollback, and status command handlers.

mod deploy;
mod rollback;
mod status;

pub use deploy::{DeployArgs, deploy};
pub use rollback::rollback;
pub use status::status;

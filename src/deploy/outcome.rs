// ABOUTME: The result of one orchestration run: which gate failed and the live state after.
// ABOUTME: Maps to the process exit code and the closing summary lines.

use serde::Serialize;
use std::fmt;

use crate::types::Environment;

use super::rollback::RollbackReport;

/// Gate a failed run stopped at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedStage {
    Preflight,
    Deploy,
    Health,
    Smoke,
    Switch,
    PostVerify,
    Cancelled,
}

impl FailedStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailedStage::Preflight => "preflight",
            FailedStage::Deploy => "deploy",
            FailedStage::Health => "health",
            FailedStage::Smoke => "smoke",
            FailedStage::Switch => "switch",
            FailedStage::PostVerify => "post_verify",
            FailedStage::Cancelled => "cancelled",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            FailedStage::Preflight => 2,
            FailedStage::Deploy => 3,
            FailedStage::Health => 4,
            FailedStage::Smoke => 5,
            FailedStage::Switch => 6,
            FailedStage::PostVerify => 7,
            FailedStage::Cancelled => 8,
        }
    }
}

impl fmt::Display for FailedStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exit code for a rollback that failed or could not confirm recovery.
pub const EXIT_ROLLBACK_FAILED: i32 = 10;

#[derive(Debug, Clone, Serialize)]
pub struct DeploymentOutcome {
    pub success: bool,
    pub project: String,
    pub destination: String,
    pub version: String,
    /// Environment serving traffic when the run ended, if it could be determined.
    pub final_environment: Option<Environment>,
    /// Environment the run deployed into.
    pub deployed_environment: Option<Environment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<FailedStage>,
    pub rollback_performed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollback: Option<RollbackReport>,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub warnings: Vec<String>,
}

impl DeploymentOutcome {
    /// None when no rollback ran.
    pub fn rollback_succeeded(&self) -> Option<bool> {
        self.rollback.as_ref().map(RollbackReport::succeeded)
    }

    pub fn exit_code(&self) -> i32 {
        if self.rollback_succeeded() == Some(false) {
            return EXIT_ROLLBACK_FAILED;
        }
        self.failed_stage.map(|s| s.exit_code()).unwrap_or(0)
    }

    /// Closing lines that state the live situation without re-deriving it.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();

        match self.failed_stage {
            Some(stage) => lines.push(format!("Failed gate: {}", stage)),
            None if self.dry_run => lines.push("Dry run completed; nothing was changed".into()),
            None => lines.push(format!("Deployed {} successfully", self.version)),
        }

        match self.rollback_succeeded() {
            None => lines.push("Rollback attempted: no".into()),
            Some(succeeded) => {
                lines.push("Rollback attempted: yes".into());
                lines.push(format!(
                    "Rollback succeeded: {}",
                    if succeeded { "yes" } else { "no" }
                ));
                if !succeeded {
                    lines.push("MANUAL INTERVENTION REQUIRED".into());
                }
            }
        }

        lines.push(format!(
            "Live environment: {}",
            self.final_environment
                .map(|e| e.as_str())
                .unwrap_or("unknown")
        ));

        lines
    }
}

// ABOUTME: Operator-facing feedback for the CLI: progress steps, warnings, errors and the run summary.
// ABOUTME: Text goes to a terminal; --quiet keeps only what CI needs; --json writes one object per line.

use serde::Serialize;
use std::time::Instant;

use crate::deploy::DeploymentOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Normal,
    /// Warnings, errors and the closing summary only
    Quiet,
    /// JSON lines for scripting
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Progress,
    Success,
    Warning,
    Error,
}

impl Kind {
    fn event(self) -> &'static str {
        match self {
            Kind::Progress => "progress",
            Kind::Success => "success",
            Kind::Warning => "warning",
            Kind::Error => "error",
        }
    }

    fn to_stderr(self) -> bool {
        matches!(self, Kind::Warning | Kind::Error)
    }
}

#[derive(Debug, Clone)]
pub struct Output {
    mode: OutputMode,
    started: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            started: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Later success lines and JSON events carry the time since this call.
    pub fn start_timer(&mut self) {
        self.started = Some(Instant::now());
    }

    fn elapsed(&self) -> Option<f64> {
        self.started.map(|t| t.elapsed().as_secs_f64())
    }

    pub fn progress(&self, message: &str) {
        self.write(Kind::Progress, message);
    }

    /// An orchestrator stage, indented under the run header.
    pub fn step(&self, stage: &str) {
        self.progress(&format!("  → {stage}..."));
    }

    pub fn success(&self, message: &str) {
        self.write(Kind::Success, message);
    }

    pub fn warning(&self, message: &str) {
        self.write(Kind::Warning, message);
    }

    pub fn error(&self, message: &str) {
        self.write(Kind::Error, message);
    }

    /// Close a deployment run. Summary lines always come last.
    pub fn outcome(&self, outcome: &DeploymentOutcome) {
        if self.mode == OutputMode::Json {
            let record = OutcomeRecord {
                event: "outcome",
                duration_secs: self.elapsed(),
                outcome,
            };
            if let Ok(json) = serde_json::to_string(&record) {
                println!("{json}");
            }
            return;
        }

        for warning in &outcome.warnings {
            self.warning(warning);
        }
        if let Some(error) = &outcome.error {
            self.error(error);
        }
        for line in outcome.summary_lines() {
            println!("{line}");
        }
    }

    fn write(&self, kind: Kind, message: &str) {
        let Some(line) = self.render(kind, message) else {
            return;
        };
        if kind.to_stderr() {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }

    fn render(&self, kind: Kind, message: &str) -> Option<String> {
        match (self.mode, kind) {
            (OutputMode::Json, Kind::Progress) | (OutputMode::Quiet, Kind::Progress) => None,
            (OutputMode::Json, _) => serde_json::to_string(&EventRecord {
                event: kind.event(),
                message,
                duration_secs: self.elapsed(),
            })
            .ok(),
            (_, Kind::Warning) => Some(format!("Warning: {message}")),
            (_, Kind::Error) => Some(format!("Error: {message}")),
            (OutputMode::Normal, Kind::Success) => Some(match self.elapsed() {
                Some(secs) => format!("{message} ({secs:.1}s)"),
                None => message.to_string(),
            }),
            (_, _) => Some(message.to_string()),
        }
    }
}

#[derive(Serialize)]
struct EventRecord<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[derive(Serialize)]
struct OutcomeRecord<'a> {
    event: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
    #[serde(flatten)]
    outcome: &'a DeploymentOutcome,
}

// ABOUTME: Shell-step implementation of service control.
// ABOUTME: Runs pull, migrate, deploy, and publish in order with the deployment context in env.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;

use super::{ServiceControl, ServiceError};
use crate::command::run_shell;
use crate::config::{Config, StepsConfig, resolve_env_map};
use crate::types::{Environment, ServiceName, ServiceTarget, Version};

/// Deployment step points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Pull,
    Migrate,
    Deploy,
    Publish,
    Cleanup,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Pull => "pull",
            Step::Migrate => "migrate",
            Step::Deploy => "deploy",
            Step::Publish => "publish",
            Step::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Context passed to step commands via environment variables.
#[derive(Debug, Clone)]
pub struct StepContext {
    pub project: ServiceName,
    pub destination: String,
    pub slot: Environment,
    pub version: Option<Version>,
    pub services: Vec<ServiceName>,
}

impl StepContext {
    /// Convert context to environment variables.
    pub fn to_env(&self) -> HashMap<String, String> {
        let services: Vec<&str> = self.services.iter().map(|s| s.as_str()).collect();

        let mut env = HashMap::new();
        env.insert("CUTOVER_PROJECT".to_string(), self.project.to_string());
        env.insert("CUTOVER_DESTINATION".to_string(), self.destination.clone());
        env.insert("CUTOVER_SLOT".to_string(), self.slot.to_string());
        env.insert("CUTOVER_SERVICES".to_string(), services.join(" "));
        if let Some(ref version) = self.version {
            env.insert("CUTOVER_VERSION".to_string(), version.to_string());
        }
        env
    }
}

/// Runs the configured step commands.
pub struct CommandServiceControl {
    project: ServiceName,
    destination: String,
    steps: StepsConfig,
    services: Vec<ServiceName>,
    extra_env: HashMap<String, String>,
}

impl CommandServiceControl {
    pub fn new(
        project: ServiceName,
        destination: impl Into<String>,
        steps: StepsConfig,
        services: Vec<ServiceName>,
        extra_env: HashMap<String, String>,
    ) -> Self {
        Self {
            project,
            destination: destination.into(),
            steps,
            services,
            extra_env,
        }
    }

    pub fn from_config(config: &Config, destination: &str) -> Result<Self, ServiceError> {
        let extra_env =
            resolve_env_map(&config.env).map_err(|e| ServiceError::Environment(e.to_string()))?;
        Ok(Self::new(
            config.project.clone(),
            destination,
            config.steps.clone(),
            config.services.iter().map(|s| s.name.clone()).collect(),
            extra_env,
        ))
    }

    fn context(&self, slot: Environment, version: Option<&Version>, target: &ServiceTarget) -> StepContext {
        StepContext {
            project: self.project.clone(),
            destination: self.destination.clone(),
            slot,
            version: version.cloned(),
            services: self
                .services
                .iter()
                .filter(|s| target.includes(s))
                .cloned()
                .collect(),
        }
    }

    async fn run_step(
        &self,
        step: Step,
        command: &str,
        context: &StepContext,
    ) -> Result<(), ServiceError> {
        tracing::info!("Running {} step for {} slot", step, context.slot);

        // Context variables win over user-supplied env
        let mut env = self.extra_env.clone();
        env.extend(context.to_env());

        let output = run_shell(command, &env, self.steps.timeout)
            .await
            .map_err(|source| ServiceError::Command { step, source })?;

        if output.success {
            tracing::debug!("{} step completed successfully", step);
            Ok(())
        } else {
            Err(ServiceError::StepFailed {
                step,
                status: output.status_label(),
                stderr: output.stderr,
            })
        }
    }
}

#[async_trait]
impl ServiceControl for CommandServiceControl {
    async fn deploy(
        &self,
        slot: Environment,
        version: &Version,
        target: &ServiceTarget,
    ) -> Result<(), ServiceError> {
        let context = self.context(slot, Some(version), target);

        let steps = [
            (Step::Pull, self.steps.pull.as_deref()),
            (Step::Migrate, self.steps.migrate.as_deref()),
            (Step::Deploy, Some(self.steps.deploy.as_str())),
            (Step::Publish, self.steps.publish.as_deref()),
        ];

        for (step, command) in steps {
            if let Some(command) = command {
                self.run_step(step, command, &context).await?;
            }
        }

        Ok(())
    }

    async fn cleanup(&self, slot: Environment) -> Result<(), ServiceError> {
        let Some(ref command) = self.steps.cleanup else {
            tracing::debug!("No cleanup step configured");
            return Ok(());
        };
        let context = self.context(slot, None, &ServiceTarget::All);
        self.run_step(Step::Cleanup, command, &context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> ServiceName {
        ServiceName::new(s).unwrap()
    }

    #[test]
    fn step_context_to_env() {
        let context = StepContext {
            project: name("shop"),
            destination: "production".to_string(),
            slot: Environment::Green,
            version: Some(Version::new("v1.2.3").unwrap()),
            services: vec![name("web"), name("gateway")],
        };

        let env = context.to_env();
        assert_eq!(env.get("CUTOVER_PROJECT"), Some(&"shop".to_string()));
        assert_eq!(env.get("CUTOVER_SLOT"), Some(&"green".to_string()));
        assert_eq!(env.get("CUTOVER_VERSION"), Some(&"v1.2.3".to_string()));
        assert_eq!(env.get("CUTOVER_SERVICES"), Some(&"web gateway".to_string()));
        assert_eq!(
            env.get("CUTOVER_DESTINATION"),
            Some(&"production".to_string())
        );
    }

    #[test]
    fn cleanup_context_has_no_version() {
        let control = CommandServiceControl::new(
            name("shop"),
            "staging",
            StepsConfig::new("true"),
            vec![name("web")],
            HashMap::new(),
        );
        let env = control
            .context(Environment::Blue, None, &ServiceTarget::All)
            .to_env();
        assert!(!env.contains_key("CUTOVER_VERSION"));
    }

    #[test]
    fn target_narrows_services() {
        let control = CommandServiceControl::new(
            name("shop"),
            "staging",
            StepsConfig::new("true"),
            vec![name("web"), name("gateway")],
            HashMap::new(),
        );
        let context = control.context(
            Environment::Blue,
            None,
            &ServiceTarget::Only(name("gateway")),
        );
        assert_eq!(context.services, vec![name("gateway")]);
    }
}

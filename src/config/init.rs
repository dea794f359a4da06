// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates cutover.yml template files.

use std::path::Path;

use crate::error::{Error, Result};

use super::{CONFIG_FILENAME, Config};

pub fn init_config(dir: &Path, project: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let mut config = Config::template();

    if let Some(p) = project {
        config.project = crate::types::ServiceName::new(p)
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
    }

    let yaml = generate_template_yaml(&config);
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(config: &Config) -> String {
    let web = config.services.first();
    format!(
        r#"project: {project}

proxy:
  config: {proxy_config}
  validate: "{validate}"
  reload: "{reload}"
  status: "{status}"
  # health_url: http://127.0.0.1/nginx-health

environments:
  blue:
    host: {blue_host}
  green:
    host: {green_host}

services:
  - name: {web}
    health: {web_health}
    ports:
      blue: {web_blue}
      green: {web_green}

health:
  timeout: 120s
  interval: 5s

smoke:
  service: {web}
  timeout: 10s
  assertions:
    - name: health
      path: {web_health}
      expect: 200
    # Endpoints whose auth gating is ambiguous before login accept several codes
    # - name: products
    #   path: /api/products/
    #   expect: [200, 401, 403]
    #   max_latency: 2s

steps:
  # pull: docker compose -p "$CUTOVER_PROJECT-$CUTOVER_SLOT" pull
  # migrate: docker compose -p "$CUTOVER_PROJECT-$CUTOVER_SLOT" run --rm web migrate
  deploy: {deploy}

# Used when the proxy config shows neither or both environments active
detection_fallback: blue
"#,
        project = config.project,
        proxy_config = config.proxy.config.display(),
        validate = config.proxy.validate,
        reload = config.proxy.reload,
        status = config.proxy.status,
        blue_host = config.environments.blue.host,
        green_host = config.environments.green.host,
        web = web.name,
        web_health = web.health,
        web_blue = web.ports.blue,
        web_green = web.ports.green,
        deploy = config.steps.deploy,
    )
}

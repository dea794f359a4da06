// ABOUTME: Structured model of the reverse proxy's upstream file.
// ABOUTME: Parses the blue/green server lines, moves the active marker, and re-renders.

use std::path::PathBuf;

use crate::types::Environment;

const ACTIVE_MARKER: &str = "[active]";

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("no server entry annotated '# {0}'")]
    MissingEntry(Environment),

    #[error("more than one server entry annotated '# {0}'")]
    DuplicateEntry(Environment),

    #[error("line {line}: unrecognized upstream annotation '{annotation}'")]
    UnknownAnnotation { line: usize, annotation: String },

    #[error("line {line}: malformed server entry")]
    MalformedEntry { line: usize },

    #[error("upstream config not found at {0}")]
    NotFound(PathBuf),

    #[error("no upstream backup at {0}")]
    NoBackup(PathBuf),

    #[error("upstream config I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl UpstreamError {
    /// True for errors about the file's content rather than access to it.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            UpstreamError::MissingEntry(_)
                | UpstreamError::DuplicateEntry(_)
                | UpstreamError::UnknownAnnotation { .. }
                | UpstreamError::MalformedEntry { .. }
        )
    }
}

/// Which entries carry the active marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerState {
    Single(Environment),
    Neither,
    Both,
}

/// One annotated `server` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamEntry {
    pub environment: Environment,
    pub address: String,
    /// nginx server parameters other than `down`.
    pub params: Vec<String>,
    pub active: bool,
    indent: String,
    down: bool,
    /// The line as read; dropped once the entry changes.
    original: Option<String>,
}

impl UpstreamEntry {
    fn render(&self) -> String {
        if let Some(ref line) = self.original {
            return line.clone();
        }

        let mut out = format!("{}server {}", self.indent, self.address);
        for param in &self.params {
            out.push(' ');
            out.push_str(param);
        }
        if !self.active {
            out.push_str(" down");
        }
        out.push_str(";  # ");
        out.push_str(self.environment.as_str());
        if self.active {
            out.push(' ');
            out.push_str(ACTIVE_MARKER);
        }
        out
    }

    fn set_active(&mut self, active: bool) {
        // `down` must be present exactly on the inactive entry
        if self.active != active || self.down == active {
            self.active = active;
            self.down = !active;
            self.original = None;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Text(String),
    Entry(Environment),
}

/// Parsed upstream file. Lines other than the two annotated entries are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    lines: Vec<Line>,
    blue: UpstreamEntry,
    green: UpstreamEntry,
}

impl UpstreamConfig {
    pub fn parse(content: &str) -> Result<Self, UpstreamError> {
        let mut lines = Vec::new();
        let mut blue = None;
        let mut green = None;

        for (idx, raw) in content.split('\n').enumerate() {
            let Some(entry) = parse_entry(raw, idx + 1)? else {
                lines.push(Line::Text(raw.to_string()));
                continue;
            };

            let env = entry.environment;
            let slot = match env {
                Environment::Blue => &mut blue,
                Environment::Green => &mut green,
            };
            if slot.is_some() {
                return Err(UpstreamError::DuplicateEntry(env));
            }
            *slot = Some(entry);
            lines.push(Line::Entry(env));
        }

        Ok(UpstreamConfig {
            lines,
            blue: blue.ok_or(UpstreamError::MissingEntry(Environment::Blue))?,
            green: green.ok_or(UpstreamError::MissingEntry(Environment::Green))?,
        })
    }

    pub fn render(&self) -> String {
        self.lines
            .iter()
            .map(|line| match line {
                Line::Text(text) => text.clone(),
                Line::Entry(env) => self.entry(*env).render(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn entry(&self, env: Environment) -> &UpstreamEntry {
        match env {
            Environment::Blue => &self.blue,
            Environment::Green => &self.green,
        }
    }

    pub fn markers(&self) -> MarkerState {
        match (self.blue.active, self.green.active) {
            (true, false) => MarkerState::Single(Environment::Blue),
            (false, true) => MarkerState::Single(Environment::Green),
            (false, false) => MarkerState::Neither,
            (true, true) => MarkerState::Both,
        }
    }

    /// The active environment, when exactly one entry is marked.
    pub fn active(&self) -> Option<Environment> {
        match self.markers() {
            MarkerState::Single(env) => Some(env),
            _ => None,
        }
    }

    /// Mark `env` active and the other entry down. Entries are never removed.
    pub fn activate(&mut self, env: Environment) {
        self.blue.set_active(env == Environment::Blue);
        self.green.set_active(env == Environment::Green);
    }
}

fn parse_entry(raw: &str, line: usize) -> Result<Option<UpstreamEntry>, UpstreamError> {
    let trimmed = raw.trim_start();
    if !trimmed.starts_with("server ") && !trimmed.starts_with("server\t") {
        return Ok(None);
    }
    let Some((directive, comment)) = trimmed.split_once('#') else {
        return Ok(None);
    };

    let mut words = comment.split_whitespace();
    let environment = match words.next().map(str::parse::<Environment>) {
        Some(Ok(env)) => env,
        // Ordinary comments on other server lines are left alone
        _ if !comment.contains(ACTIVE_MARKER) => return Ok(None),
        _ => {
            return Err(UpstreamError::UnknownAnnotation {
                line,
                annotation: comment.trim().to_string(),
            });
        }
    };

    let mut active = false;
    for word in words {
        if word == ACTIVE_MARKER {
            active = true;
        } else {
            return Err(UpstreamError::UnknownAnnotation {
                line,
                annotation: comment.trim().to_string(),
            });
        }
    }

    let body = directive
        .trim_end()
        .strip_suffix(';')
        .ok_or(UpstreamError::MalformedEntry { line })?;
    let mut tokens = body.split_whitespace().skip(1);
    let address = tokens
        .next()
        .ok_or(UpstreamError::MalformedEntry { line })?
        .to_string();

    let mut down = false;
    let mut params = Vec::new();
    for token in tokens {
        if token == "down" {
            down = true;
        } else {
            params.push(token.to_string());
        }
    }

    Ok(Some(UpstreamEntry {
        environment,
        address,
        params,
        active,
        indent: raw[..raw.len() - trimmed.len()].to_string(),
        down,
        original: Some(raw.to_string()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLUE_ACTIVE: &str = "upstream backend {
    server 127.0.0.1:8001;  # blue [active]
    server 127.0.0.1:8002 down;  # green
}
";

    const GREEN_ACTIVE: &str = "upstream backend {
    server 127.0.0.1:8001 down;  # blue
    server 127.0.0.1:8002;  # green [active]
}
";

    #[test]
    fn parses_active_marker() {
        let config = UpstreamConfig::parse(BLUE_ACTIVE).unwrap();
        assert_eq!(config.active(), Some(Environment::Blue));
        assert_eq!(config.entry(Environment::Green).address, "127.0.0.1:8002");
    }

    #[test]
    fn unchanged_config_renders_identically() {
        let config = UpstreamConfig::parse(BLUE_ACTIVE).unwrap();
        assert_eq!(config.render(), BLUE_ACTIVE);
    }

    #[test]
    fn activate_moves_marker_and_down() {
        let mut config = UpstreamConfig::parse(BLUE_ACTIVE).unwrap();
        config.activate(Environment::Green);
        assert_eq!(config.render(), GREEN_ACTIVE);
        assert_eq!(config.active(), Some(Environment::Green));
    }

    #[test]
    fn params_survive_rewrite() {
        let input = "  server 10.0.0.1:80 weight=5 max_fails=3;  # blue [active]\n  server 10.0.0.2:80 weight=5 down;  # green";
        let mut config = UpstreamConfig::parse(input).unwrap();
        config.activate(Environment::Green);
        assert_eq!(
            config.render(),
            "  server 10.0.0.1:80 weight=5 max_fails=3 down;  # blue\n  server 10.0.0.2:80 weight=5;  # green [active]"
        );
    }

    #[test]
    fn neither_or_both_marked() {
        let neither = BLUE_ACTIVE.replace(" [active]", "");
        assert_eq!(
            UpstreamConfig::parse(&neither).unwrap().markers(),
            MarkerState::Neither
        );

        let both = GREEN_ACTIVE.replace("# blue", "# blue [active]");
        let config = UpstreamConfig::parse(&both).unwrap();
        assert_eq!(config.markers(), MarkerState::Both);
        assert_eq!(config.active(), None);
    }

    #[test]
    fn missing_entry_is_an_error() {
        let input = "server 127.0.0.1:8001;  # blue [active]\n";
        assert!(matches!(
            UpstreamConfig::parse(input),
            Err(UpstreamError::MissingEntry(Environment::Green))
        ));
    }

    #[test]
    fn duplicate_entry_is_an_error() {
        let input = format!("{}    server 127.0.0.1:8003;  # blue\n", BLUE_ACTIVE);
        assert!(matches!(
            UpstreamConfig::parse(&input),
            Err(UpstreamError::DuplicateEntry(Environment::Blue))
        ));
    }

    #[test]
    fn unknown_annotation_is_an_error() {
        let input = BLUE_ACTIVE.replace("# green", "# green [standby]");
        let err = UpstreamConfig::parse(&input).unwrap_err();
        assert!(matches!(err, UpstreamError::UnknownAnnotation { line: 3, .. }));
        assert!(err.is_parse_error());
    }

    #[test]
    fn ordinary_comments_are_text() {
        let input = format!("# managed by ops\n{}    server 127.0.0.1:9000;  # metrics\n", BLUE_ACTIVE);
        let config = UpstreamConfig::parse(&input).unwrap();
        assert_eq!(config.render(), input);
    }
}

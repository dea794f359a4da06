// ABOUTME: Property tests for the upstream file model and environment complement.
// ABOUTME: Activation is idempotent, reversible, and never drops surrounding lines.

use cutover::proxy::{MarkerState, UpstreamConfig};
use cutover::types::{Environment, EnvironmentState};
use proptest::prelude::*;

fn environment() -> impl Strategy<Value = Environment> {
    prop_oneof![Just(Environment::Blue), Just(Environment::Green)]
}

fn upstream_file() -> impl Strategy<Value = (String, Environment)> {
    (
        environment(),
        1024u16..60000,
        1024u16..60000,
        "[ \t]{0,8}",
        prop::collection::vec("[a-z_]{1,12} [a-z0-9]{1,8};", 0..4),
        prop::option::of("weight=[1-9]"),
    )
        .prop_map(|(active, blue_port, green_port, indent, extra, param)| {
            let param = param.map(|p| format!(" {}", p)).unwrap_or_default();
            let line = |env: Environment, port: u16| {
                let live = env == active;
                format!(
                    "{indent}server 10.0.0.1:{port}{param}{down};  # {env}{marker}",
                    down = if live { "" } else { " down" },
                    marker = if live { " [active]" } else { "" },
                )
            };
            let mut lines = vec!["upstream app {".to_string()];
            lines.extend(extra.iter().map(|l| format!("{indent}{l}")));
            lines.push(line(Environment::Blue, blue_port));
            lines.push(line(Environment::Green, green_port));
            lines.push("}".to_string());
            (lines.join("\n"), active)
        })
}

proptest! {
    #[test]
    fn complement_is_an_involution(env in environment()) {
        prop_assert_ne!(env.complement(), env);
        prop_assert_eq!(env.complement().complement(), env);

        let state = EnvironmentState::with_active(env);
        prop_assert_eq!(state.target, env.complement());
    }

    #[test]
    fn parse_then_render_is_identity((content, active) in upstream_file()) {
        let config = UpstreamConfig::parse(&content).unwrap();
        prop_assert_eq!(config.markers(), MarkerState::Single(active));
        prop_assert_eq!(config.render(), content);
    }

    #[test]
    fn activating_the_live_side_changes_nothing((content, active) in upstream_file()) {
        let mut config = UpstreamConfig::parse(&content).unwrap();
        config.activate(active);
        prop_assert_eq!(config.render(), content);
    }

    #[test]
    fn switch_and_switch_back_restores_bytes((content, active) in upstream_file()) {
        let mut config = UpstreamConfig::parse(&content).unwrap();
        config.activate(active.complement());

        let switched = UpstreamConfig::parse(&config.render()).unwrap();
        prop_assert_eq!(switched.active(), Some(active.complement()));

        let mut back = switched;
        back.activate(active);
        prop_assert_eq!(back.render(), content);
    }

    #[test]
    fn activation_keeps_exactly_one_marker(
        (content, _active) in upstream_file(),
        target in environment(),
    ) {
        let mut config = UpstreamConfig::parse(&content).unwrap();
        config.activate(target);
        let reparsed = UpstreamConfig::parse(&config.render()).unwrap();
        prop_assert_eq!(reparsed.markers(), MarkerState::Single(target));
        prop_assert_eq!(reparsed.entry(target.complement()).address.clone(),
            config.entry(target.complement()).address.clone());
    }
}

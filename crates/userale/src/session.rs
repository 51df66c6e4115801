//! Recorded sessions: one JSON step per line, replayed against a collector
//! through an in-memory event source.

use anyhow::{Context as _, Result};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use userale_core::api::Userale;
use userale_core::config::ConfigPatch;
use userale_core::handlers::{Dispatcher, ListenTarget};
use userale_core::protocol::DomEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Document,
    Window,
}

impl From<Target> for ListenTarget {
    fn from(target: Target) -> Self {
        match target {
            Target::Document => ListenTarget::Document,
            Target::Window => ListenTarget::Window,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Control {
    Start,
    Stop,
}

/// A single line of a session file. `delayMs` is waited before the step runs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Step {
    Dispatch {
        target: Target,
        event: DomEvent,
        #[serde(default, rename = "delayMs")]
        delay_ms: u64,
    },
    Log {
        log: Value,
        #[serde(default, rename = "delayMs")]
        delay_ms: u64,
    },
    Options {
        options: ConfigPatch,
        #[serde(default, rename = "delayMs")]
        delay_ms: u64,
    },
    Control {
        control: Control,
        #[serde(default, rename = "delayMs")]
        delay_ms: u64,
    },
}

impl Step {
    pub fn delay(&self) -> Duration {
        let ms = match self {
            Step::Dispatch { delay_ms, .. }
            | Step::Log { delay_ms, .. }
            | Step::Options { delay_ms, .. }
            | Step::Control { delay_ms, .. } => *delay_ms,
        };
        Duration::from_millis(ms)
    }
}

/// Parses a session, skipping blank lines and `#` comments.
pub fn parse_session(text: &str) -> Result<Vec<Step>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| {
            serde_json::from_str(line.trim())
                .with_context(|| format!("Invalid session step at line {}", index + 1))
        })
        .collect()
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplayStats {
    pub events: usize,
    pub listeners: usize,
    pub logs_accepted: usize,
    pub logs_rejected: usize,
}

/// Runs `steps` against `userale`, starting it first when `autostart` is set.
pub async fn replay(userale: &Userale, dispatcher: &Dispatcher, steps: &[Step]) -> ReplayStats {
    let mut stats = ReplayStats::default();

    let sample = steps.iter().find_map(|step| match step {
        Step::Dispatch { event, .. } => event.time_stamp,
        _ => None,
    });
    userale.calibrate(sample);

    if userale.context().config.read(|c| c.autostart) {
        userale.start(dispatcher).await;
    }

    for step in steps {
        let delay = step.delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match step {
            Step::Dispatch { target, event, .. } => {
                stats.events += 1;
                let invoked = dispatcher.dispatch((*target).into(), event);
                if invoked == 0 {
                    debug!(event_type = %event.event_type, "no listener for event");
                }
                stats.listeners += invoked;
            }
            Step::Log { log, .. } => {
                if userale.log(log.clone()) {
                    stats.logs_accepted += 1;
                } else {
                    warn!("Rejected custom log: {}", log);
                    stats.logs_rejected += 1;
                }
            }
            Step::Options { options, .. } => {
                userale.options(Some(options.clone()));
            }
            Step::Control { control, .. } => match control {
                Control::Start => userale.start(dispatcher).await,
                Control::Stop => userale.stop(),
            },
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use userale_core::config::Config;

    const SESSION: &str = r##"
# login form
{"target":"document","event":{"type":"click","target":{"localName":"button","nodeName":"BUTTON","id":"go"},"pageX":5,"pageY":6,"detail":1}}
{"target":"window","event":{"type":"scroll","target":{"window":{"document":true,"location":true,"alert":true,"setInterval":true}}},"delayMs":100}

{"log":{"type":"note","text":"checkpoint"}}
{"log":"not structured"}
{"options":{"log_details":true}}
{"control":"stop","delayMs":20}
"##;

    fn collector(autostart: bool) -> Userale {
        Userale::over_http(Config {
            autostart,
            url: "http://127.0.0.1:9/".into(),
            log_count_threshold: 100,
            ..Default::default()
        })
    }

    #[test]
    fn test_parse_session() {
        let steps = parse_session(SESSION).expect("session parses");
        assert_eq!(steps.len(), 6);

        match &steps[0] {
            Step::Dispatch { target, event, delay_ms } => {
                assert_eq!(*target, Target::Document);
                assert_eq!(event.event_type, "click");
                assert_eq!(event.target.id.as_deref(), Some("go"));
                assert_eq!(*delay_ms, 0);
            }
            other => panic!("Expected dispatch, got {:?}", other),
        }
        assert_eq!(steps[1].delay(), Duration::from_millis(100));
        assert!(matches!(steps[2], Step::Log { .. }));
        assert!(matches!(
            &steps[4],
            Step::Options { options, .. } if options.log_details == Some(true)
        ));
        assert!(matches!(
            steps[5],
            Step::Control {
                control: Control::Stop,
                delay_ms: 20
            }
        ));
    }

    #[test]
    fn test_parse_error_names_the_line() {
        let err = parse_session("{\"log\":{}}\n\n{\"target\":\"nowhere\"}").unwrap_err();
        assert!(err.to_string().contains("line 3"), "{}", err);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_feeds_the_collector() {
        let userale = collector(true);
        let dispatcher = Dispatcher::new();
        let steps = parse_session(SESSION).unwrap();

        let stats = replay(&userale, &dispatcher, &steps).await;
        assert_eq!(stats.events, 2);
        assert_eq!(stats.listeners, 2);
        assert_eq!(stats.logs_accepted, 1);
        assert_eq!(stats.logs_rejected, 1);

        let logs = userale.context().buffer.snapshot();
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0].as_record().unwrap().target, "button#go");
        assert_eq!(logs[1].as_record().unwrap().target, "Window");

        let config = userale.options(None);
        assert!(config.log_details);
        assert!(!config.on);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_without_autostart_waits_for_control() {
        let userale = collector(false);
        let dispatcher = Dispatcher::new();
        let steps = parse_session(
            r#"
{"target":"document","event":{"type":"click","target":{"localName":"a","nodeName":"A"}}}
{"control":"start"}
{"target":"document","event":{"type":"click","target":{"localName":"a","nodeName":"A"}}}
"#,
        )
        .unwrap();

        let stats = replay(&userale, &dispatcher, &steps).await;
        assert_eq!(stats.events, 2);
        assert_eq!(stats.listeners, 1);
        assert_eq!(userale.context().buffer.len(), 1);
        assert!(userale.is_started());
    }
}

use crate::context::Context;
use crate::details::Extractor;
use crate::resolver::{path_of, selector_of};
use tracing::trace;
use userale_common::protocol::{DomEvent, Location, LogRecord};

/// The single funnel through which observed events become log records.
#[derive(Clone)]
pub struct Packager {
    ctx: Context,
}

impl Packager {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Packages `event` and appends it to the buffer. Returns `false`
    /// without touching the buffer while logging is switched off.
    pub fn package(&self, event: &DomEvent, extractor: Option<&Extractor>) -> bool {
        let record = self.ctx.config.read(|config| {
            if !config.on {
                return None;
            }

            let details = extractor.and_then(|f| f(event, config));
            let clock = self.ctx.clock.as_ref();
            let client_time = match event.time_stamp {
                Some(ts) if ts > 0.0 => config.time.normalize(ts, clock),
                _ => clock.now_ms(),
            };

            Some(LogRecord {
                target: selector_of(&event.target),
                path: path_of(event),
                client_time: client_time.floor() as i64,
                location: location_of(event),
                event_type: event.event_type.clone(),
                user_action: true,
                details,
                user_id: config.user_id.clone(),
                tool_version: config.tool_version.clone(),
                tool_name: config.tool_name.clone(),
                userale_version: config.userale_version.clone(),
            })
        });

        match record {
            Some(record) => {
                trace!(event_type = %record.event_type, target = %record.target, "packaged log");
                self.ctx.buffer.push(record);
                true
            }
            None => false,
        }
    }
}

/// Page coordinates of the event. Falls back to client coordinates offset
/// by the document scroll position, then to nulls.
pub fn location_of(event: &DomEvent) -> Location {
    if let Some(x) = event.page_x {
        Location {
            x: Some(x),
            y: event.page_y,
        }
    } else if let Some(x) = event.client_x {
        Location {
            x: Some(event.view.scroll_x + x),
            y: event.client_y.map(|y| event.view.scroll_y + y),
        }
    } else {
        Location { x: None, y: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::details::{click_details, extractor};
    use crate::time::{ManualClock, TimeScale};
    use std::sync::Arc;
    use userale_common::protocol::{Details, Node, ViewState};

    fn packager(on: bool) -> Packager {
        let config = Config {
            on,
            user_id: Some("alice".into()),
            tool_name: Some("demo".into()),
            ..Default::default()
        };
        let clock = Arc::new(ManualClock::new(1_700_000_000_123.9, 1_700_000_000_000.0));
        Packager::new(Context::with_clock(config, clock))
    }

    #[test]
    fn rejected_while_off() {
        let packager = packager(false);
        let event = DomEvent::new("click", Node::element("button"));
        assert!(!packager.package(&event, None));
        assert!(packager.context().buffer.is_empty());
    }

    #[test]
    fn builds_full_record() {
        let packager = packager(true);
        let mut event = DomEvent::new(
            "click",
            Node::element("button")
                .with_id("go")
                .with_parent(Node::element("body")),
        )
        .with_page(12.0, 34.0);
        event.detail = Some(1);

        assert!(packager.package(&event, Some(&extractor(click_details))));

        let logs = packager.context().buffer.snapshot();
        assert_eq!(logs.len(), 1);
        let record = logs[0].as_record().unwrap();
        assert_eq!(record.target, "button#go");
        assert_eq!(record.path, vec!["button#go", "body"]);
        assert_eq!(record.client_time, 1_700_000_000_123);
        assert_eq!(
            record.location,
            Location {
                x: Some(12.0),
                y: Some(34.0)
            }
        );
        assert_eq!(record.event_type, "click");
        assert!(record.user_action);
        assert!(matches!(record.details, Some(Details::Click { clicks: 1, .. })));
        assert_eq!(record.user_id.as_deref(), Some("alice"));
        assert_eq!(record.tool_name.as_deref(), Some("demo"));
        assert_eq!(record.userale_version.as_deref(), Some(crate::VERSION));
    }

    #[test]
    fn timestamps_go_through_the_time_scale() {
        let packager = packager(true);
        packager
            .context()
            .config
            .update(|config| config.time = TimeScale::NavigationOffset(1_000.0));

        let event = DomEvent::new("focus", Node::element("input")).at(250.7);
        packager.package(&event, None);

        let logs = packager.context().buffer.snapshot();
        assert_eq!(logs[0].as_record().unwrap().client_time, 1_250);
    }

    #[test]
    fn client_coordinates_are_offset_by_scroll() {
        let event = DomEvent::new("click", Node::element("p"))
            .with_client(10.0, 20.0)
            .with_view(ViewState {
                scroll_x: 5.0,
                scroll_y: 300.0,
                ..Default::default()
            });
        assert_eq!(
            location_of(&event),
            Location {
                x: Some(15.0),
                y: Some(320.0)
            }
        );

        let bare = DomEvent::new("load", Node::window());
        assert_eq!(location_of(&bare), Location { x: None, y: None });
    }

    #[test]
    fn config_changes_apply_to_the_next_event() {
        let packager = packager(true);
        let event = DomEvent::new("submit", Node::element("form"));
        packager.package(&event, None);
        packager
            .context()
            .config
            .update(|config| config.user_id = Some("bob".into()));
        packager.package(&event, None);

        let users: Vec<_> = packager
            .context()
            .buffer
            .snapshot()
            .iter()
            .map(|log| log.as_record().unwrap().user_id.clone())
            .collect();
        assert_eq!(users, vec![Some("alice".to_string()), Some("bob".to_string())]);
    }
}

use serde::{Deserialize, Serialize};

/// The capability set that identifies a global window object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowCapabilities {
    #[serde(default)]
    pub document: bool,
    #[serde(default)]
    pub location: bool,
    #[serde(default)]
    pub alert: bool,
    #[serde(default)]
    pub set_interval: bool,
}

impl WindowCapabilities {
    pub fn full() -> Self {
        Self {
            document: true,
            location: true,
            alert: true,
            set_interval: true,
        }
    }

    pub fn is_window(&self) -> bool {
        self.document && self.location && self.alert && self.set_interval
    }
}

/// Snapshot of a DOM node as seen from an event: just enough to build
/// selectors and walk the parent chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default)]
    pub window: WindowCapabilities,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<Node>>,
}

impl Node {
    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            local_name: Some(tag.into()),
            ..Default::default()
        }
    }

    pub fn window() -> Self {
        Self {
            window: WindowCapabilities::full(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_parent(mut self, parent: Node) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    pub fn parent_element(&self) -> Option<&Node> {
        self.parent.as_deref()
    }
}

/// Window/document geometry captured when the event fired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    #[serde(default)]
    pub scroll_x: f64,
    #[serde(default)]
    pub scroll_y: f64,
    #[serde(default)]
    pub outer_width: u32,
    #[serde(default)]
    pub outer_height: u32,
}

/// A DOM event as delivered to a listener.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub target: Node,
    /// Precomputed composed path (target first), when the browser exposes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composed_path: Option<Vec<Node>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_stamp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_y: Option<f64>,
    /// Click count for mouse events (`UIEvent.detail`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<i64>,
    #[serde(default)]
    pub ctrl_key: bool,
    #[serde(default)]
    pub alt_key: bool,
    #[serde(default)]
    pub shift_key: bool,
    #[serde(default)]
    pub meta_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_code: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_z: Option<f64>,
    #[serde(default)]
    pub view: ViewState,
}

impl DomEvent {
    pub fn new(event_type: impl Into<String>, target: Node) -> Self {
        Self {
            event_type: event_type.into(),
            target,
            ..Default::default()
        }
    }

    pub fn at(mut self, time_stamp: f64) -> Self {
        self.time_stamp = Some(time_stamp);
        self
    }

    pub fn with_page(mut self, x: f64, y: f64) -> Self {
        self.page_x = Some(x);
        self.page_y = Some(y);
        self
    }

    pub fn with_client(mut self, x: f64, y: f64) -> Self {
        self.client_x = Some(x);
        self.client_y = Some(y);
        self
    }

    pub fn with_view(mut self, view: ViewState) -> Self {
        self.view = view;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: Option<f64>,
    pub y: Option<f64>,
}

/// Event-specific payload attached to a log record.
///
/// Variants are distinguished by their field names on the wire, so order
/// matters for deserialization: the more specific shapes come first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Details {
    Click {
        clicks: i64,
        ctrl: bool,
        alt: bool,
        shift: bool,
        meta: bool,
    },
    Key {
        key: u32,
        ctrl: bool,
        alt: bool,
        shift: bool,
        meta: bool,
    },
    Wheel {
        x: f64,
        y: f64,
        z: f64,
    },
    Scroll {
        x: f64,
        y: f64,
    },
    Resize {
        width: u32,
        height: u32,
    },
    Value {
        value: String,
    },
    Window {
        window: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub target: String,
    pub path: Vec<String>,
    pub client_time: i64,
    pub location: Location,
    #[serde(rename = "type")]
    pub event_type: String,
    pub user_action: bool,
    pub details: Option<Details>,
    pub user_id: Option<String>,
    pub tool_version: Option<String>,
    pub tool_name: Option<String>,
    pub userale_version: Option<String>,
}

/// An entry in the log buffer: either a packaged interaction or an
/// arbitrary structured log supplied by the host page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BufferedLog {
    Record(LogRecord),
    Custom(serde_json::Value),
}

impl From<LogRecord> for BufferedLog {
    fn from(record: LogRecord) -> Self {
        BufferedLog::Record(record)
    }
}

impl BufferedLog {
    pub fn as_record(&self) -> Option<&LogRecord> {
        match self {
            BufferedLog::Record(record) => Some(record),
            BufferedLog::Custom(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_serializes_with_wire_names() {
        let record = LogRecord {
            target: "button#go".into(),
            path: vec!["button#go".into(), "body".into()],
            client_time: 1_500_000_000_000,
            location: Location {
                x: Some(10.0),
                y: None,
            },
            event_type: "click".into(),
            user_action: true,
            details: None,
            user_id: Some("alice".into()),
            tool_version: None,
            tool_name: Some("demo".into()),
            userale_version: Some("1.0.0".into()),
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], "click");
        assert_eq!(value["clientTime"], 1_500_000_000_000i64);
        assert_eq!(value["userAction"], true);
        assert_eq!(value["location"], json!({ "x": 10.0, "y": null }));
        assert_eq!(value["details"], json!(null));
        assert_eq!(value["useraleVersion"], "1.0.0");
        assert_eq!(value["toolVersion"], json!(null));
    }

    #[test]
    fn details_pick_the_matching_shape() {
        let wheel: Details = serde_json::from_value(json!({ "x": 1.0, "y": 2.0, "z": 0.0 })).unwrap();
        assert!(matches!(wheel, Details::Wheel { .. }));

        let scroll: Details = serde_json::from_value(json!({ "x": 1.0, "y": 2.0 })).unwrap();
        assert!(matches!(scroll, Details::Scroll { .. }));

        let key: Details = serde_json::from_value(
            json!({ "key": 13, "ctrl": false, "alt": false, "shift": true, "meta": false }),
        )
        .unwrap();
        assert!(matches!(key, Details::Key { key: 13, shift: true, .. }));

        let window: Details = serde_json::from_value(json!({ "window": true })).unwrap();
        assert_eq!(window, Details::Window { window: true });
    }

    #[test]
    fn custom_logs_stay_custom() {
        let log: BufferedLog = serde_json::from_value(json!({ "note": "hello" })).unwrap();
        assert!(log.as_record().is_none());
    }

    #[test]
    fn event_parses_from_camel_case() {
        let event: DomEvent = serde_json::from_value(json!({
            "type": "click",
            "target": { "localName": "a", "id": "home", "parent": { "localName": "nav" } },
            "timeStamp": 12.5,
            "pageX": 3,
            "pageY": 4,
            "detail": 1,
            "ctrlKey": true
        }))
        .unwrap();

        assert_eq!(event.event_type, "click");
        assert_eq!(event.target.id.as_deref(), Some("home"));
        assert_eq!(
            event.target.parent_element().and_then(|p| p.local_name.as_deref()),
            Some("nav")
        );
        assert_eq!(event.page_x, Some(3.0));
        assert!(event.ctrl_key);
        assert!(!event.alt_key);
    }
}

use super::params::user_id_from_params;
use crate::time::TimeScale;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Whether the packager accepts events.
    #[serde(default)]
    pub on: bool,
    #[serde(default = "default_autostart")]
    pub autostart: bool,
    #[serde(default = "default_url")]
    pub url: String,
    /// Milliseconds between interval flush attempts.
    #[serde(default = "default_transmit_interval")]
    pub transmit_interval: u64,
    #[serde(default = "default_log_count_threshold")]
    pub log_count_threshold: usize,
    /// Debounce cooldown, in milliseconds, for high-frequency events.
    #[serde(default = "default_resolution")]
    pub resolution: u64,
    #[serde(default = "default_transmit_retries")]
    pub transmit_retries: u32,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_version: Option<String>,
    #[serde(default = "default_userale_version")]
    pub userale_version: Option<String>,
    /// Capture input values and keystrokes.
    #[serde(default)]
    pub log_details: bool,
    #[serde(default)]
    pub user_from_params: Option<String>,
    #[serde(default)]
    pub use_sockets: bool,
    #[serde(default = "default_socket_channel")]
    pub socket_channel: String,
    #[serde(skip)]
    pub time: TimeScale,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            on: false,
            autostart: default_autostart(),
            url: default_url(),
            transmit_interval: default_transmit_interval(),
            log_count_threshold: default_log_count_threshold(),
            resolution: default_resolution(),
            transmit_retries: default_transmit_retries(),
            user_id: None,
            tool_name: None,
            tool_version: None,
            userale_version: default_userale_version(),
            log_details: false,
            user_from_params: None,
            use_sockets: false,
            socket_channel: default_socket_channel(),
            time: TimeScale::default(),
        }
    }
}

fn default_autostart() -> bool {
    true
}

fn default_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_transmit_interval() -> u64 {
    5000
}

fn default_log_count_threshold() -> usize {
    5
}

fn default_resolution() -> u64 {
    500
}

fn default_transmit_retries() -> u32 {
    3
}

fn default_userale_version() -> Option<String> {
    Some(crate::VERSION.to_string())
}

fn default_socket_channel() -> String {
    "userale".to_string()
}

impl Config {
    /// Builds a configuration from script-tag style `data-*` attributes,
    /// resolving the user id from `page_url` when `data-user-from-params`
    /// names a query parameter.
    pub fn from_attributes<F>(get: F, page_url: Option<&str>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        config.apply(ConfigPatch::from_attributes(get), page_url);
        config
    }

    /// Shallow-merges `patch` into this configuration. Zero intervals,
    /// thresholds and resolutions are rejected and leave the current value.
    pub fn apply(&mut self, patch: ConfigPatch, page_url: Option<&str>) {
        if let Some(on) = patch.on {
            self.on = on;
        }
        if let Some(autostart) = patch.autostart {
            self.autostart = autostart;
        }
        if let Some(url) = patch.url {
            self.url = url;
        }
        if let Some(interval) = patch.transmit_interval {
            if interval > 0 {
                self.transmit_interval = interval;
            } else {
                warn!("Ignoring non-positive transmit_interval");
            }
        }
        if let Some(threshold) = patch.log_count_threshold {
            if threshold > 0 {
                self.log_count_threshold = threshold;
            } else {
                warn!("Ignoring non-positive log_count_threshold");
            }
        }
        if let Some(resolution) = patch.resolution {
            if resolution > 0 {
                self.resolution = resolution;
            } else {
                warn!("Ignoring non-positive resolution");
            }
        }
        if let Some(retries) = patch.transmit_retries {
            self.transmit_retries = retries;
        }
        if let Some(user_id) = patch.user_id {
            self.user_id = user_id;
        }
        if let Some(tool_name) = patch.tool_name {
            self.tool_name = tool_name;
        }
        if let Some(tool_version) = patch.tool_version {
            self.tool_version = tool_version;
        }
        if let Some(log_details) = patch.log_details {
            self.log_details = log_details;
        }
        if let Some(use_sockets) = patch.use_sockets {
            self.use_sockets = use_sockets;
        }
        if let Some(channel) = patch.socket_channel {
            self.socket_channel = channel;
        }
        if let Some(param) = patch.user_from_params {
            // A user id found in the page URL wins over one set in the same patch.
            if let Some(user_id) = page_url.and_then(|href| user_id_from_params(href, &param)) {
                self.user_id = Some(user_id);
            }
            self.user_from_params = Some(param);
        }
        if let Some(time) = patch.time {
            self.time = time;
        }
    }
}

/// A partial configuration, as passed to `options()`.
///
/// Nullable fields are doubly optional: `None` leaves the value alone,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autostart: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transmit_interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_count_threshold: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transmit_retries: Option<u32>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub tool_name: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub tool_version: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_details: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_from_params: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_sockets: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_channel: Option<String>,
    #[serde(skip)]
    pub time: Option<TimeScale>,
}

/// Maps a present key to `Some`, so an explicit `null` becomes `Some(None)`.
/// Absent keys still fall back to `None` through `#[serde(default)]`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl ConfigPatch {
    /// Reads the `data-*` attributes of the loading script tag. Missing,
    /// empty or non-numeric values fall back to the defaults.
    pub fn from_attributes<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |name: &str| get(name).filter(|value| !value.is_empty());
        let number = |name: &str, fallback: u64| {
            text(name)
                .and_then(|value| value.trim().parse::<f64>().ok())
                .filter(|value| value.is_finite() && *value >= 1.0)
                .map(|value| value as u64)
                .unwrap_or(fallback)
        };

        Self {
            autostart: Some(get("data-autostart").as_deref() != Some("false")),
            url: Some(text("data-url").unwrap_or_else(default_url)),
            transmit_interval: Some(number("data-interval", default_transmit_interval())),
            log_count_threshold: Some(
                number("data-threshold", default_log_count_threshold() as u64) as usize,
            ),
            resolution: Some(number("data-resolution", default_resolution())),
            user_id: Some(text("data-user")),
            tool_version: Some(text("data-version")),
            tool_name: Some(text("data-tool")),
            log_details: Some(get("data-log-details").as_deref() == Some("true")),
            user_from_params: text("data-user-from-params"),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn attributes(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn attribute_defaults() {
        let config = Config::from_attributes(|_| None, None);
        assert!(config.autostart);
        assert!(!config.on);
        assert_eq!(config.url, "http://localhost:8000");
        assert_eq!(config.transmit_interval, 5000);
        assert_eq!(config.log_count_threshold, 5);
        assert_eq!(config.resolution, 500);
        assert!(!config.log_details);
        assert_eq!(config.user_id, None);
        assert_eq!(config.userale_version.as_deref(), Some(crate::VERSION));
    }

    #[test]
    fn attributes_override_defaults() {
        let attrs = attributes(&[
            ("data-autostart", "false"),
            ("data-url", "http://collector:9000/logs"),
            ("data-interval", "2500"),
            ("data-threshold", "20"),
            ("data-user", "bob"),
            ("data-version", "2.1"),
            ("data-log-details", "true"),
            ("data-resolution", "250"),
            ("data-tool", "viewer"),
        ]);
        let config = Config::from_attributes(|name| attrs.get(name).cloned(), None);

        assert!(!config.autostart);
        assert_eq!(config.url, "http://collector:9000/logs");
        assert_eq!(config.transmit_interval, 2500);
        assert_eq!(config.log_count_threshold, 20);
        assert_eq!(config.user_id.as_deref(), Some("bob"));
        assert_eq!(config.tool_version.as_deref(), Some("2.1"));
        assert!(config.log_details);
        assert_eq!(config.resolution, 250);
        assert_eq!(config.tool_name.as_deref(), Some("viewer"));
    }

    #[test]
    fn bad_numbers_fall_back() {
        let attrs = attributes(&[
            ("data-interval", "soon"),
            ("data-threshold", "0"),
            ("data-resolution", ""),
            ("data-log-details", "yes"),
        ]);
        let config = Config::from_attributes(|name| attrs.get(name).cloned(), None);
        assert_eq!(config.transmit_interval, 5000);
        assert_eq!(config.log_count_threshold, 5);
        assert_eq!(config.resolution, 500);
        assert!(!config.log_details);
    }

    #[test]
    fn user_from_params_resolves_against_page_url() {
        let attrs = attributes(&[("data-user", "fallback"), ("data-user-from-params", "uid")]);
        let config = Config::from_attributes(
            |name| attrs.get(name).cloned(),
            Some("https://app.example/page?x=1&uid=jane+doe#top"),
        );
        assert_eq!(config.user_id.as_deref(), Some("jane doe"));
        assert_eq!(config.user_from_params.as_deref(), Some("uid"));
    }

    #[test]
    fn patch_can_clear_nullable_fields() {
        let mut config = Config::default();
        config.user_id = Some("alice".into());
        config.apply(
            ConfigPatch {
                user_id: Some(None),
                log_count_threshold: Some(0),
                ..Default::default()
            },
            None,
        );
        assert_eq!(config.user_id, None);
        assert_eq!(config.log_count_threshold, 5);
    }

    #[test]
    fn json_null_clears_nullable_fields() {
        let patch: ConfigPatch =
            serde_json::from_str(r#"{"user_id":null,"tool_name":null,"resolution":250}"#).unwrap();
        assert_eq!(patch.user_id, Some(None));
        assert_eq!(patch.tool_name, Some(None));
        assert_eq!(patch.tool_version, None);

        let mut config = Config {
            user_id: Some("alice".into()),
            tool_name: Some("viewer".into()),
            tool_version: Some("2.1".into()),
            ..Default::default()
        };
        config.apply(patch, None);
        assert_eq!(config.user_id, None);
        assert_eq!(config.tool_name, None);
        assert_eq!(config.tool_version.as_deref(), Some("2.1"));
        assert_eq!(config.resolution, 250);

        let renamed: ConfigPatch = serde_json::from_str(r#"{"user_id":"bob"}"#).unwrap();
        assert_eq!(renamed.user_id, Some(Some("bob".into())));
    }
}

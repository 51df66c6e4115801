//! Per-event detail extraction.
//!
//! Which events are observed, and what extra detail each one carries, is
//! described entirely by the tables in this module. Hosts can extend or
//! override entries without touching the handler wiring.

use crate::config::Config;
use std::sync::Arc;
use userale_common::protocol::{Details, DomEvent};

/// Maps an event to its detail record, given the configuration current at
/// the time the event fires.
pub type Extractor = Arc<dyn Fn(&DomEvent, &Config) -> Option<Details> + Send + Sync>;

/// An ordered table from event type to an optional extractor. A `None`
/// extractor means the event is logged without details.
#[derive(Clone, Default)]
pub struct DetailCatalog {
    entries: Vec<(String, Option<Extractor>)>,
}

impl DetailCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interaction events listened for on the document.
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        for name in ["click", "dblclick", "mousedown", "mouseup"] {
            catalog.insert(name, Some(extractor(click_details)));
        }
        catalog.insert("focus", None);
        catalog.insert("blur", None);
        catalog.insert("input", Some(extractor(value_details)));
        catalog.insert("change", Some(extractor(value_details)));
        for name in ["dragstart", "dragend", "drag", "drop"] {
            catalog.insert(name, None);
        }
        catalog.insert("keydown", Some(extractor(key_details)));
        catalog.insert("mouseover", None);
        catalog.insert("submit", None);
        catalog
    }

    /// High-frequency events listened for on the window behind a debounce gate.
    pub fn buffered() -> Self {
        let mut catalog = Self::new();
        catalog.insert("wheel", Some(extractor(wheel_details)));
        catalog.insert("scroll", Some(extractor(scroll_details)));
        catalog.insert("resize", Some(extractor(resize_details)));
        catalog
    }

    /// Adds an entry, replacing any existing entry for the same event type.
    pub fn insert(&mut self, event_type: impl Into<String>, extractor: Option<Extractor>) {
        let event_type = event_type.into();
        match self.entries.iter_mut().find(|(name, _)| *name == event_type) {
            Some(entry) => entry.1 = extractor,
            None => self.entries.push((event_type, extractor)),
        }
    }

    pub fn remove(&mut self, event_type: &str) {
        self.entries.retain(|(name, _)| name != event_type);
    }

    pub fn contains(&self, event_type: &str) -> bool {
        self.entries.iter().any(|(name, _)| name == event_type)
    }

    /// `None` when the event type is not in the catalog; `Some(None)` when it
    /// is listed without an extractor.
    pub fn get(&self, event_type: &str) -> Option<Option<&Extractor>> {
        self.entries
            .iter()
            .find(|(name, _)| name == event_type)
            .map(|(_, extractor)| extractor.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Extractor>)> {
        self.entries
            .iter()
            .map(|(name, extractor)| (name.as_str(), extractor.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The full set of events a collector attaches to.
#[derive(Clone)]
pub struct EventCatalog {
    pub events: DetailCatalog,
    pub buffered: DetailCatalog,
    pub window_events: Vec<String>,
}

impl Default for EventCatalog {
    fn default() -> Self {
        Self {
            events: DetailCatalog::standard(),
            buffered: DetailCatalog::buffered(),
            window_events: ["load", "blur", "focus"].map(String::from).to_vec(),
        }
    }
}

pub fn extractor<F>(f: F) -> Extractor
where
    F: Fn(&DomEvent, &Config) -> Option<Details> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn click_details(event: &DomEvent, _config: &Config) -> Option<Details> {
    Some(Details::Click {
        clicks: event.detail.unwrap_or(0),
        ctrl: event.ctrl_key,
        alt: event.alt_key,
        shift: event.shift_key,
        meta: event.meta_key,
    })
}

pub fn value_details(event: &DomEvent, config: &Config) -> Option<Details> {
    if !config.log_details {
        return None;
    }
    Some(Details::Value {
        value: event.target.value.clone().unwrap_or_default(),
    })
}

pub fn key_details(event: &DomEvent, config: &Config) -> Option<Details> {
    if !config.log_details {
        return None;
    }
    Some(Details::Key {
        key: event.key_code.unwrap_or(0),
        ctrl: event.ctrl_key,
        alt: event.alt_key,
        shift: event.shift_key,
        meta: event.meta_key,
    })
}

pub fn wheel_details(event: &DomEvent, _config: &Config) -> Option<Details> {
    Some(Details::Wheel {
        x: event.delta_x.unwrap_or(0.0),
        y: event.delta_y.unwrap_or(0.0),
        z: event.delta_z.unwrap_or(0.0),
    })
}

pub fn scroll_details(event: &DomEvent, _config: &Config) -> Option<Details> {
    Some(Details::Scroll {
        x: event.view.scroll_x,
        y: event.view.scroll_y,
    })
}

pub fn resize_details(event: &DomEvent, _config: &Config) -> Option<Details> {
    Some(Details::Resize {
        width: event.view.outer_width,
        height: event.view.outer_height,
    })
}

pub fn window_details(_event: &DomEvent, _config: &Config) -> Option<Details> {
    Some(Details::Window { window: true })
}

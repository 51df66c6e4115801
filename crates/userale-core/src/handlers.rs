use crate::details::{DetailCatalog, EventCatalog, Extractor, extractor, window_details};
use crate::packager::Packager;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};
use userale_common::protocol::DomEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenTarget {
    Document,
    Window,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

pub type Listener = Arc<dyn Fn(&DomEvent) + Send + Sync>;

/// Anything that can deliver named DOM events to subscribed listeners.
pub trait EventSource: Send + Sync {
    fn add_listener(&self, target: ListenTarget, event_type: &str, capture: bool, listener: Listener);

    fn ready_state(&self) -> ReadyState {
        ReadyState::Complete
    }
}

/// In-memory event source. Hosts push events through `dispatch`.
pub struct Dispatcher {
    listeners: Mutex<HashMap<(ListenTarget, String), Vec<(bool, Listener)>>>,
    ready_state: Mutex<ReadyState>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
            ready_state: Mutex::new(ReadyState::Complete),
        }
    }

    pub fn set_ready_state(&self, state: ReadyState) {
        *self.ready_state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Delivers `event` to every listener registered for its type on
    /// `target`, capturing listeners first. Returns the number invoked.
    pub fn dispatch(&self, target: ListenTarget, event: &DomEvent) -> usize {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(target, event.event_type.clone()))
            .cloned()
            .unwrap_or_default();
        // Stable sort keeps registration order within each phase.
        listeners.sort_by_key(|(capture, _)| !capture);

        for (_, listener) in &listeners {
            listener(event);
        }
        listeners.len()
    }

    pub fn listener_count(&self, target: ListenTarget, event_type: &str) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(target, event_type.to_string()))
            .map_or(0, Vec::len)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for Dispatcher {
    fn add_listener(&self, target: ListenTarget, event_type: &str, capture: bool, listener: Listener) {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry((target, event_type.to_string()))
            .or_default()
            .push((capture, listener));
    }

    fn ready_state(&self) -> ReadyState {
        *self.ready_state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Cooldown gate for one high-frequency event type.
///
/// Open until an event passes; then closed until `resolution` has elapsed
/// since that event. Events arriving while closed are dropped.
#[derive(Debug, Default)]
pub struct DebounceGate {
    reopens_at: Option<Instant>,
}

impl DebounceGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self, now: Instant) -> bool {
        self.reopens_at.is_none_or(|at| now >= at)
    }

    /// Lets the event through and closes the gate if it is open.
    pub fn try_pass(&mut self, now: Instant, resolution: Duration) -> bool {
        if !self.is_open(now) {
            return false;
        }
        self.reopens_at = Some(now + resolution);
        true
    }
}

/// Subscribes the packager to every event in `catalog`. All listeners
/// capture, so inner handlers that stop propagation cannot hide events.
pub fn attach_handlers(source: &dyn EventSource, packager: &Packager, catalog: &EventCatalog) {
    attach_events(source, packager, &catalog.events);
    attach_buffered(source, packager, &catalog.buffered);
    attach_window(source, packager, &catalog.window_events);
    debug!(
        events = catalog.events.len(),
        buffered = catalog.buffered.len(),
        window = catalog.window_events.len(),
        "attached handlers"
    );
}

fn attach_events(source: &dyn EventSource, packager: &Packager, events: &DetailCatalog) {
    for (name, extractor) in events.iter() {
        let packager = packager.clone();
        let extractor = extractor.cloned();
        source.add_listener(
            ListenTarget::Document,
            name,
            true,
            Arc::new(move |event: &DomEvent| {
                packager.package(event, extractor.as_ref());
            }),
        );
    }
}

fn attach_buffered(source: &dyn EventSource, packager: &Packager, buffered: &DetailCatalog) {
    for (name, extractor) in buffered.iter() {
        let packager = packager.clone();
        let extractor = extractor.cloned();
        let gate = Mutex::new(DebounceGate::new());
        let event_type = name.to_string();
        source.add_listener(
            ListenTarget::Window,
            name,
            true,
            Arc::new(move |event: &DomEvent| {
                let resolution = packager.context().config.read(|c| c.resolution);
                let passed = gate
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .try_pass(Instant::now(), Duration::from_millis(resolution));
                if passed {
                    packager.package(event, extractor.as_ref());
                } else {
                    trace!(event_type = %event_type, "debounced");
                }
            }),
        );
    }
}

fn attach_window(source: &dyn EventSource, packager: &Packager, window_events: &[String]) {
    let window: Extractor = extractor(window_details);
    for name in window_events {
        let packager = packager.clone();
        let window = window.clone();
        source.add_listener(
            ListenTarget::Window,
            name,
            true,
            Arc::new(move |event: &DomEvent| {
                packager.package(event, Some(&window));
            }),
        );
    }
}

use crate::config::{Config, ConfigPatch};
use crate::context::Context;
use crate::details::EventCatalog;
use crate::handlers::{EventSource, ReadyState, attach_handlers};
use crate::packager::Packager;
use crate::sender::{HttpTransport, Sender, Transport, UnloadFlush};
use crate::time::Clock;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use userale_common::protocol::BufferedLog;

const READY_POLL: Duration = Duration::from_millis(100);

/// The collector as seen by the host page: start, stop, reconfigure, and
/// push custom logs.
pub struct Userale {
    ctx: Context,
    sender: Sender,
    catalog: EventCatalog,
    page_url: Option<String>,
    started: AtomicBool,
    interval_task: Mutex<Option<JoinHandle<()>>>,
}

impl Userale {
    pub fn new(config: Config, transport: Arc<dyn Transport>) -> Self {
        Self::from_context(Context::new(config), transport)
    }

    /// A collector posting to `config.url` over HTTP.
    pub fn over_http(config: Config) -> Self {
        let ctx = Context::new(config);
        let transport = Arc::new(HttpTransport::new(ctx.config.clone()));
        Self::from_context(ctx, transport)
    }

    pub fn with_clock(config: Config, clock: Arc<dyn Clock>, transport: Arc<dyn Transport>) -> Self {
        Self::from_context(Context::with_clock(config, clock), transport)
    }

    pub fn from_context(ctx: Context, transport: Arc<dyn Transport>) -> Self {
        // Logging stays off until start() has wired everything up.
        ctx.config.update(|config| config.on = false);
        Self {
            sender: Sender::new(ctx.clone(), transport),
            ctx,
            catalog: EventCatalog::default(),
            page_url: None,
            started: AtomicBool::new(false),
            interval_task: Mutex::new(None),
        }
    }

    /// Replaces the events the collector attaches to. Only effective before
    /// the first `start`.
    pub fn with_catalog(mut self, catalog: EventCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Sets the page URL used to resolve `user_from_params`, resolving it
    /// immediately if already configured.
    pub fn with_page_url(mut self, page_url: impl Into<String>) -> Self {
        let page_url = page_url.into();
        if let Some(param) = self.ctx.config.read(|c| c.user_from_params.clone()) {
            let patch = ConfigPatch {
                user_from_params: Some(param),
                ..Default::default()
            };
            self.ctx
                .config
                .update(|config| config.apply(patch, Some(&page_url)));
        }
        self.page_url = Some(page_url);
        self
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Chooses the timestamp scale from a sample event timestamp.
    pub fn calibrate(&self, sample_timestamp: Option<f64>) {
        let scale = self.ctx.calibrate(sample_timestamp);
        debug!(?scale, "calibrated timestamps");
    }

    /// Attaches handlers the first time it is called, once the document is
    /// interactive, then makes sure the interval sender is running and
    /// switches logging on. Listeners are never attached twice.
    pub async fn start(&self, source: &dyn EventSource) {
        if !self.started.swap(true, Ordering::SeqCst) {
            while source.ready_state() == ReadyState::Loading {
                tokio::time::sleep(READY_POLL).await;
            }

            attach_handlers(source, &Packager::new(self.ctx.clone()), &self.catalog);
            info!(url = %self.ctx.config.read(|c| c.url.clone()), "UserALE started");
        }

        {
            let mut task = self.interval_task.lock().unwrap_or_else(|e| e.into_inner());
            if task.is_none() {
                *task = Some(self.sender.spawn_interval());
            }
        }

        self.ctx.config.update(|config| config.on = true);
    }

    /// Stops packaging new events. Already buffered logs are still sent.
    pub fn stop(&self) {
        self.ctx.config.update(|config| config.on = false);
        info!("UserALE stopped");
    }

    /// Merges `patch` into the live configuration and returns the result.
    pub fn options(&self, patch: Option<ConfigPatch>) -> Config {
        if let Some(patch) = patch {
            let page_url = self.page_url.as_deref();
            self.ctx
                .config
                .update(|config| config.apply(patch, page_url));
        }
        self.ctx.config.snapshot()
    }

    /// Appends a caller-supplied log straight to the buffer. Only JSON
    /// objects and arrays are accepted.
    pub fn log(&self, custom: Value) -> bool {
        match custom {
            Value::Object(_) | Value::Array(_) => {
                self.ctx.buffer.push(BufferedLog::Custom(custom));
                true
            }
            _ => false,
        }
    }

    /// Switches logging off, stops the interval sender, waits for interval
    /// deliveries still in flight and flushes what is left, as on page
    /// unload. A later `start` resumes collection with a fresh sender.
    pub async fn shutdown(&self) -> UnloadFlush {
        self.ctx.config.update(|config| config.on = false);
        if let Some(task) = self
            .interval_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            task.abort();
        }

        let settled = self.sender.wait_for_deliveries().await;
        if !settled.is_empty() {
            debug!(batches = settled.len(), "interval deliveries settled");
        }
        self.sender.flush_on_unload().await
    }
}

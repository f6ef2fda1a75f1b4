//! Optional observation of inference calls.
//!
//! A [`TraceCollector`] is handed to the inference client explicitly; without
//! one nothing is emitted. Delivery is fire-and-forget: a collector must
//! never fail or delay the call it observes. [`TraceCollector::flush`] waits
//! for deliveries still in flight, e.g. before a process exits.

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::options::TraceOptions;

/// Name recorded for selector inference calls.
pub const INFER_EVENT: &str = "infer_selectors";

/// How an observed call ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum TraceOutcome {
    Success,
    Failure(String),
}

/// One observed inference call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceEvent {
    pub name: String,
    pub project: String,
    pub model: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    #[serde(flatten)]
    pub outcome: TraceOutcome,
}

/// Receiver of trace events.
pub trait TraceCollector: Send + Sync {
    /// Hands `event` over without waiting for it to be delivered.
    fn record(&self, event: &TraceEvent);

    /// Blocks until every recorded event has been delivered or dropped.
    fn flush(&self) {}
}

/// Writes events to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogCollector;

impl TraceCollector for LogCollector {
    fn record(&self, event: &TraceEvent) {
        match &event.outcome {
            TraceOutcome::Success => info!(
                project = %event.project,
                model = %event.model,
                elapsed_ms = event.elapsed_ms,
                "{} succeeded",
                event.name
            ),
            TraceOutcome::Failure(error) => info!(
                project = %event.project,
                model = %event.model,
                elapsed_ms = event.elapsed_ms,
                error = %error,
                "{} failed",
                event.name
            ),
        }
    }
}

/// POSTs events as JSON to a collector endpoint, one background thread per
/// event.
#[derive(Debug, Clone)]
pub struct HttpCollector {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: Option<String>,
    pending: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl HttpCollector {
    /// Timeout for one delivery.
    pub const TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates a collector posting to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` error if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> reqwest::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Self::TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            pending: Arc::default(),
        })
    }

    fn deliver(&self, event: &TraceEvent) -> reqwest::Result<()> {
        let mut request = self.client.post(&self.endpoint).json(event);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        request.send()?.error_for_status()?;
        Ok(())
    }
}

impl TraceCollector for HttpCollector {
    fn record(&self, event: &TraceEvent) {
        let collector = self.clone();
        let event = event.clone();
        let spawned = thread::Builder::new()
            .name("trace-delivery".into())
            .spawn(move || match collector.deliver(&event) {
                Ok(()) => debug!(endpoint = %collector.endpoint, "trace event delivered"),
                Err(e) => warn!(endpoint = %collector.endpoint, "trace delivery failed: {e}"),
            });

        match spawned {
            Ok(handle) => {
                if let Ok(mut pending) = self.pending.lock() {
                    pending.retain(|h| !h.is_finished());
                    pending.push(handle);
                }
            }
            Err(e) => warn!(endpoint = %self.endpoint, "trace delivery not started: {e}"),
        }
    }

    fn flush(&self) {
        let handles = match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(_) => return,
        };
        for handle in handles {
            if handle.join().is_err() {
                warn!(endpoint = %self.endpoint, "trace delivery thread panicked");
            }
        }
    }
}

/// Builds the collector described by `options`: HTTP when an endpoint is
/// set, the log otherwise.
///
/// # Errors
///
/// Returns the `reqwest` error if the HTTP client cannot be built.
pub fn collector_for(options: &TraceOptions) -> reqwest::Result<Box<dyn TraceCollector>> {
    Ok(match &options.endpoint {
        Some(endpoint) => Box::new(HttpCollector::new(endpoint.clone(), options.api_key.clone())?),
        None => Box::new(LogCollector),
    })
}
